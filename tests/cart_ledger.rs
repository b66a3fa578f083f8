//! Integration tests for the cart ledger over the bundled fixture catalog.
//!
//! The catalog in `fixtures/products.json` mixes complete records with records
//! missing or mistyping fields, so these tests run the ledger against normalized
//! products rather than hand-built ones.
//!
//! Prices used below:
//!
//! - Midnight Oversized Hoodie (id 1): $45.00, was $60.00
//! - Logo Sticker Pack (id 2): $5.00
//! - Cargo Trousers (id 3): price not a number, falls back to $0.00
//! - Canvas Tote (no id, `product-3`): $12.50
//! - Washed Dad Cap (`cap-01`): $18.99

use std::num::NonZeroU32;

use rusty_money::{Money, iso::USD};
use tempfile::tempdir;
use testresult::TestResult;

use storefront::{
    cart::{Cart, CartState, FileCartStore},
    catalog::Catalog,
    config::StorefrontConfig,
    products::{Product, ProductId},
};

fn fixture_config() -> Result<StorefrontConfig, Box<dyn std::error::Error>> {
    Ok(StorefrontConfig::load("fixtures/storefront.yml")?)
}

fn fixture_catalog(config: &StorefrontConfig) -> Result<Catalog, Box<dyn std::error::Error>> {
    Ok(Catalog::load(
        "fixtures/products.json",
        config.currency,
        &config.catalog,
    )?)
}

fn product<'a>(catalog: &'a Catalog, id: impl Into<ProductId>) -> Result<&'a Product, String> {
    let id = id.into();

    catalog
        .get(&id)
        .ok_or_else(|| format!("product {id} missing from fixture catalog"))
}

fn qty(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

#[test]
fn fixture_catalog_is_normalized() -> TestResult {
    let config = fixture_config()?;
    let catalog = fixture_catalog(&config)?;

    assert_eq!(catalog.len(), 5);

    let hoodie = product(&catalog, 1_i64)?;
    assert_eq!(
        hoodie.images.first().map(String::as_str),
        Some("/img/products/hoodie-black-front.jpg")
    );
    assert_eq!(hoodie.original_price, Some(Money::from_minor(6000, USD)));

    let stickers = product(&catalog, 2_i64)?;
    assert_eq!(stickers.images, vec!["https://cdn.example.com/stickers.png"]);
    assert_eq!(stickers.sizes, vec!["One Size"]);

    let trousers = product(&catalog, 3_i64)?;
    assert_eq!(trousers.price, Money::from_minor(0, USD));
    assert_eq!(trousers.original_price, Some(Money::from_minor(2000, USD)));
    assert_eq!(trousers.images, vec!["/img/products/placeholder.jpg"]);
    assert_eq!(trousers.rating, config.catalog.rating);

    let tote = product(&catalog, "product-3")?;
    assert_eq!(tote.price, Money::from_minor(1250, USD));
    assert_eq!(tote.description, "No description available");

    let cap = product(&catalog, "cap-01")?;
    assert_eq!(cap.sizes, vec!["One Size"]);
    assert_eq!(cap.colors.len(), 1);

    let featured: Vec<&str> = catalog.featured().map(|p| p.name.as_str()).collect();
    assert_eq!(featured, vec!["Midnight Oversized Hoodie", "Canvas Tote"]);

    let accessories = catalog.search("ACCESSORIES").count();
    assert_eq!(accessories, 2);

    Ok(())
}

#[test]
fn shopping_session_totals() -> TestResult {
    let config = fixture_config()?;
    let catalog = fixture_catalog(&config)?;
    let mut cart = Cart::new(config.currency);

    let hoodie = product(&catalog, 1_i64)?;
    let cap = product(&catalog, "cap-01")?;

    cart.add_line(hoodie, qty(1), "L", "Black")?;
    cart.add_product(cap)?;

    // 45.00 + 18.99 = 63.99, past the threshold
    assert_eq!(cart.subtotal()?, Money::from_minor(6399, USD));
    assert_eq!(cart.shipping_fee()?, Money::from_minor(0, USD));
    // 8% of 63.99 = 5.1192
    assert_eq!(cart.tax()?, Money::from_minor(512, USD));
    assert_eq!(cart.grand_total()?, Money::from_minor(6911, USD));
    assert_eq!(cart.amount_to_free_shipping()?, Money::from_minor(0, USD));

    cart.remove_line(&hoodie.id, "L", "Black");

    assert_eq!(cart.subtotal()?, Money::from_minor(1899, USD));
    assert_eq!(cart.shipping_fee()?, Money::from_minor(599, USD));
    assert_eq!(cart.amount_to_free_shipping()?, Money::from_minor(3101, USD));

    Ok(())
}

#[test]
fn same_product_in_different_sizes_stays_apart() -> TestResult {
    let config = fixture_config()?;
    let catalog = fixture_catalog(&config)?;
    let mut cart = Cart::new(config.currency);

    let hoodie = product(&catalog, 1_i64)?;

    cart.add_line(hoodie, qty(1), "M", "Black")?;
    cart.add_line(hoodie, qty(1), "L", "Black")?;
    cart.add_line(hoodie, qty(2), "M", "Black")?;

    assert_eq!(cart.len(), 2);
    assert_eq!(cart.total_quantity(), 4);
    assert_eq!(
        cart.get_line(&hoodie.id, "M", "Black").map(|line| line.quantity()),
        Some(3)
    );

    Ok(())
}

#[test]
fn file_store_round_trips_between_sessions() -> TestResult {
    let config = fixture_config()?;
    let catalog = fixture_catalog(&config)?;
    let dir = tempdir()?;
    let path = dir.path().join("storage.json");

    let mut first = Cart::hydrate(FileCartStore::new(&path), config.pricing);
    assert_eq!(first.state(), CartState::Empty);

    first.add_line(product(&catalog, 1_i64)?, qty(2), "S", "Charcoal")?;
    first.add_product(product(&catalog, "product-3")?)?;
    first.set_quantity(&ProductId::from("product-3"), "One Size", "", 4);

    let second = Cart::hydrate(FileCartStore::new(&path), config.pricing);

    assert_eq!(second.lines(), first.lines());
    assert_eq!(second.totals()?, first.totals()?);

    Ok(())
}

#[test]
fn clearing_persists_an_empty_cart() -> TestResult {
    let config = fixture_config()?;
    let catalog = fixture_catalog(&config)?;
    let dir = tempdir()?;
    let path = dir.path().join("storage.json");

    let mut cart = Cart::hydrate(FileCartStore::new(&path), config.pricing);
    cart.add_product(product(&catalog, 2_i64)?)?;
    cart.clear();

    let restored = Cart::hydrate(FileCartStore::new(&path), config.pricing);

    assert_eq!(restored.state(), CartState::Empty);
    assert_eq!(restored.grand_total()?, Money::from_minor(599, USD));

    Ok(())
}
