//! Checkout Example
//!
//! Loads a product catalog, fills a cart persisted to a local key-value file, and
//! optionally places the order.
//!
//! Use `-a ID[:QTY[:SIZE[:COLOR]]]` to add lines to the cart
//! Use `--place-order` with the customer fields to check out

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use storefront::{
    cart::{Cart, FileCartStore},
    catalog::Catalog,
    checkout::{Checkout, CustomerInfo, OrderJournal},
    config::StorefrontConfig,
    logging,
    receipt::{write_cart, write_order},
    utils::CheckoutArgs,
};

/// Checkout Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = CheckoutArgs::parse();

    let config = match args.config.as_deref() {
        Some(path) => StorefrontConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StorefrontConfig::default(),
    };

    logging::init(&config.logging)?;

    let catalog = Catalog::load(&args.catalog, config.currency, &config.catalog)
        .with_context(|| format!("loading catalog from {}", args.catalog.display()))?;

    let listing: Vec<_> = catalog.search(args.search.as_deref().unwrap_or_default()).collect();

    println!("{} of {} products:", listing.len(), catalog.len());

    for product in listing {
        let featured = if product.featured { " *" } else { "" };

        println!("  [{}] {} {}{featured}", product.id, product.name, product.price);
    }

    let store = FileCartStore::with_key(&config.store.path, config.store.key.clone());
    let mut cart = Cart::hydrate(store, config.pricing);

    for request in &args.add {
        let Some(product) = catalog.get(&request.product_id) else {
            println!("No product with id {}", request.product_id);
            continue;
        };

        let size = request.size.as_deref().unwrap_or(product.default_size());

        cart.add_line(product, request.quantity, size, &request.color)?;
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    write_cart(&mut handle, &cart)?;

    if args.place_order {
        let customer = CustomerInfo {
            name: args.name,
            phone: args.phone,
            address: args.address,
            city: args.city,
            email: args.email,
            ..CustomerInfo::default()
        };

        let checkout = Checkout::new(OrderJournal::new(&args.journal), config.clear_policy);
        let (order, _receipt) = checkout.place_order(&mut cart, &customer, &args.notes)?;

        write_order(&mut handle, &order)?;

        println!("Order {} written to {}", order.id(), args.journal.display());
    }

    Ok(())
}
