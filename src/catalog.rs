//! Catalog
//!
//! Loads the product listing and normalizes each record. Source data is trusted
//! to be a list of objects, but any individual field may be missing or of the
//! wrong type; those fall back to the values in [`CatalogDefaults`].

use std::{fs, path::Path};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    pricing::{Price, minor_units},
    products::{Color, DEFAULT_SIZE, Product, ProductId},
};

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog is not a JSON list
    #[error("Failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// A price could not be represented in minor units
    #[error("Invalid price for product {0}: {1}")]
    InvalidPrice(ProductId, Decimal),
}

/// Fallback values applied to incomplete product records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogDefaults {
    /// Name for unnamed products
    pub name: String,

    /// Price for products without one
    pub price: Decimal,

    /// Description for products without one
    pub description: String,

    /// Image used when a product has no image list
    pub placeholder_image: String,

    /// Prefix for image paths that aren't absolute URLs
    pub image_base: String,

    /// Size for products without sizes
    pub size: String,

    /// Rating for products without one
    pub rating: Decimal,

    /// Review count for products without one
    pub reviews: u32,
}

impl Default for CatalogDefaults {
    fn default() -> Self {
        Self {
            name: "Unnamed Product".to_string(),
            price: Decimal::ZERO,
            description: "No description available".to_string(),
            placeholder_image: "/img/products/placeholder.jpg".to_string(),
            image_base: "/img/products".to_string(),
            size: DEFAULT_SIZE.to_string(),
            rating: Decimal::new(40, 1),
            reviews: 0,
        }
    }
}

impl CatalogDefaults {
    /// Normalize one raw record into a product priced in `currency`.
    ///
    /// `position` is the record's index in the listing, used to name products without an id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidPrice`] if a price doesn't fit in minor units.
    fn normalize(
        &self,
        raw: RawProduct,
        position: usize,
        currency: &'static Currency,
    ) -> Result<Product, CatalogError> {
        let id = raw
            .id
            .unwrap_or_else(|| ProductId::Text(format!("product-{position}")));

        let price = raw
            .price
            .filter(|price| !price.is_sign_negative())
            .unwrap_or(self.price);

        let price = to_money(&id, price, currency)?;

        let original_price = match raw.original_price {
            Some(original) => Some(to_money(&id, original, currency)?)
                .filter(|original| original.to_minor_units() >= price.to_minor_units()),
            None => None,
        };

        let images = match raw.images {
            Some(images) if !images.is_empty() => images
                .into_iter()
                .map(|image| self.image_url(image))
                .collect(),
            _ => vec![self.placeholder_image.clone()],
        };

        let sizes = match raw.sizes {
            Some(sizes) if !sizes.is_empty() => sizes,
            _ => vec![self.size.clone()],
        };

        Ok(Product {
            id,
            name: raw
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| self.name.clone()),
            price,
            original_price,
            images,
            sizes,
            colors: raw.colors.unwrap_or_default(),
            description: raw
                .description
                .filter(|description| !description.is_empty())
                .unwrap_or_else(|| self.description.clone()),
            category: raw.category.unwrap_or_default(),
            featured: raw.featured.unwrap_or(false),
            rating: raw.rating.unwrap_or(self.rating),
            reviews: raw.reviews.unwrap_or(self.reviews),
        })
    }

    fn image_url(&self, image: String) -> String {
        if image.starts_with("http") {
            image
        } else {
            format!("{}{image}", self.image_base)
        }
    }
}

fn to_money(
    id: &ProductId,
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Price, CatalogError> {
    let minor =
        minor_units(amount, currency).ok_or_else(|| CatalogError::InvalidPrice(id.clone(), amount))?;

    Ok(Money::from_minor(minor, currency))
}

/// A product record as found in the listing, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<ProductId>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    original_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    category: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    featured: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    sizes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    colors: Option<Vec<Color>>,
    #[serde(default, deserialize_with = "lenient")]
    rating: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    reviews: Option<u32>,
}

/// Deserialize a field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    Ok(serde_json::from_value(value).ok())
}

/// Catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    index: FxHashMap<ProductId, usize>,
    currency: &'static Currency,
}

impl Catalog {
    /// Create a catalog from already normalized products.
    ///
    /// When ids repeat, lookups find the first product with that id.
    pub fn new(products: Vec<Product>, currency: &'static Currency) -> Self {
        let mut index = FxHashMap::default();

        for (position, product) in products.iter().enumerate() {
            index.entry(product.id.clone()).or_insert(position);
        }

        Self {
            products,
            index,
            currency,
        }
    }

    /// Parse and normalize a JSON product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing isn't a JSON list or a price is out of range.
    pub fn from_json(
        json: &str,
        currency: &'static Currency,
        defaults: &CatalogDefaults,
    ) -> Result<Self, CatalogError> {
        let records: Vec<Value> = serde_json::from_str(json)?;

        let products = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| {
                let raw: RawProduct = serde_json::from_value(record).unwrap_or_default();

                defaults.normalize(raw, position, currency)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(products = products.len(), "loaded catalog");

        Ok(Self::new(products, currency))
    }

    /// Load a JSON product listing from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(
        path: impl AsRef<Path>,
        currency: &'static Currency,
        defaults: &CatalogDefaults,
    ) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;

        Self::from_json(&contents, currency, defaults)
    }

    /// Get a product by id.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.index
            .get(id)
            .and_then(|position| self.products.get(*position))
    }

    /// Products whose name, description or categories contain `term`, ignoring case.
    ///
    /// An empty term matches everything.
    pub fn search<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a Product> + 'a {
        let term = term.trim().to_lowercase();

        self.products.iter().filter(move |product| {
            term.is_empty()
                || product.name.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
                || product
                    .category
                    .iter()
                    .any(|category| category.to_lowercase().contains(&term))
        })
    }

    /// Featured products.
    pub fn featured(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.featured)
    }

    /// Iterate over the products in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Get the number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Currency every product is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{JPY, USD};
    use testresult::TestResult;

    use super::*;

    const LISTING: &str = r##"[
        {
            "id": 1,
            "name": "Akatsuki Hoodie",
            "price": 45.5,
            "originalPrice": 60,
            "images": ["/hoodie-front.jpg", "https://cdn.example.com/hoodie-back.jpg"],
            "description": "Heavyweight cotton hoodie",
            "category": ["Apparel", "Naruto"],
            "featured": true,
            "sizes": ["S", "M", "L"],
            "colors": [{"name": "Black", "code": "#000000"}],
            "rating": 4.7,
            "reviews": 31
        },
        {
            "id": "poster-2",
            "price": "12.99",
            "images": "not-a-list",
            "sizes": [],
            "colors": "red",
            "category": "Posters"
        },
        {}
    ]"##;

    fn catalog() -> Result<Catalog, CatalogError> {
        Catalog::from_json(LISTING, USD, &CatalogDefaults::default())
    }

    #[test]
    fn complete_record_is_kept() -> TestResult {
        let catalog = catalog()?;
        let hoodie = catalog.get(&ProductId::Number(1)).ok_or("missing hoodie")?;

        assert_eq!(hoodie.name, "Akatsuki Hoodie");
        assert_eq!(hoodie.price, Money::from_minor(4550, USD));
        assert_eq!(hoodie.original_price, Some(Money::from_minor(6000, USD)));
        assert_eq!(
            hoodie.images,
            vec![
                "/img/products/hoodie-front.jpg".to_string(),
                "https://cdn.example.com/hoodie-back.jpg".to_string(),
            ]
        );
        assert_eq!(hoodie.sizes, vec!["S", "M", "L"]);
        assert_eq!(hoodie.colors.len(), 1);
        assert!(hoodie.featured);
        assert_eq!(hoodie.rating, Decimal::new(47, 1));
        assert_eq!(hoodie.reviews, 31);

        Ok(())
    }

    #[test]
    fn wrong_shaped_fields_fall_back() -> TestResult {
        let catalog = catalog()?;
        let poster = catalog.get(&ProductId::from("poster-2")).ok_or("missing poster")?;
        let defaults = CatalogDefaults::default();

        assert_eq!(poster.name, defaults.name);
        assert_eq!(poster.price, Money::from_minor(1299, USD));
        assert_eq!(poster.images, vec![defaults.placeholder_image]);
        assert_eq!(poster.sizes, vec![DEFAULT_SIZE.to_string()]);
        assert!(poster.colors.is_empty());
        assert!(poster.category.is_empty());
        assert_eq!(poster.description, defaults.description);

        Ok(())
    }

    #[test]
    fn empty_record_gets_positional_id_and_defaults() -> TestResult {
        let catalog = catalog()?;
        let empty = catalog.get(&ProductId::from("product-2")).ok_or("missing product")?;

        assert_eq!(empty.price, Money::from_minor(0, USD));
        assert_eq!(empty.rating, Decimal::new(40, 1));
        assert_eq!(empty.reviews, 0);
        assert!(!empty.featured);
        assert_eq!(empty.original_price, None);

        Ok(())
    }

    #[test]
    fn original_price_below_price_is_dropped() -> TestResult {
        let catalog = Catalog::from_json(
            r#"[{"id": 1, "price": 20, "originalPrice": 15}]"#,
            USD,
            &CatalogDefaults::default(),
        )?;

        let product = catalog.get(&ProductId::Number(1)).ok_or("missing product")?;

        assert_eq!(product.original_price, None);

        Ok(())
    }

    #[test]
    fn prices_follow_currency_exponent() -> TestResult {
        let catalog = Catalog::from_json(
            r#"[{"id": 1, "price": 1500, "originalPrice": 1800}]"#,
            JPY,
            &CatalogDefaults::default(),
        )?;

        let product = catalog.get(&ProductId::Number(1)).ok_or("missing product")?;

        assert_eq!(product.price, Money::from_minor(1500, JPY));
        assert_eq!(product.original_price, Some(Money::from_minor(1800, JPY)));

        Ok(())
    }

    #[test]
    fn non_list_listing_errors() {
        let result = Catalog::from_json(r#"{"products": []}"#, USD, &CatalogDefaults::default());

        assert!(matches!(result, Err(CatalogError::Json(_))));
    }

    #[test]
    fn search_matches_name_description_and_category() -> TestResult {
        let catalog = catalog()?;

        let by_name: Vec<&ProductId> = catalog.search("akatsuki").map(|p| &p.id).collect();
        let by_description: Vec<&ProductId> = catalog.search("COTTON").map(|p| &p.id).collect();
        let by_category: Vec<&ProductId> = catalog.search("naruto").map(|p| &p.id).collect();

        assert_eq!(by_name, vec![&ProductId::Number(1)]);
        assert_eq!(by_description, vec![&ProductId::Number(1)]);
        assert_eq!(by_category, vec![&ProductId::Number(1)]);
        assert_eq!(catalog.search("").count(), 3);
        assert_eq!(catalog.search("zzz").count(), 0);

        Ok(())
    }

    #[test]
    fn featured_filters_products() -> TestResult {
        let catalog = catalog()?;

        assert_eq!(catalog.featured().count(), 1);

        Ok(())
    }

    #[test]
    fn duplicate_ids_resolve_to_first() -> TestResult {
        let catalog = Catalog::from_json(
            r#"[{"id": 1, "name": "First"}, {"id": 1, "name": "Second"}]"#,
            USD,
            &CatalogDefaults::default(),
        )?;

        let product = catalog.get(&ProductId::Number(1)).ok_or("missing product")?;

        assert_eq!(product.name, "First");
        assert_eq!(catalog.len(), 2);

        Ok(())
    }

    #[test]
    fn custom_defaults_are_applied() -> TestResult {
        let defaults = CatalogDefaults {
            size: "Free Size".to_string(),
            image_base: "/static".to_string(),
            ..CatalogDefaults::default()
        };

        let catalog = Catalog::from_json(r#"[{"id": 5, "images": ["/a.jpg"]}]"#, USD, &defaults)?;
        let product = catalog.get(&ProductId::Number(5)).ok_or("missing product")?;

        assert_eq!(product.sizes, vec!["Free Size"]);
        assert_eq!(product.images, vec!["/static/a.jpg"]);

        Ok(())
    }
}
