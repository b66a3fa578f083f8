//! Products

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::pricing::Price;

/// Size label used when a product doesn't list any sizes.
pub const DEFAULT_SIZE: &str = "One Size";

/// Product identifier, numeric or textual as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    /// Numeric identifier
    Number(i64),

    /// Textual identifier
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(id) => write!(f, "{id}"),
            ProductId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        ProductId::Number(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId::Text(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        ProductId::Text(id)
    }
}

/// A color option offered for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Display name, also used as the cart line color.
    pub name: String,

    /// Swatch color code, e.g. `#ff0000`.
    pub code: String,
}

/// Product
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Product price
    pub price: Price,

    /// Price before markdown, at least `price` when present
    pub original_price: Option<Price>,

    /// Image references, first one is the primary image
    pub images: Vec<String>,

    /// Size labels on offer
    pub sizes: Vec<String>,

    /// Color options, possibly empty
    pub colors: Vec<Color>,

    /// Product description
    pub description: String,

    /// Category labels
    pub category: Vec<String>,

    /// Whether the product is featured
    pub featured: bool,

    /// Average rating
    pub rating: Decimal,

    /// Number of reviews
    pub reviews: u32,
}

impl Product {
    /// Create a product with no images, the default size and no colors.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: None,
            images: Vec::new(),
            sizes: vec![DEFAULT_SIZE.to_string()],
            colors: Vec::new(),
            description: String::new(),
            category: Vec::new(),
            featured: false,
            rating: Decimal::ZERO,
            reviews: 0,
        }
    }

    /// The size a cart line gets when the shopper didn't pick one.
    pub fn default_size(&self) -> &str {
        self.sizes.first().map_or(DEFAULT_SIZE, String::as_str)
    }

    /// The primary image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whole percent saved against the original price, if the product is marked down.
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?.to_minor_units();
        let price = self.price.to_minor_units();

        if original <= price || original <= 0 {
            return None;
        }

        let saved = Decimal::from(original.checked_sub(price)?)
            .checked_mul(Decimal::ONE_HUNDRED)?
            .checked_div(Decimal::from(original))?;

        saved
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }
}
