//! Utils

use std::{convert::Infallible, num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;

use crate::{cart::coerce_quantity, products::ProductId};

/// Arguments for the checkout demo
#[derive(Debug, Parser)]
pub struct CheckoutArgs {
    /// Product catalog JSON file
    #[clap(short, long, default_value = "fixtures/products.json")]
    pub catalog: PathBuf,

    /// Storefront YAML config
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Line to add, as `ID[:QTY[:SIZE[:COLOR]]]`. Repeatable.
    #[clap(short, long = "add")]
    pub add: Vec<LineRequest>,

    /// Only list products matching this term
    #[clap(short, long)]
    pub search: Option<String>,

    /// Place an order for the cart after adding lines
    #[clap(long)]
    pub place_order: bool,

    /// Orders are appended to this file
    #[clap(long, default_value = "orders.jsonl")]
    pub journal: PathBuf,

    /// Customer name
    #[clap(long, default_value = "")]
    pub name: String,

    /// Customer phone
    #[clap(long, default_value = "")]
    pub phone: String,

    /// Customer street address
    #[clap(long, default_value = "")]
    pub address: String,

    /// Customer city
    #[clap(long, default_value = "")]
    pub city: String,

    /// Customer email
    #[clap(long, default_value = "")]
    pub email: String,

    /// Order notes
    #[clap(long, default_value = "")]
    pub notes: String,
}

/// A requested cart line: product, quantity, size and color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    /// Product to add
    pub product_id: ProductId,

    /// Units to add, at least one
    pub quantity: NonZeroU32,

    /// Size, `None` for the product's default
    pub size: Option<String>,

    /// Color, empty for none
    pub color: String,
}

impl FromStr for LineRequest {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');

        let id = parts.next().unwrap_or_default().trim();
        let product_id = id
            .parse::<i64>()
            .map_or_else(|_| ProductId::from(id), ProductId::from);

        let quantity = parts.next().map_or(NonZeroU32::MIN, coerce_quantity);

        let size = parts
            .next()
            .map(str::trim)
            .filter(|size| !size.is_empty())
            .map(str::to_string);

        let color = parts.next().unwrap_or_default().trim().to_string();

        Ok(Self {
            product_id,
            quantity,
            size,
            color,
        })
    }
}
