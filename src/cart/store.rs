//! Cart persistence

use std::{
    fs, io,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use rusty_money::{Findable, Money, iso::Currency};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{cart::CartLine, products::ProductId};

/// Key the cart is stored under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "cart";

/// Errors raised by cart stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error reading or writing the store
    #[error("failed to access cart store: {0}")]
    Io(#[from] io::Error),

    /// Stored data could not be encoded or decoded
    #[error("failed to encode or decode stored cart: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored line used a currency code we don't know
    #[error("unknown currency code in stored cart: {0}")]
    UnknownCurrency(String),

    /// A stored line had a quantity of zero
    #[error("stored line for product {0} has no quantity")]
    EmptyLine(ProductId),

    /// A stored line had a price below zero
    #[error("stored line for product {0} has a negative price")]
    NegativePrice(ProductId),
}

/// Key-value storage that outlives a cart session.
pub trait CartStore {
    /// Read the stored lines, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if stored data exists but cannot be read.
    fn load(&self) -> Result<Vec<CartLine>, StoreError>;

    /// Replace the stored lines.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the lines cannot be written.
    fn save(&mut self, lines: &[CartLine]) -> Result<(), StoreError>;
}

/// Store that keeps the last saved lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    lines: Vec<CartLine>,
}

impl MemoryCartStore {
    /// Create a store that already holds some lines.
    pub fn with_lines(lines: impl Into<Vec<CartLine>>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// The most recently saved lines.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        Ok(self.lines.clone())
    }

    fn save(&mut self, lines: &[CartLine]) -> Result<(), StoreError> {
        self.lines = lines.to_vec();

        Ok(())
    }
}

/// Store backed by a JSON file holding string keys, like a browser's local storage.
///
/// Other keys in the same file are left untouched on save.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    path: PathBuf,
    key: String,
}

impl FileCartStore {
    /// Create a store using the default `cart` key.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, DEFAULT_CART_KEY)
    }

    /// Create a store using a custom key.
    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key the cart is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_entries(&self) -> Result<Option<Map<String, Value>>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl CartStore for FileCartStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        let Some(mut entries) = self.read_entries()? else {
            return Ok(Vec::new());
        };

        let Some(value) = entries.remove(&self.key) else {
            return Ok(Vec::new());
        };

        let stored: Vec<StoredLine> = serde_json::from_value(value)?;

        stored.into_iter().map(CartLine::try_from).collect()
    }

    fn save(&mut self, lines: &[CartLine]) -> Result<(), StoreError> {
        // Unreadable files are overwritten rather than blocking the save.
        let mut entries = self.read_entries().ok().flatten().unwrap_or_default();

        let stored: Vec<StoredLine> = lines.iter().map(StoredLine::from).collect();
        entries.insert(self.key.clone(), serde_json::to_value(stored)?);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;

        Ok(())
    }
}

/// Serialized form of a cart line, amounts in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredLine {
    pub(crate) id: ProductId,
    pub(crate) name: String,
    pub(crate) currency: String,
    pub(crate) price: i64,
    #[serde(default)]
    pub(crate) original_price: Option<i64>,
    #[serde(default)]
    pub(crate) image: String,
    pub(crate) quantity: u32,
    pub(crate) size: String,
    #[serde(default)]
    pub(crate) color: String,
}

impl From<&CartLine> for StoredLine {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.product_id().clone(),
            name: line.name().to_string(),
            currency: line.unit_price().currency().iso_alpha_code.to_string(),
            price: line.unit_price().to_minor_units(),
            original_price: line.original_unit_price().map(Money::to_minor_units),
            image: line.image().to_string(),
            quantity: line.quantity(),
            size: line.size().to_string(),
            color: line.color().to_string(),
        }
    }
}

impl TryFrom<StoredLine> for CartLine {
    type Error = StoreError;

    fn try_from(stored: StoredLine) -> Result<Self, Self::Error> {
        let currency = Currency::find(&stored.currency)
            .ok_or_else(|| StoreError::UnknownCurrency(stored.currency.clone()))?;

        let quantity =
            NonZeroU32::new(stored.quantity).ok_or_else(|| StoreError::EmptyLine(stored.id.clone()))?;

        if stored.price < 0 || stored.original_price.is_some_and(|minor| minor < 0) {
            return Err(StoreError::NegativePrice(stored.id));
        }

        Ok(CartLine::from_parts(
            stored.id,
            stored.name,
            Money::from_minor(stored.price, currency),
            stored
                .original_price
                .map(|minor| Money::from_minor(minor, currency)),
            stored.image,
            quantity,
            stored.size,
            stored.color,
        ))
    }
}
