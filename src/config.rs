//! Configuration
//!
//! Storefront settings are read from a YAML file. Every section is optional
//! and falls back to the standard policy: free shipping from 50.00, a 5.99 flat
//! fee, and 8% tax.
//!
//! ```yaml
//! currency: USD
//! pricing:
//!   free_shipping_threshold: "50.00 USD"
//!   flat_shipping_fee: "5.99 USD"
//!   tax_rate: "8%"
//! store:
//!   path: storage.json
//!   key: cart
//! checkout:
//!   clear_policy: on_acknowledgement
//! ```

use std::{fs, path::Path, path::PathBuf};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{
    Findable, Money,
    iso::{self, Currency},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::store::DEFAULT_CART_KEY,
    catalog::CatalogDefaults,
    checkout::ClearPolicy,
    logging::LogSettings,
    pricing::{PricingError, PricingPolicy, minor_units},
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// A policy amount is not in the storefront currency (expected, found)
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Invalid pricing policy
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Where the cart is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Path of the key-value file
    pub path: PathBuf,

    /// Key the cart is stored under
    pub key: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage.json"),
            key: DEFAULT_CART_KEY.to_string(),
        }
    }
}

/// Storefront configuration
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Currency the storefront sells in
    pub currency: &'static Currency,

    /// Shipping and tax rules
    pub pricing: PricingPolicy,

    /// Product normalization fallbacks
    pub catalog: CatalogDefaults,

    /// Cart persistence
    pub store: StoreSettings,

    /// What happens to the cart when an order can't be delivered
    pub clear_policy: ClearPolicy,

    /// Log level and format
    pub logging: LogSettings,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            currency: iso::USD,
            pricing: PricingPolicy::standard(iso::USD),
            catalog: CatalogDefaults::default(),
            store: StoreSettings::default(),
            clear_policy: ClearPolicy::default(),
            logging: LogSettings::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or holds invalid settings.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_norway::from_str(yaml)?;

        file.try_into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    currency: Option<String>,
    pricing: PricingFile,
    catalog: CatalogDefaults,
    store: StoreFile,
    checkout: CheckoutFile,
    logging: LogSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PricingFile {
    free_shipping_threshold: Option<String>,
    flat_shipping_fee: Option<String>,
    tax_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StoreFile {
    path: Option<PathBuf>,
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CheckoutFile {
    clear_policy: ClearPolicy,
}

impl TryFrom<ConfigFile> for StorefrontConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let currency = match file.currency.as_deref() {
            Some(code) => parse_currency(code)?,
            None => iso::USD,
        };

        let standard = PricingPolicy::standard(currency);

        let threshold = file
            .pricing
            .free_shipping_threshold
            .as_deref()
            .map(|price| parse_price_in(price, currency))
            .transpose()?
            .unwrap_or_else(|| standard.free_shipping_threshold());

        let fee = file
            .pricing
            .flat_shipping_fee
            .as_deref()
            .map(|price| parse_price_in(price, currency))
            .transpose()?
            .unwrap_or_else(|| standard.flat_shipping_fee());

        let tax_rate = file
            .pricing
            .tax_rate
            .as_deref()
            .map(parse_percentage)
            .transpose()?
            .unwrap_or_else(|| standard.tax_rate());

        let defaults = StoreSettings::default();

        Ok(Self {
            currency,
            pricing: PricingPolicy::new(threshold, fee, tax_rate)?,
            catalog: file.catalog,
            store: StoreSettings {
                path: file.store.path.unwrap_or(defaults.path),
                key: file.store.key.unwrap_or(defaults.key),
            },
            clear_policy: file.checkout.clear_policy,
            logging: file.logging,
        })
    }
}

/// Look up an ISO currency by its alphabetic code
///
/// # Errors
///
/// Returns [`ConfigError::UnknownCurrency`] if the code isn't an ISO currency.
pub fn parse_currency(code: &str) -> Result<&'static Currency, ConfigError> {
    Currency::find(code.trim()).ok_or_else(|| ConfigError::UnknownCurrency(code.to_string()))
}

/// Parse price string (e.g., "5.99 USD") into minor units and currency
///
/// Minor units follow the currency's exponent, so "500 JPY" is 500.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), ConfigError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(ConfigError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| ConfigError::InvalidPrice(s.to_string()))?;

    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidPrice(s.to_string()));
    }

    let currency = parse_currency(currency_code)?;

    let minor =
        minor_units(amount, currency).ok_or_else(|| ConfigError::InvalidPrice(s.to_string()))?;

    Ok((minor, currency))
}

fn parse_price_in(
    s: &str,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, ConfigError> {
    let (minor, parsed) = parse_price(s)?;

    if parsed != currency {
        return Err(ConfigError::CurrencyMismatch(
            currency.iso_alpha_code.to_string(),
            parsed.iso_alpha_code.to_string(),
        ));
    }

    Ok(Money::from_minor(minor, currency))
}

/// Parse percentage string (e.g., "8%" or "0.08") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "8%" for 8%
/// - Decimal format: "0.08" for 8%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed or is negative.
pub fn parse_percentage(s: &str) -> Result<Percentage, ConfigError> {
    let trimmed = s.trim();

    let value = if let Some(percent_str) = trimmed.strip_suffix('%') {
        // "8%" -> 0.08
        percent_str
            .trim()
            .parse::<Decimal>()
            .ok()
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
    } else {
        trimmed.parse::<Decimal>().ok()
    };

    match value {
        Some(value) if !value.is_sign_negative() => Percentage::try_from(value.to_string().as_str())
            .map_err(|_err| ConfigError::InvalidPercentage(s.to_string())),
        _ => Err(ConfigError::InvalidPercentage(s.to_string())),
    }
}
