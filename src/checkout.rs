//! Checkout
//!
//! Turns a cart into an [`Order`], hands it to an [`OrderDispatcher`], and
//! decides whether the cart is cleared afterwards.

use std::{
    fmt,
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::{Cart, CartLine, CartStore, store::StoredLine},
    pricing::{OrderTotals, PricingError},
};

/// Problems with the details a shopper entered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomerError {
    /// A required field was blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Phone must be 9 to 15 digits, dashes or plus signs
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// Email doesn't look like an address
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Errors from delivering an order.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The receiving system rejected or never acknowledged the order
    #[error("order delivery failed: {0}")]
    Rejected(String),

    /// IO error writing the order
    #[error("failed to write order: {0}")]
    Io(#[from] io::Error),

    /// The order could not be encoded
    #[error("failed to encode order: {0}")]
    Json(#[from] serde_json::Error),
}

/// Checkout errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order
    #[error("cart is empty")]
    EmptyCart,

    /// Shopper details failed validation
    #[error(transparent)]
    Customer(#[from] CustomerError),

    /// Totals could not be calculated
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The dispatcher didn't acknowledge the order
    #[error("order {order_id} was not delivered: {source}")]
    Dispatch {
        /// Id of the order that failed
        order_id: OrderId,

        /// Underlying dispatch error
        source: DispatchError,
    },
}

/// What happens to the cart when an order can't be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Keep the cart so the order can be retried
    #[default]
    OnAcknowledgement,

    /// Clear the cart whether or not delivery succeeded
    Always,
}

/// Shipping details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Full name
    pub name: String,

    /// Phone number
    pub phone: String,

    /// Street address
    pub address: String,

    /// City
    pub city: String,

    /// Postal code, optional
    #[serde(default)]
    pub zip: String,

    /// Country, optional
    #[serde(default)]
    pub country: String,

    /// Email address for the confirmation, optional
    #[serde(default)]
    pub email: String,
}

impl CustomerInfo {
    /// Copy of these details with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            zip: self.zip.trim().to_string(),
            country: self.country.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }

    /// Check required fields, the phone number and, if given, the email address.
    ///
    /// # Errors
    ///
    /// Returns the first [`CustomerError`] found.
    pub fn validate(&self) -> Result<(), CustomerError> {
        let required = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
        ];

        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(CustomerError::MissingField(*field));
        }

        let phone = self.phone.trim();

        if !is_valid_phone(phone) {
            return Err(CustomerError::InvalidPhone(phone.to_string()));
        }

        let email = self.email.trim();

        if !email.is_empty() && !is_valid_email(email) {
            return Err(CustomerError::InvalidEmail(email.to_string()));
        }

        Ok(())
    }
}

fn is_valid_phone(phone: &str) -> bool {
    (9..=15).contains(&phone.chars().count())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '+')
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !local.is_empty() && !host.is_empty() && !tld.is_empty() && !domain.contains('@')
}

/// Order identifier, `ORD-<6 digits of the order time>-<3 random digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Generate an id for an order placed at `placed_at`.
    pub fn generate(placed_at: Timestamp) -> Self {
        Self::from_parts(placed_at, rand::thread_rng().gen_range(0..1000))
    }

    fn from_parts(placed_at: Timestamp, suffix: u16) -> Self {
        let millis = placed_at.as_millisecond().rem_euclid(1_000_000);

        Self(format!("ORD-{millis:06}-{suffix:03}"))
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finalized order: a snapshot of the cart and its totals plus the shopper's details.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    placed_at: Timestamp,
    customer: CustomerInfo,
    lines: Vec<CartLine>,
    totals: OrderTotals,
    notes: String,
}

impl Order {
    /// Order id.
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// When the order was placed.
    pub fn placed_at(&self) -> Timestamp {
        self.placed_at
    }

    /// Shipping details.
    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    /// Ordered lines.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Subtotal, shipping, tax and grand total.
    pub fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    /// Free-text notes from the shopper.
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Total number of units ordered.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity())).sum()
    }

    /// One `name (size, Qty: n)` entry per line, newline separated.
    pub fn describe_items(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{} ({}, Qty: {})", line.name(), line.size(), line.quantity()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Acknowledgement returned by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Reference assigned by the receiving system
    pub reference: String,
}

/// Delivers finalized orders to an external system.
#[cfg_attr(test, mockall::automock)]
pub trait OrderDispatcher {
    /// Deliver an order, returning once it has been acknowledged.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the order was not accepted.
    fn dispatch(&self, order: &Order) -> Result<DispatchReceipt, DispatchError>;
}

/// Dispatcher that appends every order as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct OrderJournal {
    path: PathBuf,
}

impl OrderJournal {
    /// Create a journal writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OrderDispatcher for OrderJournal {
    fn dispatch(&self, order: &Order) -> Result<DispatchReceipt, DispatchError> {
        let record = serde_json::to_string(&OrderRecord::from(order))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{record}")?;

        Ok(DispatchReceipt {
            reference: order.id().to_string(),
        })
    }
}

/// Serialized form of an order, amounts in minor units.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderRecord {
    pub(crate) id: OrderId,
    pub(crate) placed_at: Timestamp,
    pub(crate) currency: String,
    pub(crate) customer: CustomerInfo,
    pub(crate) items: Vec<StoredLine>,
    pub(crate) item_summary: String,
    pub(crate) item_count: u64,
    pub(crate) subtotal: i64,
    pub(crate) shipping: i64,
    pub(crate) tax: i64,
    pub(crate) total: i64,
    pub(crate) notes: String,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        let totals = order.totals();

        Self {
            id: order.id.clone(),
            placed_at: order.placed_at,
            currency: totals.grand_total().currency().iso_alpha_code.to_string(),
            customer: order.customer.clone(),
            items: order.lines.iter().map(StoredLine::from).collect(),
            item_summary: order.describe_items(),
            item_count: order.item_count(),
            subtotal: totals.subtotal().to_minor_units(),
            shipping: totals.shipping().to_minor_units(),
            tax: totals.tax().to_minor_units(),
            total: totals.grand_total().to_minor_units(),
            notes: order.notes.clone(),
        }
    }
}

/// Places orders for carts through a dispatcher.
#[derive(Debug)]
pub struct Checkout<D> {
    dispatcher: D,
    clear_policy: ClearPolicy,
}

impl<D: OrderDispatcher> Checkout<D> {
    /// Create a checkout delivering orders through `dispatcher`.
    pub fn new(dispatcher: D, clear_policy: ClearPolicy) -> Self {
        Self {
            dispatcher,
            clear_policy,
        }
    }

    /// The dispatcher orders are delivered through.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Place an order for everything in the cart.
    ///
    /// The cart is cleared once the dispatcher acknowledges the order. If delivery
    /// fails the cart is kept for a retry, unless the clear policy is
    /// [`ClearPolicy::Always`].
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart is empty, the customer details are
    /// invalid, totals can't be calculated, or delivery fails.
    pub fn place_order<S: CartStore>(
        &self,
        cart: &mut Cart<S>,
        customer: &CustomerInfo,
        notes: &str,
    ) -> Result<(Order, DispatchReceipt), CheckoutError> {
        let customer = customer.trimmed();
        customer.validate()?;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let placed_at = Timestamp::now();

        let order = Order {
            id: OrderId::generate(placed_at),
            placed_at,
            customer,
            lines: cart.lines().to_vec(),
            totals: cart.totals()?,
            notes: notes.trim().to_string(),
        };

        match self.dispatcher.dispatch(&order) {
            Ok(receipt) => {
                info!(
                    order_id = %order.id,
                    reference = %receipt.reference,
                    total = %order.totals.grand_total(),
                    "order placed"
                );

                cart.clear();

                Ok((order, receipt))
            }
            Err(error) => {
                warn!(order_id = %order.id, %error, policy = ?self.clear_policy, "order delivery failed");

                if self.clear_policy == ClearPolicy::Always {
                    cart.clear();
                }

                Err(CheckoutError::Dispatch {
                    order_id: order.id,
                    source: error,
                })
            }
        }
    }
}
