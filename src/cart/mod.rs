//! Cart
//!
//! The cart ledger owns the shopper's lines, the rules for merging and removing
//! them, and every total derived from them. Each mutation is written through to
//! the cart's [`CartStore`]; a failing store is logged and otherwise ignored, the
//! in-memory lines stay authoritative.

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    pricing::{OrderTotals, Price, PricingError, PricingPolicy, total_price},
    products::{Product, ProductId},
};

pub mod line;
pub mod store;

pub use line::{CartLine, coerce_quantity};
pub use store::{CartStore, FileCartStore, MemoryCartStore, StoreError};

/// Errors related to adding products to a cart.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// A product's currency differs from the cart currency (product, product currency, cart currency).
    #[error("Product {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(ProductId, &'static str, &'static str),
}

/// Whether a cart holds anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    /// No lines.
    Empty,

    /// At least one line.
    Populated,
}

/// Cart
#[derive(Debug)]
pub struct Cart<S: CartStore = MemoryCartStore> {
    lines: Vec<CartLine>,
    policy: PricingPolicy,
    store: S,
}

impl Cart<MemoryCartStore> {
    /// Create a new, empty cart with the standard pricing policy and an in-memory store.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            lines: Vec::new(),
            policy: PricingPolicy::standard(currency),
            store: MemoryCartStore::default(),
        }
    }
}

impl<S: CartStore> Cart<S> {
    /// Create a cart hydrated from the given store.
    ///
    /// Missing or unreadable data starts an empty cart, and stored lines in a
    /// currency other than the policy's are dropped.
    pub fn hydrate(store: S, policy: PricingPolicy) -> Self {
        let currency = policy.currency();

        let lines = match store.load() {
            Ok(lines) => lines,
            Err(error) => {
                warn!(%error, "failed to load stored cart, starting empty");
                Vec::new()
            }
        };

        let stored = lines.len();

        let lines: Vec<CartLine> = lines
            .into_iter()
            .filter(|line| line.unit_price().currency() == currency)
            .collect();

        if lines.len() < stored {
            warn!(
                dropped = stored - lines.len(),
                currency = currency.iso_alpha_code,
                "dropped stored lines in another currency"
            );
        }

        let lines = merge_duplicate_keys(lines);

        debug!(lines = lines.len(), "hydrated cart");

        Cart {
            lines,
            policy,
            store,
        }
    }

    /// Add a product to the cart.
    ///
    /// A line with the same product, size and color has its quantity increased,
    /// otherwise a new line is appended. Sizes outside the product's list are accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::CurrencyMismatch`] if the product is priced in another currency.
    pub fn add_line(
        &mut self,
        product: &Product,
        quantity: NonZeroU32,
        size: &str,
        color: &str,
    ) -> Result<CartLine, CartError> {
        let currency = self.currency();
        let product_currency = product.price.currency();

        if product_currency != currency {
            return Err(CartError::CurrencyMismatch(
                product.id.clone(),
                product_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }

        let line = if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(&product.id, size, color))
        {
            line.increase_quantity(quantity);
            line.clone()
        } else {
            let line = CartLine::from_product(product, quantity, size, color);
            self.lines.push(line.clone());
            line
        };

        debug!(
            product = %product.id,
            size,
            color,
            added = quantity.get(),
            quantity = line.quantity(),
            "added to cart"
        );

        self.flush();

        Ok(line)
    }

    /// Add a single unit of a product in its default size and no color.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::CurrencyMismatch`] if the product is priced in another currency.
    pub fn add_product(&mut self, product: &Product) -> Result<CartLine, CartError> {
        self.add_line(product, NonZeroU32::MIN, product.default_size(), "")
    }

    /// Overwrite the quantity of a line.
    ///
    /// A quantity below one removes the line. Unknown lines are ignored.
    pub fn set_quantity(&mut self, product_id: &ProductId, size: &str, color: &str, quantity: i64) {
        if quantity < 1 {
            self.remove_line(product_id, size, color);
            return;
        }

        let quantity = u32::try_from(quantity)
            .map_or(NonZeroU32::MAX, |n| NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN));

        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product_id, size, color))
        else {
            debug!(product = %product_id, size, color, "quantity update for unknown line ignored");
            return;
        };

        line.set_quantity(quantity);

        debug!(product = %product_id, size, color, quantity = quantity.get(), "updated cart quantity");

        self.flush();
    }

    /// Remove a line. Unknown lines are ignored.
    pub fn remove_line(&mut self, product_id: &ProductId, size: &str, color: &str) {
        let before = self.lines.len();

        self.lines
            .retain(|line| !line.matches(product_id, size, color));

        if self.lines.len() < before {
            debug!(product = %product_id, size, color, "removed cart line");
        }

        self.flush();
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();

        debug!("cleared cart");

        self.flush();
    }

    /// Get a line by its product, size and color.
    pub fn get_line(&self, product_id: &ProductId, size: &str, color: &str) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.matches(product_id, size, color))
    }

    /// The lines in the order they were first added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Get the number of distinct lines in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the cart is empty or populated.
    pub fn state(&self) -> CartState {
        if self.is_empty() {
            CartState::Empty
        } else {
            CartState::Populated
        }
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity())).sum()
    }

    /// Get the currency of the cart.
    pub fn currency(&self) -> &'static Currency {
        self.policy.currency()
    }

    /// The shipping and tax rules for this cart.
    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// The store the cart writes through to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn subtotal(&self) -> Result<Price, PricingError> {
        if self.is_empty() {
            return Ok(Money::from_minor(0, self.currency()));
        }

        total_price(&self.lines, self.currency())
    }

    /// Shipping fee for the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn shipping_fee(&self) -> Result<Price, PricingError> {
        Ok(self.totals()?.shipping())
    }

    /// Tax on the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn tax(&self) -> Result<Price, PricingError> {
        Ok(self.totals()?.tax())
    }

    /// Subtotal plus shipping plus tax.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn grand_total(&self) -> Result<Price, PricingError> {
        Ok(self.totals()?.grand_total())
    }

    /// Every derived total, computed together.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn totals(&self) -> Result<OrderTotals, PricingError> {
        self.policy.totals(self.subtotal()?)
    }

    /// How much more has to be spent before shipping becomes free.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if there was a money arithmetic error.
    pub fn amount_to_free_shipping(&self) -> Result<Price, PricingError> {
        self.policy.amount_to_free_shipping(&self.subtotal()?)
    }

    fn flush(&mut self) {
        if let Err(error) = self.store.save(&self.lines) {
            warn!(%error, lines = self.lines.len(), "failed to persist cart");
        }
    }
}

/// Fold lines sharing a (product, size, color) key into the first of them.
fn merge_duplicate_keys(lines: Vec<CartLine>) -> Vec<CartLine> {
    let stored = lines.len();
    let mut merged: Vec<CartLine> = Vec::with_capacity(stored);

    for line in lines {
        match merged
            .iter_mut()
            .find(|kept| kept.matches(line.product_id(), line.size(), line.color()))
        {
            Some(kept) => kept.increase_quantity(line.quantity_nonzero()),
            None => merged.push(line),
        }
    }

    if merged.len() < stored {
        warn!(merged = stored - merged.len(), "merged stored lines with a repeated key");
    }

    merged
}
