//! Pricing

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::cart::CartLine;

/// A monetary amount in one of the ISO currencies.
pub type Price = Money<'static, Currency>;

/// Errors that can occur while calculating cart totals.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// An amount could not be represented in minor units.
    #[error("amount overflowed while calculating the {0}")]
    Overflow(&'static str),

    /// Policy amounts must share one currency (threshold currency, fee currency).
    #[error("free shipping threshold is in {0}, but the shipping fee is in {1}")]
    PolicyCurrencyMismatch(&'static str, &'static str),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculates the extended price of `quantity` units at `unit_price`.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the result does not fit in minor units.
pub fn extended_price(unit_price: &Price, quantity: u32) -> Result<Price, PricingError> {
    unit_price
        .to_minor_units()
        .checked_mul(i64::from(quantity))
        .map(|minor| Money::from_minor(minor, unit_price.currency()))
        .ok_or(PricingError::Overflow("line total"))
}

/// Calculates the total price of a list of cart lines.
///
/// Lines are summed by their extended prices so that no rounding happens along the way.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: a line total did not fit in minor units.
/// - [`PricingError::Money`]: wrapped money arithmetic or currency mismatch error.
pub fn total_price(lines: &[CartLine], currency: &'static Currency) -> Result<Price, PricingError> {
    lines
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, line| {
            Ok(acc.add(line.extended_price()?)?)
        })
}

/// Converts an amount in major units (e.g. `5.99`) to the currency's minor units.
///
/// Scales by the currency's exponent, so `5.99 USD` is 599 and `1500 JPY` is 1500.
/// Sub-minor fractions are rounded half away from zero. Returns `None` on overflow.
pub fn minor_units(amount: Decimal, currency: &'static Currency) -> Option<i64> {
    (0..currency.exponent)
        .try_fold(amount, |scaled, _| scaled.checked_mul(Decimal::TEN))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Shipping and tax rules applied on top of a cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    free_shipping_threshold: Price,
    flat_shipping_fee: Price,
    tax_rate: Percentage,
}

impl PricingPolicy {
    /// Free shipping from 50.00, otherwise a flat 5.99, plus 8% tax.
    #[must_use]
    pub fn standard(currency: &'static Currency) -> Self {
        // Both amounts fit in minor units for every ISO exponent.
        let threshold = minor_units(Decimal::new(5000, 2), currency).unwrap_or_default();
        let fee = minor_units(Decimal::new(599, 2), currency).unwrap_or_default();

        Self {
            free_shipping_threshold: Money::from_minor(threshold, currency),
            flat_shipping_fee: Money::from_minor(fee, currency),
            tax_rate: Percentage::from(0.08),
        }
    }

    /// Create a new pricing policy.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::PolicyCurrencyMismatch`] if the threshold and fee use different
    /// currencies.
    pub fn new(
        free_shipping_threshold: Price,
        flat_shipping_fee: Price,
        tax_rate: Percentage,
    ) -> Result<Self, PricingError> {
        let threshold_currency = free_shipping_threshold.currency();
        let fee_currency = flat_shipping_fee.currency();

        if threshold_currency != fee_currency {
            return Err(PricingError::PolicyCurrencyMismatch(
                threshold_currency.iso_alpha_code,
                fee_currency.iso_alpha_code,
            ));
        }

        Ok(Self {
            free_shipping_threshold,
            flat_shipping_fee,
            tax_rate,
        })
    }

    /// The currency every amount in this policy is expressed in.
    pub fn currency(&self) -> &'static Currency {
        self.free_shipping_threshold.currency()
    }

    /// Subtotal from which shipping is free (inclusive).
    pub fn free_shipping_threshold(&self) -> Price {
        self.free_shipping_threshold
    }

    /// Fee charged below the free shipping threshold.
    pub fn flat_shipping_fee(&self) -> Price {
        self.flat_shipping_fee
    }

    /// Tax rate applied to the subtotal.
    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }

    /// Shipping fee for the given subtotal.
    pub fn shipping_fee(&self, subtotal: &Price) -> Price {
        if subtotal.to_minor_units() >= self.free_shipping_threshold.to_minor_units() {
            Money::from_minor(0, self.currency())
        } else {
            self.flat_shipping_fee
        }
    }

    /// Tax owed on the subtotal, rounded to minor units.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the tax cannot be represented in minor units.
    pub fn tax(&self, subtotal: &Price) -> Result<Price, PricingError> {
        let exact = self.exact_tax_minor(subtotal)?;

        Ok(Money::from_minor(round_minor(exact, "tax")?, subtotal.currency()))
    }

    /// How much more has to be spent before shipping becomes free.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError::Money`] if the subtotal is in a different currency.
    pub fn amount_to_free_shipping(&self, subtotal: &Price) -> Result<Price, PricingError> {
        let remaining = self.free_shipping_threshold.sub(*subtotal)?;

        if remaining.to_minor_units() > 0 {
            Ok(remaining)
        } else {
            Ok(Money::from_minor(0, self.currency()))
        }
    }

    /// Calculate every derived total for a subtotal.
    ///
    /// Tax is carried unrounded into the grand total, which is rounded once.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow or if the subtotal is in a different currency.
    pub fn totals(&self, subtotal: Price) -> Result<OrderTotals, PricingError> {
        let currency = self.currency();

        if subtotal.currency() != currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: currency.iso_alpha_code,
                actual: subtotal.currency().iso_alpha_code,
            }
            .into());
        }

        let shipping = self.shipping_fee(&subtotal);
        let exact_tax = self.exact_tax_minor(&subtotal)?;
        let tax = Money::from_minor(round_minor(exact_tax, "tax")?, currency);

        let grand_total = Decimal::from(subtotal.to_minor_units())
            .checked_add(Decimal::from(shipping.to_minor_units()))
            .and_then(|sum| sum.checked_add(exact_tax))
            .ok_or(PricingError::Overflow("grand total"))?;

        let grand_total = Money::from_minor(round_minor(grand_total, "grand total")?, currency);

        Ok(OrderTotals {
            subtotal,
            shipping,
            tax,
            grand_total,
        })
    }

    fn exact_tax_minor(&self, subtotal: &Price) -> Result<Decimal, PricingError> {
        // decimal_percentage doesn't expose the underlying Decimal
        (self.tax_rate * Decimal::ONE)
            .checked_mul(Decimal::from(subtotal.to_minor_units()))
            .ok_or(PricingError::Overflow("tax"))
    }
}

fn round_minor(amount: Decimal, what: &'static str) -> Result<i64, PricingError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow(what))
}

/// Every amount shown to a customer for a cart, computed in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    subtotal: Price,
    shipping: Price,
    tax: Price,
    grand_total: Price,
}

impl OrderTotals {
    /// Sum of line extended prices.
    pub fn subtotal(&self) -> Price {
        self.subtotal
    }

    /// Shipping fee.
    pub fn shipping(&self) -> Price {
        self.shipping
    }

    /// Tax, rounded to minor units.
    pub fn tax(&self) -> Price {
        self.tax
    }

    /// The final payable amount.
    pub fn grand_total(&self) -> Price {
        self.grand_total
    }

    /// Whether shipping was waived.
    pub fn has_free_shipping(&self) -> bool {
        self.shipping.to_minor_units() == 0
    }
}
