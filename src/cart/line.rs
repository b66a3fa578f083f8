//! Cart Lines

use std::num::{IntErrorKind, NonZeroU32};

use crate::{
    pricing::{Price, PricingError, extended_price},
    products::{Product, ProductId},
};

/// One distinct (product, size, color) entry in a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    product_id: ProductId,
    name: String,
    unit_price: Price,
    original_unit_price: Option<Price>,
    image: String,
    quantity: NonZeroU32,
    size: String,
    color: String,
}

impl CartLine {
    /// Capture a product's name, prices and primary image into a new line.
    pub fn from_product(
        product: &Product,
        quantity: NonZeroU32,
        size: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            original_unit_price: product.original_price,
            image: product.primary_image().unwrap_or_default().to_string(),
            quantity,
            size: size.into(),
            color: color.into(),
        }
    }

    /// Build a line from previously captured values, e.g. when hydrating from storage.
    #[expect(clippy::too_many_arguments, reason = "Mirrors the stored line fields")]
    pub(crate) fn from_parts(
        product_id: ProductId,
        name: String,
        unit_price: Price,
        original_unit_price: Option<Price>,
        image: String,
        quantity: NonZeroU32,
        size: String,
        color: String,
    ) -> Self {
        Self {
            product_id,
            name,
            unit_price,
            original_unit_price,
            image,
            quantity,
            size,
            color,
        }
    }

    /// Whether this line is identified by the given composite key.
    pub fn matches(&self, product_id: &ProductId, size: &str, color: &str) -> bool {
        self.product_id == *product_id && self.size == size && self.color == color
    }

    /// Product this line was added from.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Product name at add-time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price at add-time.
    pub fn unit_price(&self) -> &Price {
        &self.unit_price
    }

    /// Original unit price at add-time, if the product was marked down.
    pub fn original_unit_price(&self) -> Option<&Price> {
        self.original_unit_price.as_ref()
    }

    /// Primary product image at add-time.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Number of units, always at least one.
    pub fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// Selected size.
    pub fn size(&self) -> &str {
        &self.size
    }

    /// Selected color, empty when none was picked.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the total doesn't fit in minor units.
    pub fn extended_price(&self) -> Result<Price, PricingError> {
        extended_price(&self.unit_price, self.quantity.get())
    }

    pub(crate) fn quantity_nonzero(&self) -> NonZeroU32 {
        self.quantity
    }

    pub(crate) fn increase_quantity(&mut self, by: NonZeroU32) {
        self.quantity = self.quantity.saturating_add(by.get());
    }

    pub(crate) fn set_quantity(&mut self, quantity: NonZeroU32) {
        self.quantity = quantity;
    }
}

/// Turn shopper-entered quantity text into a usable quantity.
///
/// Leading digits are read the way a lenient form field would; anything that
/// isn't a positive number becomes one. Numbers too large for a quantity
/// saturate, like [`Cart::set_quantity`](crate::cart::Cart::set_quantity).
pub fn coerce_quantity(input: &str) -> NonZeroU32 {
    let trimmed = input.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();

    match digits.parse::<u32>() {
        Ok(quantity) => NonZeroU32::new(quantity).unwrap_or(NonZeroU32::MIN),
        Err(error) if *error.kind() == IntErrorKind::PosOverflow => NonZeroU32::MAX,
        Err(_) => NonZeroU32::MIN,
    }
}
