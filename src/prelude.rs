//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        Cart, CartError, CartLine, CartState, CartStore, FileCartStore, MemoryCartStore,
        StoreError, coerce_quantity,
    },
    catalog::{Catalog, CatalogDefaults, CatalogError},
    checkout::{
        Checkout, CheckoutError, ClearPolicy, CustomerError, CustomerInfo, DispatchError,
        DispatchReceipt, Order, OrderDispatcher, OrderId, OrderJournal,
    },
    config::{ConfigError, StorefrontConfig},
    pricing::{OrderTotals, Price, PricingError, PricingPolicy},
    products::{Color, DEFAULT_SIZE, Product, ProductId},
    receipt::{ReceiptError, write_cart, write_order},
};
