//! Storefront
//!
//! Storefront is the cart ledger of an online shop: a product catalog, a cart that
//! merges and prices lines, persistence for the cart, and order checkout.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod logging;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod utils;
