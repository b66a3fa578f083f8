//! Integration tests for placing orders from a persisted cart.

use std::{cell::Cell, fs, num::NonZeroU32};

use rusty_money::{Money, iso::USD};
use serde_json::Value;
use tempfile::tempdir;
use testresult::TestResult;

use storefront::{
    cart::{Cart, FileCartStore},
    checkout::{
        Checkout, CheckoutError, ClearPolicy, CustomerInfo, DispatchError, DispatchReceipt, Order,
        OrderDispatcher, OrderJournal,
    },
    pricing::PricingPolicy,
    products::Product,
    receipt::write_order,
};

/// Rejects the first `failures` orders, then acknowledges.
#[derive(Debug, Default)]
struct FlakyDispatcher {
    failures: Cell<u32>,
    attempts: Cell<u32>,
}

impl OrderDispatcher for FlakyDispatcher {
    fn dispatch(&self, order: &Order) -> Result<DispatchReceipt, DispatchError> {
        self.attempts.set(self.attempts.get() + 1);

        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);

            return Err(DispatchError::Rejected("service unavailable".to_string()));
        }

        Ok(DispatchReceipt {
            reference: format!("ack-{}", order.id()),
        })
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ada Okafor".to_string(),
        phone: "+2348012345678".to_string(),
        address: "12 Marina Road".to_string(),
        city: "Lagos".to_string(),
        email: "ada@example.org".to_string(),
        ..CustomerInfo::default()
    }
}

fn filled_cart(path: &std::path::Path) -> Result<Cart<FileCartStore>, storefront::cart::CartError> {
    let mut cart = Cart::hydrate(FileCartStore::new(path), PricingPolicy::standard(USD));

    cart.add_line(
        &Product::new(1_i64, "Hoodie", Money::from_minor(1000, USD)),
        NonZeroU32::new(2).unwrap_or(NonZeroU32::MIN),
        "M",
        "",
    )?;
    cart.add_line(
        &Product::new(2_i64, "Sticker", Money::from_minor(500, USD)),
        NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
        "One Size",
        "",
    )?;

    Ok(cart)
}

#[test]
fn failed_delivery_can_be_retried() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("storage.json");
    let mut cart = filled_cart(&path)?;

    let dispatcher = FlakyDispatcher {
        failures: Cell::new(1),
        ..FlakyDispatcher::default()
    };
    let checkout = Checkout::new(dispatcher, ClearPolicy::OnAcknowledgement);

    let first = checkout.place_order(&mut cart, &customer(), "");
    assert!(
        matches!(first, Err(CheckoutError::Dispatch { .. })),
        "expected dispatch error, got {first:?}"
    );

    let persisted = Cart::hydrate(FileCartStore::new(&path), PricingPolicy::standard(USD));
    assert_eq!(persisted.total_quantity(), 5, "cart should survive a failed delivery");

    let (order, receipt) = checkout.place_order(&mut cart, &customer(), "")?;

    assert_eq!(receipt.reference, format!("ack-{}", order.id()));
    assert_eq!(order.totals().grand_total(), Money::from_minor(4379, USD));
    assert_eq!(checkout.dispatcher().attempts.get(), 2);
    assert!(cart.is_empty());

    let persisted = Cart::hydrate(FileCartStore::new(&path), PricingPolicy::standard(USD));
    assert!(persisted.is_empty(), "cleared cart should be persisted");

    Ok(())
}

#[test]
fn always_policy_clears_after_failed_delivery() -> TestResult {
    let dir = tempdir()?;
    let mut cart = filled_cart(&dir.path().join("storage.json"))?;

    let dispatcher = FlakyDispatcher {
        failures: Cell::new(1),
        ..FlakyDispatcher::default()
    };
    let checkout = Checkout::new(dispatcher, ClearPolicy::Always);

    let result = checkout.place_order(&mut cart, &customer(), "");

    assert!(result.is_err(), "expected dispatch error");
    assert!(cart.is_empty());

    let retry = checkout.place_order(&mut cart, &customer(), "");
    assert!(matches!(retry, Err(CheckoutError::EmptyCart)));
    assert_eq!(checkout.dispatcher().attempts.get(), 1);

    Ok(())
}

#[test]
fn journal_records_order_snapshot() -> TestResult {
    let dir = tempdir()?;
    let journal_path = dir.path().join("orders.jsonl");
    let mut cart = filled_cart(&dir.path().join("storage.json"))?;

    let checkout = Checkout::new(OrderJournal::new(&journal_path), ClearPolicy::default());
    let (order, receipt) = checkout.place_order(&mut cart, &customer(), "ring the bell")?;

    assert_eq!(receipt.reference, order.id().to_string());

    let contents = fs::read_to_string(&journal_path)?;
    let record: Value = serde_json::from_str(contents.trim_end())?;

    assert_eq!(record["id"], order.id().as_str());
    assert_eq!(record["currency"], "USD");
    assert_eq!(record["total"], 4379);
    assert_eq!(record["itemCount"], 5);
    assert_eq!(record["itemSummary"], "Hoodie (M, Qty: 2)\nSticker (One Size, Qty: 3)");
    assert_eq!(record["customer"]["city"], "Lagos");
    assert_eq!(record["notes"], "ring the bell");
    assert_eq!(record["items"][0]["quantity"], 2);

    let mut out = Vec::new();
    write_order(&mut out, &order)?;

    let output = String::from_utf8(out)?;
    assert!(output.contains(order.id().as_str()));
    assert!(output.contains("Ada Okafor"));
    assert!(output.contains("ring the bell"));
    assert!(output.contains("Total:"));

    Ok(())
}
