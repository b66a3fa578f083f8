//! Receipt
//!
//! Renders a cart or a placed order as a table followed by its totals.

use std::io;

use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::{Cart, CartLine, CartStore},
    checkout::Order,
    pricing::{OrderTotals, Price, PricingError},
};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Totals could not be calculated.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("failed to write receipt: {0}")]
    Io(#[from] io::Error),
}

/// Write the cart's lines and totals.
///
/// Below the free shipping threshold the amount still to spend is shown too.
///
/// # Errors
///
/// Returns a [`ReceiptError`] if totals can't be calculated or writing fails.
pub fn write_cart<S: CartStore>(
    mut out: impl io::Write,
    cart: &Cart<S>,
) -> Result<(), ReceiptError> {
    if cart.is_empty() {
        writeln!(out, "\nYour cart is empty.\n")?;
        return Ok(());
    }

    write_lines_table(&mut out, cart.lines())?;

    let totals = cart.totals()?;
    let remaining = cart.amount_to_free_shipping()?;

    write_totals(&mut out, &totals)?;

    if !totals.has_free_shipping() {
        writeln!(out, " Spend {remaining} more for free shipping!")?;
    }

    writeln!(out)?;

    Ok(())
}

/// Write an order confirmation: id, customer, lines and totals.
///
/// # Errors
///
/// Returns a [`ReceiptError`] if writing fails.
pub fn write_order(mut out: impl io::Write, order: &Order) -> Result<(), ReceiptError> {
    let customer = order.customer();

    writeln!(out, "\n{BOLD}Order {}{RESET}", order.id())?;
    writeln!(out, " Placed:  {}", order.placed_at())?;
    writeln!(out, " Ship to: {}, {}", customer.name, customer.phone)?;
    writeln!(out, "          {}, {}", customer.address, customer.city)?;

    if !customer.zip.is_empty() || !customer.country.is_empty() {
        writeln!(out, "          {} {}", customer.zip, customer.country)?;
    }

    if !order.notes().is_empty() {
        writeln!(out, " Notes:   {}", order.notes())?;
    }

    write_lines_table(&mut out, order.lines())?;
    write_totals(&mut out, order.totals())?;

    writeln!(out)?;

    Ok(())
}

fn write_lines_table(out: &mut impl io::Write, lines: &[CartLine]) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["", "Item", "Options", "Unit Price", "Qty", "Line Total"]);

    for (idx, line) in lines.iter().enumerate() {
        builder.push_record([
            format!("#{:<3}", idx + 1),
            line.name().to_string(),
            line_options(line),
            unit_price_display(line),
            line.quantity().to_string(),
            line.extended_price()?.to_string(),
        ]);
    }

    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..6), Alignment::right());

    writeln!(out, "\n{}", dim_borders(&table.to_string()))?;

    Ok(())
}

fn line_options(line: &CartLine) -> String {
    if line.color().is_empty() {
        line.size().to_string()
    } else {
        format!("{} / {}", line.size(), line.color())
    }
}

fn unit_price_display(line: &CartLine) -> String {
    match line.original_unit_price() {
        Some(original) => format!("{} (was {original})", line.unit_price()),
        None => line.unit_price().to_string(),
    }
}

fn write_totals(out: &mut impl io::Write, totals: &OrderTotals) -> Result<(), ReceiptError> {
    let shipping = if totals.has_free_shipping() {
        "FREE  ".to_string()
    } else {
        money_cell(totals.shipping())
    };

    let rows = [
        (" Subtotal:".to_string(), money_cell(totals.subtotal())),
        (" Shipping:".to_string(), shipping),
        (" Tax:".to_string(), money_cell(totals.tax())),
        (
            format!(" {BOLD}Total:{RESET}"),
            format!("{BOLD}{}{RESET}", money_cell(totals.grand_total())),
        ),
    ];

    let label_width = rows
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or_default();

    let value_width = rows
        .iter()
        .map(|(_, value)| display_width(value))
        .max()
        .unwrap_or_default();

    for (label, value) in &rows {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    Ok(())
}

fn money_cell(price: Price) -> String {
    format!("{price}  ")
}

fn is_box_drawing(ch: char) -> bool {
    matches!(ch, '\u{2500}'..='\u{257F}')
}

/// Dims the table borders so the line items stand out.
fn dim_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut dimmed = false;

    for ch in table.chars() {
        let border = is_box_drawing(ch);

        if border != dimmed {
            out.push_str(if border { DIM } else { RESET });
            dimmed = border;
        }

        out.push(ch);
    }

    if dimmed {
        out.push_str(RESET);
    }

    out
}

/// Number of characters a terminal shows, escape sequences excluded.
fn display_width(s: &str) -> usize {
    let mut chars = s.chars();
    let mut width = 0usize;

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // CSI sequences end at their first letter
            _ = chars.by_ref().find(char::is_ascii_alphabetic);
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(display_width(label));
    let value_pad = value_col_width.saturating_sub(display_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )?;

    Ok(())
}
