use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::invoice::InvoiceItem;

/// French VAT applied on top of the HT total.
pub const VAT_RATE: f64 = 0.20;

/// Quote (`D`) or invoice (`F`), the prefix of the human-facing document
/// number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocKind {
    Quote,
    Invoice,
}

impl DocKind {
    pub fn prefix(self) -> char {
        match self {
            DocKind::Quote => 'D',
            DocKind::Invoice => 'F',
        }
    }
}

/// HT and TTC totals of a document, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub amount_ht: f64,
    pub amount_ttc: f64,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute document totals from line items plus labor and travel costs.
/// Always recomputed server-side on write; client-supplied totals are
/// ignored.
pub fn compute_totals(items: &[InvoiceItem], labor_cost: f64, travel_cost: f64) -> Totals {
    let items_ht: f64 = items.iter().map(|i| i.quantity * i.unit_price).sum();
    let total_ht = items_ht + labor_cost + travel_cost;

    Totals {
        amount_ht: round_cents(total_ht),
        amount_ttc: round_cents(total_ht * (1.0 + VAT_RATE)),
    }
}

/// Human-facing document number, e.g. `D26-04` for the 4th quote of 2026.
pub fn doc_number(kind: DocKind, year: i32, sequence: i64) -> String {
    format!("{}{:02}-{:02}", kind.prefix(), year % 100, sequence)
}

/// Renumber a quote as an invoice: `D26-04` becomes `F26-04`. Numbers not
/// starting with `D` are returned unchanged.
pub fn convert_doc_number(number: &str) -> String {
    match number.strip_prefix('D') {
        Some(rest) => format!("F{rest}"),
        None => number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, unit_price: f64) -> InvoiceItem {
        InvoiceItem {
            description: "Remplacement joint".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn totals_apply_twenty_percent_vat() {
        let totals = compute_totals(&[item(2.0, 45.0)], 120.0, 35.0);
        assert_eq!(totals.amount_ht, 245.0);
        assert_eq!(totals.amount_ttc, 294.0);
    }

    #[test]
    fn totals_round_to_cents() {
        let totals = compute_totals(&[item(3.0, 19.99)], 0.0, 0.0);
        assert_eq!(totals.amount_ht, 59.97);
        // 59.97 * 1.2 = 71.964 → 71.96
        assert_eq!(totals.amount_ttc, 71.96);
    }

    #[test]
    fn empty_document_totals_zero() {
        let totals = compute_totals(&[], 0.0, 0.0);
        assert_eq!(totals.amount_ht, 0.0);
        assert_eq!(totals.amount_ttc, 0.0);
    }

    #[test]
    fn doc_numbers_carry_kind_prefix_and_year() {
        assert_eq!(doc_number(DocKind::Quote, 2026, 4), "D26-04");
        assert_eq!(doc_number(DocKind::Invoice, 2026, 12), "F26-12");
        assert_eq!(doc_number(DocKind::Quote, 2026, 123), "D26-123");
    }

    #[test]
    fn converting_a_quote_swaps_only_the_prefix() {
        assert_eq!(convert_doc_number("D26-04"), "F26-04");
        // Already an invoice: unchanged.
        assert_eq!(convert_doc_number("F26-04"), "F26-04");
    }
}
