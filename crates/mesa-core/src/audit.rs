//! # Audit Math
//!
//! Pure valuation of a physical stock count. The audit *service* (fetching
//! balances, persisting, establishing the lock boundary) lives in
//! mesa-engine.
//!
//! Losses are negative differences valued positively as loss; gains are
//! positive differences. Both are valued at the item's unit cost frozen at
//! the moment of the audit.

use crate::money::Money;
use crate::types::{AuditLine, ItemType};

/// Builds one audit line from the counted value and the balance it was
/// checked against. `unit_cost` missing values the difference at zero.
pub fn build_audit_line(
    audit_id: &str,
    item_type: ItemType,
    item_id: &str,
    previous_quantity: f64,
    counted_quantity: f64,
    unit_cost: Option<f64>,
) -> AuditLine {
    let difference = counted_quantity - previous_quantity;
    let value = Money::from_f64(difference * unit_cost.unwrap_or(0.0));
    AuditLine {
        audit_id: audit_id.to_string(),
        item_type,
        item_id: item_id.to_string(),
        previous_quantity,
        counted_quantity,
        difference,
        unit_cost_snapshot: unit_cost,
        value_cents: value.cents(),
    }
}

/// Sums audit lines into (total loss, total gain), both non-negative.
pub fn summarize(lines: &[AuditLine]) -> (Money, Money) {
    let mut loss = Money::zero();
    let mut gain = Money::zero();
    for line in lines {
        let value = Money::from_cents(line.value_cents);
        if value.is_negative() {
            loss += value.abs();
        } else {
            gain += value;
        }
    }
    (loss, gain)
}
