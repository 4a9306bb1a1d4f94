//! # Discount Engine
//!
//! Resolves discounts against an order's lines and computes totals.
//!
//! ## Resolution Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_order_totals(lines, discounts, selected, manual, now)        │
//! │                                                                         │
//! │  1. subtotal = Σ line totals                                            │
//! │  2. per discount: matching base                                         │
//! │       order scope    → subtotal                                         │
//! │       category scope → Σ lines in targeted categories                   │
//! │       product scope  → Σ lines of the targeted product                  │
//! │  3. auto-apply (category scope only): weekday ∈ days AND                │
//! │       time ∈ [start, end) → applied without selection                   │
//! │  4. explicitly selected ids applied in addition (if active + matching)  │
//! │  5. percentage = value% of base; fixed = min(value, base)               │
//! │  6. Σ amounts + manual discount, clamped to subtotal                    │
//! │  7. total = subtotal − discount, floored at 0                           │
//! │                                                                         │
//! │  Discounts stack by accumulation; there is no exclusivity rule.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time is an input (`now`), never read from a clock here.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{AppliedDiscount, Discount, DiscountKind, DiscountScope, OrderItem};

// =============================================================================
// Order Totals
// =============================================================================

/// The result of discount resolution over an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    /// Resolved discounts with the amount each contributed.
    pub applied: Vec<AppliedDiscount>,
    /// Ad-hoc order-wide reduction entered by the cashier.
    pub manual_discount: Money,
    /// Sum of applied discounts plus the manual discount, ≤ subtotal.
    pub total_discount: Money,
    /// subtotal − total_discount, floored at 0.
    pub total: Money,
}

/// Computes order totals under the discount policy.
///
/// `selected_ids` are cashier-chosen discounts; auto-apply category
/// discounts inside their day/time window are applied without selection.
/// A discount that is both auto-matched and selected applies once.
pub fn calculate_order_totals(
    lines: &[OrderItem],
    discounts: &[Discount],
    selected_ids: &[String],
    manual_discount: Money,
    now: DateTime<Utc>,
) -> OrderTotals {
    let subtotal: Money = lines.iter().map(|l| l.line_total()).sum();

    let mut applied = Vec::new();
    let mut accumulated = Money::zero();

    for discount in discounts {
        if !discount.is_active {
            continue;
        }

        let base = matching_base(discount, lines, subtotal);
        if !base.is_positive() {
            continue;
        }

        let auto = auto_applies(discount, now);
        let selected = selected_ids.iter().any(|id| id == &discount.id);
        if !auto && !selected {
            continue;
        }

        let amount = discount_amount(discount, base);
        if !amount.is_positive() {
            continue;
        }

        accumulated += amount;
        applied.push(AppliedDiscount {
            discount_id: discount.id.clone(),
            name: discount.name.clone(),
            amount,
            auto_applied: auto && !selected,
        });
    }

    let manual = manual_discount.floor_zero();
    let total_discount = (accumulated + manual).min(subtotal).floor_zero();
    let total = (subtotal - total_discount).floor_zero();

    OrderTotals {
        subtotal,
        applied,
        manual_discount: manual,
        total_discount,
        total,
    }
}

/// The portion of the order a discount's scope matches.
fn matching_base(discount: &Discount, lines: &[OrderItem], subtotal: Money) -> Money {
    match discount.scope {
        DiscountScope::Order => subtotal,
        DiscountScope::Category => lines
            .iter()
            .filter(|l| {
                l.category_id
                    .as_ref()
                    .is_some_and(|c| discount.category_ids.iter().any(|t| t == c))
            })
            .map(|l| l.line_total())
            .sum(),
        DiscountScope::Product => lines
            .iter()
            .filter(|l| discount.product_id.as_deref() == Some(l.product_id.as_str()))
            .map(|l| l.line_total())
            .sum(),
    }
}

/// The amount a discount takes off its matching base.
///
/// Fixed amounts cap at the base so a single discount can never push a line
/// negative; percentages are capped at 100% upstream by validation.
fn discount_amount(discount: &Discount, base: Money) -> Money {
    match discount.kind {
        DiscountKind::Percentage => {
            let bps = ((discount.value * 100.0).round() as i64).clamp(0, 10_000) as u32;
            base.percentage(bps)
        }
        DiscountKind::Fixed => Money::from_f64(discount.value).min(base).floor_zero(),
    }
}

/// Whether a discount's auto-apply window covers `now`.
///
/// Category scope only. Days use 0 = Sunday .. 6 = Saturday; the time
/// window is half-open [start, end) and wraps past midnight when
/// start > end (late-night happy hours).
pub fn auto_applies(discount: &Discount, now: DateTime<Utc>) -> bool {
    if !discount.auto_apply || discount.scope != DiscountScope::Category {
        return false;
    }

    let weekday = now.weekday().num_days_from_sunday() as u8;
    if !discount.auto_apply_days.contains(&weekday) {
        return false;
    }

    match (discount.auto_apply_start, discount.auto_apply_end) {
        (Some(start), Some(end)) => {
            let minute = (now.hour() * 60 + now.minute()) as u16;
            if start <= end {
                minute >= start.minutes() && minute < end.minutes()
            } else {
                minute >= start.minutes() || minute < end.minutes()
            }
        }
        // No window configured: the day match alone activates it
        (None, None) => true,
        _ => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeOfDay;
    use chrono::TimeZone;

    fn line(product_id: &str, category_id: Option<&str>, unit_price_cents: i64, qty: i64) -> OrderItem {
        OrderItem {
            id: format!("li-{}", product_id),
            order_id: "o-1".to_string(),
            product_id: product_id.to_string(),
            name_snapshot: product_id.to_string(),
            category_id: category_id.map(str::to_string),
            quantity: qty,
            unit_price_cents,
            modifiers: None,
            line_total_cents: unit_price_cents * qty,
        }
    }

    fn category_discount(id: &str, value: f64, categories: &[&str]) -> Discount {
        Discount {
            id: id.to_string(),
            name: format!("disc {}", id),
            scope: DiscountScope::Category,
            kind: DiscountKind::Percentage,
            value,
            category_ids: categories.iter().map(|s| s.to_string()).collect(),
            product_id: None,
            auto_apply: false,
            auto_apply_days: vec![],
            auto_apply_start: None,
            auto_apply_end: None,
            is_active: true,
        }
    }

    // 2026-08-26 is a Wednesday (weekday 3), 12:00 UTC
    fn noon_wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_subtotal_no_discounts() {
        let lines = [line("p1", None, 500, 2)];
        let totals = calculate_order_totals(&lines, &[], &[], Money::zero(), noon_wednesday());
        assert_eq!(totals.subtotal.cents(), 1000);
        assert_eq!(totals.total.cents(), 1000);
        assert!(totals.applied.is_empty());
    }

    #[test]
    fn test_selected_category_discount() {
        // 2 × $5.00 with a 10%-off category discount → subtotal 10.00,
        // discount 1.00, total 9.00
        let lines = [line("p1", Some("drinks"), 500, 2)];
        let discounts = [category_discount("d1", 10.0, &["drinks"])];
        let totals = calculate_order_totals(
            &lines,
            &discounts,
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert_eq!(totals.subtotal.cents(), 1000);
        assert_eq!(totals.total_discount.cents(), 100);
        assert_eq!(totals.total.cents(), 900);
        assert_eq!(totals.applied.len(), 1);
        assert!(!totals.applied[0].auto_applied);
    }

    #[test]
    fn test_category_scope_requires_matching_line() {
        let lines = [line("p1", Some("mains"), 500, 2)];
        let discounts = [category_discount("d1", 10.0, &["drinks"])];
        let totals = calculate_order_totals(
            &lines,
            &discounts,
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert!(totals.applied.is_empty());
        assert_eq!(totals.total.cents(), 1000);
    }

    #[test]
    fn test_auto_apply_inside_window() {
        let mut d = category_discount("d1", 10.0, &["drinks"]);
        d.auto_apply = true;
        d.auto_apply_days = vec![3]; // Wednesday
        d.auto_apply_start = Some(TimeOfDay::new(11, 0).unwrap());
        d.auto_apply_end = Some(TimeOfDay::new(14, 0).unwrap());

        let lines = [line("p1", Some("drinks"), 500, 2)];
        let totals =
            calculate_order_totals(&lines, &[d.clone()], &[], Money::zero(), noon_wednesday());
        assert_eq!(totals.total.cents(), 900);
        assert!(totals.applied[0].auto_applied);

        // Outside the window (day mismatch)
        d.auto_apply_days = vec![0];
        let totals = calculate_order_totals(&lines, &[d], &[], Money::zero(), noon_wednesday());
        assert!(totals.applied.is_empty());
    }

    #[test]
    fn test_auto_apply_window_end_exclusive() {
        let mut d = category_discount("d1", 10.0, &["drinks"]);
        d.auto_apply = true;
        d.auto_apply_days = vec![3];
        d.auto_apply_start = Some(TimeOfDay::new(9, 0).unwrap());
        d.auto_apply_end = Some(TimeOfDay::new(12, 0).unwrap());

        let lines = [line("p1", Some("drinks"), 500, 2)];
        // 12:00 is exactly the end: [start, end) excludes it
        let totals = calculate_order_totals(&lines, &[d], &[], Money::zero(), noon_wednesday());
        assert!(totals.applied.is_empty());
    }

    #[test]
    fn test_auto_apply_overnight_window() {
        let mut d = category_discount("d1", 10.0, &["drinks"]);
        d.auto_apply = true;
        d.auto_apply_days = vec![3];
        d.auto_apply_start = Some(TimeOfDay::new(22, 0).unwrap());
        d.auto_apply_end = Some(TimeOfDay::new(2, 0).unwrap());

        let lines = [line("p1", Some("drinks"), 500, 2)];
        let just_past_midnight = Utc.with_ymd_and_hms(2026, 8, 26, 1, 0, 0).unwrap();
        let totals =
            calculate_order_totals(&lines, &[d], &[], Money::zero(), just_past_midnight);
        assert_eq!(totals.applied.len(), 1);
    }

    #[test]
    fn test_selected_and_auto_applies_once() {
        let mut d = category_discount("d1", 10.0, &["drinks"]);
        d.auto_apply = true;
        d.auto_apply_days = vec![3];

        let lines = [line("p1", Some("drinks"), 500, 2)];
        let totals = calculate_order_totals(
            &lines,
            &[d],
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert_eq!(totals.applied.len(), 1);
        assert_eq!(totals.total_discount.cents(), 100);
    }

    #[test]
    fn test_fixed_discount_caps_at_base() {
        let lines = [line("p1", Some("drinks"), 300, 1)];
        let mut d = category_discount("d1", 0.0, &["drinks"]);
        d.kind = DiscountKind::Fixed;
        d.value = 10.0; // $10 off a $3 line

        let totals = calculate_order_totals(
            &lines,
            &[d],
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert_eq!(totals.total_discount.cents(), 300);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_manual_discount_clamped_to_subtotal() {
        let lines = [line("p1", None, 500, 1)];
        let totals = calculate_order_totals(
            &lines,
            &[],
            &[],
            Money::from_cents(10_000),
            noon_wednesday(),
        );
        assert_eq!(totals.total_discount.cents(), 500);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_stacked_discounts_accumulate_and_clamp() {
        let lines = [line("p1", Some("drinks"), 1000, 1)];
        let d1 = category_discount("d1", 60.0, &["drinks"]);
        let d2 = category_discount("d2", 60.0, &["drinks"]);
        let totals = calculate_order_totals(
            &lines,
            &[d1, d2],
            &["d1".to_string(), "d2".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        // 60% + 60% would exceed the subtotal: clamp holds
        assert_eq!(totals.total_discount.cents(), 1000);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_inactive_discount_ignored() {
        let lines = [line("p1", Some("drinks"), 500, 2)];
        let mut d = category_discount("d1", 10.0, &["drinks"]);
        d.is_active = false;
        let totals = calculate_order_totals(
            &lines,
            &[d],
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert!(totals.applied.is_empty());
    }

    #[test]
    fn test_product_scope() {
        let lines = [
            line("p1", None, 500, 2),
            line("p2", None, 700, 1),
        ];
        let d = Discount {
            id: "d1".to_string(),
            name: "p2 promo".to_string(),
            scope: DiscountScope::Product,
            kind: DiscountKind::Percentage,
            value: 50.0,
            category_ids: vec![],
            product_id: Some("p2".to_string()),
            auto_apply: false,
            auto_apply_days: vec![],
            auto_apply_start: None,
            auto_apply_end: None,
            is_active: true,
        };
        let totals = calculate_order_totals(
            &lines,
            &[d],
            &["d1".to_string()],
            Money::zero(),
            noon_wednesday(),
        );
        assert_eq!(totals.total_discount.cents(), 350);
        assert_eq!(totals.total.cents(), 1350);
    }
}
