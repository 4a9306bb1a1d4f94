//! # Costing Math
//!
//! Pure weighted-average costing and recipe roll-up. The costing *service*
//! (persistence, cascade fan-out) lives in mesa-engine; this module is the
//! arithmetic it runs on.
//!
//! ## Weighted-Average Costing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lots: (qty=10, cost=2.00), (qty=5, cost=5.00)                          │
//! │                                                                         │
//! │  average = (10×2.00 + 5×5.00) / (10 + 5) = 45.00 / 15 = 3.00            │
//! │                                                                         │
//! │  Only positive-quantity lots participate. No positive lot → None        │
//! │  (never divide by zero; the caller keeps the previous cost).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::{round_rate, Money};
use crate::units::{convert, Unit};

// =============================================================================
// Lots
// =============================================================================

/// A stock lot participating in weighted-average costing: one inventory
/// balance with its last known unit cost.
#[derive(Debug, Clone, Copy)]
pub struct Lot {
    pub quantity: f64,
    pub unit_cost: f64,
}

/// Quantity-weighted mean unit cost over all positive-quantity lots.
///
/// Returns `None` when no positive-quantity lot exists; costing degrades
/// rather than failing the calling write.
///
/// ## Example
/// ```rust
/// use mesa_core::costing::{weighted_average_cost, Lot};
///
/// let lots = [
///     Lot { quantity: 10.0, unit_cost: 2.0 },
///     Lot { quantity: 5.0, unit_cost: 5.0 },
/// ];
/// assert_eq!(weighted_average_cost(&lots), Some(3.0));
/// ```
pub fn weighted_average_cost(lots: &[Lot]) -> Option<f64> {
    let mut total_qty = 0.0;
    let mut total_value = 0.0;
    for lot in lots {
        if lot.quantity > 0.0 && lot.quantity.is_finite() && lot.unit_cost.is_finite() {
            total_qty += lot.quantity;
            total_value += lot.quantity * lot.unit_cost;
        }
    }
    if total_qty <= 0.0 {
        return None;
    }
    Some(round_rate(total_value / total_qty))
}

// =============================================================================
// Moving Average (receipt apply / reverse)
// =============================================================================

/// Folds an incoming lot into an existing balance's unit cost.
///
/// A non-positive or uncosted existing balance takes the incoming cost
/// outright: there is nothing on hand to average against.
pub fn fold_lot(
    current_qty: f64,
    current_cost: Option<f64>,
    incoming_qty: f64,
    incoming_cost: f64,
) -> f64 {
    match current_cost {
        Some(cost) if current_qty > 0.0 && incoming_qty > 0.0 => round_rate(
            (current_qty * cost + incoming_qty * incoming_cost) / (current_qty + incoming_qty),
        ),
        _ => round_rate(incoming_cost),
    }
}

/// Inverts `fold_lot`: recovers the unit cost a balance had before an
/// incoming lot was folded in. Used when reversing an applied receipt.
///
/// Returns `None` when the prior cost cannot be recovered (the lot emptied
/// the history, or intervening movements made the inversion degenerate);
/// the caller then leaves the current cost in place.
pub fn unfold_lot(
    qty_after: f64,
    cost_after: f64,
    incoming_qty: f64,
    incoming_cost: f64,
) -> Option<f64> {
    let prior_qty = qty_after - incoming_qty;
    if prior_qty <= f64::EPSILON {
        return None;
    }
    let prior_cost = (qty_after * cost_after - incoming_qty * incoming_cost) / prior_qty;
    if !prior_cost.is_finite() || prior_cost < 0.0 {
        return None;
    }
    Some(round_rate(prior_cost))
}

// =============================================================================
// Recipe Roll-Up
// =============================================================================

/// One recipe entry with its ingredient's canonical unit and current cost,
/// resolved by the caller.
#[derive(Debug, Clone)]
pub struct RecipeCostEntry {
    /// Quantity consumed, in the recipe's unit.
    pub quantity: f64,
    /// The unit the recipe entry is written in.
    pub unit: Unit,
    /// The ingredient's canonical stock-keeping unit.
    pub ingredient_unit: Unit,
    /// The ingredient's current cost per canonical unit, if known.
    pub ingredient_cost: Option<f64>,
}

/// Rolls recipe entries up into a product cost.
///
/// Missing ingredient cost contributes 0 for that entry (not an error);
/// unit conversion is the lenient read-path variant. The sum becomes an
/// amount (cents) here, at the rate→amount boundary.
///
/// ## Example
/// ```rust
/// use mesa_core::costing::{recipe_cost, RecipeCostEntry};
/// use mesa_core::units::Unit;
///
/// // 50 g of sugar at $0.01/g → $0.50
/// let entries = [RecipeCostEntry {
///     quantity: 50.0,
///     unit: Unit::Gram,
///     ingredient_unit: Unit::Gram,
///     ingredient_cost: Some(0.01),
/// }];
/// assert_eq!(recipe_cost(&entries).cents(), 50);
/// ```
pub fn recipe_cost(entries: &[RecipeCostEntry]) -> Money {
    let total: f64 = entries
        .iter()
        .map(|e| {
            let cost = e.ingredient_cost.unwrap_or(0.0);
            cost * convert(e.quantity, e.unit, e.ingredient_unit)
        })
        .sum();
    Money::from_f64(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_spec_example() {
        let lots = [
            Lot { quantity: 10.0, unit_cost: 2.0 },
            Lot { quantity: 5.0, unit_cost: 5.0 },
        ];
        assert_eq!(weighted_average_cost(&lots), Some(3.0));
    }

    #[test]
    fn test_weighted_average_skips_non_positive_lots() {
        let lots = [
            Lot { quantity: -4.0, unit_cost: 9.0 },
            Lot { quantity: 0.0, unit_cost: 9.0 },
            Lot { quantity: 2.0, unit_cost: 3.0 },
        ];
        assert_eq!(weighted_average_cost(&lots), Some(3.0));
    }

    #[test]
    fn test_weighted_average_no_positive_lots() {
        assert_eq!(weighted_average_cost(&[]), None);
        let lots = [Lot { quantity: -1.0, unit_cost: 2.0 }];
        assert_eq!(weighted_average_cost(&lots), None);
    }

    #[test]
    fn test_fold_lot_averages() {
        // 10 on hand at 2.00, 5 incoming at 5.00 → 3.00
        assert_eq!(fold_lot(10.0, Some(2.0), 5.0, 5.0), 3.0);
    }

    #[test]
    fn test_fold_lot_takes_incoming_cost_when_empty() {
        assert_eq!(fold_lot(0.0, None, 5.0, 4.0), 4.0);
        assert_eq!(fold_lot(-3.0, Some(2.0), 5.0, 4.0), 4.0);
    }

    #[test]
    fn test_unfold_inverts_fold() {
        let folded = fold_lot(10.0, Some(2.0), 5.0, 5.0);
        let recovered = unfold_lot(15.0, folded, 5.0, 5.0).unwrap();
        assert!((recovered - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_unfold_degenerate_cases() {
        // Lot emptied the history: nothing to recover
        assert_eq!(unfold_lot(5.0, 4.0, 5.0, 4.0), None);
        // Inversion would go negative
        assert_eq!(unfold_lot(6.0, 1.0, 5.0, 4.0), None);
    }

    #[test]
    fn test_recipe_cost_spec_example() {
        let entries = [RecipeCostEntry {
            quantity: 50.0,
            unit: Unit::Gram,
            ingredient_unit: Unit::Gram,
            ingredient_cost: Some(0.01),
        }];
        assert_eq!(recipe_cost(&entries).cents(), 50);
    }

    #[test]
    fn test_recipe_cost_converts_units() {
        // 0.5 kg at $0.002/g → $1.00
        let entries = [RecipeCostEntry {
            quantity: 0.5,
            unit: Unit::Kilogram,
            ingredient_unit: Unit::Gram,
            ingredient_cost: Some(0.002),
        }];
        assert_eq!(recipe_cost(&entries).cents(), 100);
    }

    #[test]
    fn test_recipe_cost_missing_cost_is_zero() {
        let entries = [
            RecipeCostEntry {
                quantity: 50.0,
                unit: Unit::Gram,
                ingredient_unit: Unit::Gram,
                ingredient_cost: None,
            },
            RecipeCostEntry {
                quantity: 10.0,
                unit: Unit::Gram,
                ingredient_unit: Unit::Gram,
                ingredient_cost: Some(0.05),
            },
        ];
        assert_eq!(recipe_cost(&entries).cents(), 50);
    }
}
