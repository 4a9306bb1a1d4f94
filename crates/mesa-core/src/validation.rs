//! # Validation Module
//!
//! Boundary validation for the engine's write paths.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: DTO deserialization (serde types)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - range/finiteness/business rules,                │
//! │           run BEFORE any mutation so malformed input can never          │
//! │           cause a partial write                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database constraints (NOT NULL, UNIQUE, FK)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Discount, DiscountKind, DiscountScope};
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (warehouse, ingredient, product, discount).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must be at most 200 characters".to_string(),
        });
    }
    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects non-finite quantities. All f64 quantity parsing goes through
/// here before any mutation is attempted.
pub fn validate_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(())
}

/// A stock movement quantity: finite and strictly positive (direction is
/// carried by the receipt kind, not the sign).
pub fn validate_stock_quantity(qty: f64) -> ValidationResult<()> {
    validate_finite("quantity", qty)?;
    if qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// A counted quantity (recount lines, audit counts): finite and ≥ 0.
/// Negative counts are a validation error, not a logic error.
pub fn validate_counted_quantity(qty: f64) -> ValidationResult<()> {
    validate_finite("counted_quantity", qty)?;
    if qty < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "counted_quantity".to_string(),
        });
    }
    Ok(())
}

/// A unit cost rate: finite and ≥ 0 when present.
pub fn validate_unit_cost(cost: Option<f64>) -> ValidationResult<()> {
    if let Some(cost) = cost {
        validate_finite("unit_cost", cost)?;
        if cost < 0.0 {
            return Err(ValidationError::MustBeNonNegative {
                field: "unit_cost".to_string(),
            });
        }
    }
    Ok(())
}

/// An order line quantity: 0 ≤ qty ≤ MAX_LINE_QUANTITY.
/// Zero is legal (the line is dropped), negatives are not.
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Number of distinct lines on an order.
pub fn validate_order_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_ORDER_ITEMS as i64,
        });
    }
    Ok(())
}

/// A payment amount in cents: strictly positive.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// A manual discount in cents: ≥ 0.
pub fn validate_manual_discount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "manual_discount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Discount Validators
// =============================================================================

/// Validates a discount definition before it is persisted.
///
/// ## Rules
/// - Percentage value in 0-100 (a 150% discount is rejected here)
/// - Fixed value finite and ≥ 0
/// - Days of week in 0-6
/// - Auto-apply is a category-scope feature only
/// - Window start/end come in pairs
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    validate_name(&discount.name)?;
    validate_finite("value", discount.value)?;

    match discount.kind {
        DiscountKind::Percentage => {
            if !(0.0..=100.0).contains(&discount.value) {
                return Err(ValidationError::OutOfRange {
                    field: "value".to_string(),
                    min: 0,
                    max: 100,
                });
            }
        }
        DiscountKind::Fixed => {
            if discount.value < 0.0 {
                return Err(ValidationError::MustBeNonNegative {
                    field: "value".to_string(),
                });
            }
        }
    }

    if discount.auto_apply && discount.scope != DiscountScope::Category {
        return Err(ValidationError::NotAllowed {
            field: "auto_apply".to_string(),
            allowed: vec!["category scope".to_string()],
        });
    }

    if let Some(day) = discount.auto_apply_days.iter().find(|d| **d > 6) {
        return Err(ValidationError::OutOfRange {
            field: format!("auto_apply_days[{}]", day),
            min: 0,
            max: 6,
        });
    }

    if discount.auto_apply_start.is_some() != discount.auto_apply_end.is_some() {
        return Err(ValidationError::Required {
            field: "auto_apply_start/auto_apply_end".to_string(),
        });
    }

    if discount.scope == DiscountScope::Product && discount.product_id.is_none() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
