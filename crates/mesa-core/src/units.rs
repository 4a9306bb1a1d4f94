//! # Unit Conversion
//!
//! Converts quantities between compatible measurement units.
//!
//! ## Strict vs Lenient
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TWO CONVERSION PATHS (intentional asymmetry)                           │
//! │                                                                         │
//! │  WRITE PATH (recipe validation, stock deduction)                        │
//! │    convert_checked() - incompatible pair is a ValidationError.          │
//! │    A recipe that mixes grams and milliliters is a data-entry bug        │
//! │    and must be rejected before it is persisted.                         │
//! │                                                                         │
//! │  READ PATH (point-in-time cost estimates)                               │
//! │    convert() - incompatible pair returns the quantity unchanged.        │
//! │    A cost report must not fail because one legacy recipe row has a     │
//! │    mismatched unit; it degrades instead.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Unit
// =============================================================================

/// A measurement unit for stock quantities and recipe entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Milligram,
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    /// Countable unit (bottles, pieces, portions). Converts only to itself.
    Piece,
}

impl Unit {
    /// Factor to this unit's base unit (gram for mass, milliliter for volume).
    ///
    /// Piece has no base; conversions between Piece and anything else are
    /// undefined.
    fn base_factor(self) -> Option<f64> {
        match self {
            Unit::Milligram => Some(0.001),
            Unit::Gram => Some(1.0),
            Unit::Kilogram => Some(1000.0),
            Unit::Milliliter => Some(1.0),
            Unit::Liter => Some(1000.0),
            Unit::Piece => None,
        }
    }

    /// Whether two units share a dimension (mass with mass, volume with
    /// volume). Same unit is always compatible, Piece only with itself.
    pub fn is_mass(self) -> bool {
        matches!(self, Unit::Milligram | Unit::Gram | Unit::Kilogram)
    }

    pub fn is_volume(self) -> bool {
        matches!(self, Unit::Milliliter | Unit::Liter)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Piece => "pc",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Unit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mg" | "milligram" => Ok(Unit::Milligram),
            "g" | "gram" => Ok(Unit::Gram),
            "kg" | "kilogram" => Ok(Unit::Kilogram),
            "ml" | "milliliter" => Ok(Unit::Milliliter),
            "l" | "liter" | "litre" => Ok(Unit::Liter),
            "pc" | "pcs" | "piece" | "unit" => Ok(Unit::Piece),
            other => Err(ValidationError::InvalidFormat {
                field: "unit".to_string(),
                reason: format!("unknown unit '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Checks whether a quantity can be converted between two units.
///
/// ## Example
/// ```rust
/// use mesa_core::units::{can_convert, Unit};
///
/// assert!(can_convert(Unit::Gram, Unit::Kilogram));
/// assert!(can_convert(Unit::Piece, Unit::Piece));
/// assert!(!can_convert(Unit::Gram, Unit::Milliliter));
/// ```
pub fn can_convert(from: Unit, to: Unit) -> bool {
    if from == to {
        return true;
    }
    (from.is_mass() && to.is_mass()) || (from.is_volume() && to.is_volume())
}

/// Converts a quantity between units, lenient on incompatible pairs.
///
/// - Same unit: quantity unchanged
/// - Incompatible pair: quantity unchanged (read-path degradation)
/// - Zero or non-finite quantity: 0
///
/// ## Example
/// ```rust
/// use mesa_core::units::{convert, Unit};
///
/// assert_eq!(convert(2.5, Unit::Kilogram, Unit::Gram), 2500.0);
/// assert_eq!(convert(500.0, Unit::Milliliter, Unit::Liter), 0.5);
/// assert_eq!(convert(3.0, Unit::Gram, Unit::Milliliter), 3.0); // unchanged
/// ```
pub fn convert(quantity: f64, from: Unit, to: Unit) -> f64 {
    if !quantity.is_finite() || quantity == 0.0 {
        return 0.0;
    }
    if from == to || !can_convert(from, to) {
        return quantity;
    }
    // Both factors exist: can_convert rules out Piece cross-pairs
    match (from.base_factor(), to.base_factor()) {
        (Some(f), Some(t)) => quantity * f / t,
        _ => quantity,
    }
}

/// Converts a quantity between units, strict on incompatible pairs.
///
/// The write-path variant: used when validating recipes and applying stock
/// deductions, where silently skipping a conversion would corrupt balances.
pub fn convert_checked(quantity: f64, from: Unit, to: Unit) -> Result<f64, ValidationError> {
    if !quantity.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if !can_convert(from, to) {
        return Err(ValidationError::IncompatibleUnits { from, to });
    }
    Ok(convert(quantity, from, to))
}

// =============================================================================
// Unit Tests
// =============================================================================
