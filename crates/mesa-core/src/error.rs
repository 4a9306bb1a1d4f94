//! # Error Types
//!
//! Domain-specific error types for mesa-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mesa-core errors (this file)                                           │
//! │  ├── ValidationError  - malformed/out-of-range input → client error     │
//! │  ├── StateConflict    - wrong lifecycle state, locked ledger entries    │
//! │  └── CoreError        - umbrella: validation, not-found, conflict       │
//! │                                                                         │
//! │  mesa-db errors (separate crate)                                        │
//! │  └── DbError          - database operation failures                     │
//! │                                                                         │
//! │  mesa-engine errors (separate crate)                                    │
//! │  └── EngineError      - Core + Db, what callers of services see         │
//! │                                                                         │
//! │  Dependency failures (loyalty accrual, non-critical side effects)       │
//! │  are logged and swallowed at the engine layer; they never become a      │
//! │  surfaced error and never unwind a committed transition.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, states, units)
//! 3. Errors are enum variants, never String
//! 4. "Already in that state" is distinct from "illegal transition"

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::units::Unit;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements and are surfaced
/// as client errors, never retried automatically. Validation runs before any
/// mutation is attempted, so malformed input cannot cause partial writes.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (non-finite number, bad UUID, bad time-of-day).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Units of different dimensions cannot be converted on the write path.
    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: Unit, to: Unit },
}

// =============================================================================
// State Conflict
// =============================================================================

/// Lifecycle conflicts: the entity exists but is in the wrong state for the
/// requested operation.
#[derive(Debug, Error)]
pub enum StateConflict {
    /// The entity is already in the requested state (idempotent repeat).
    #[error("{entity} {id} is already {status}")]
    AlreadyInState {
        entity: String,
        id: String,
        status: String,
    },

    /// The requested transition does not exist in the state machine.
    #[error("{entity} {id} is {current}, cannot {action}")]
    IllegalTransition {
        entity: String,
        id: String,
        current: String,
        action: String,
    },

    /// A stock receipt dated on/before an audit's boundary is immutable.
    ///
    /// Editing it would silently invalidate a closed accounting period.
    #[error("stock receipt {receipt_id} is locked by the audit performed at {locked_at}")]
    ReceiptLocked {
        receipt_id: String,
        locked_at: DateTime<Utc>,
    },

    /// Another request won the draft→paid race.
    #[error("order {id} was modified concurrently")]
    ConcurrentModification { id: String },
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failure (client error).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist (client error).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Wrong lifecycle state for the requested operation (client error).
    #[error("state conflict: {0}")]
    Conflict(#[from] StateConflict),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
