//! # mesa-core: Pure Business Logic for Mesa POS
//!
//! This crate is the **heart** of the Mesa back office. It contains the
//! inventory, costing, discount, and order-lifecycle rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Mesa POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 Admin / Register surfaces (out of scope)        │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                mesa-engine (orchestration services)             │    │
//! │  │    ledger apply/reverse • costing cascade • audits • orders     │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                ★ mesa-core (THIS CRATE) ★                       │    │
//! │  │                                                                 │    │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐  │    │
//! │  │  │  money  │ │  units  │ │ costing │ │ discount │ │  audit  │  │    │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └──────────┘ └─────────┘  │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                   mesa-db (Database Layer)                      │    │
//! │  │             SQLite queries, migrations, repositories            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Warehouse, StockReceipt, Order, Discount, …)
//! - [`money`] - Integer-cent money plus rate-rounding helpers
//! - [`units`] - Unit conversion (strict write path, lenient read path)
//! - [`costing`] - Weighted-average costing and recipe roll-up math
//! - [`discount`] - Order totals under the discount policy
//! - [`audit`] - Stock count valuation
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Boundary validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - time, when relevant, is an input
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: monetary amounts are cents (i64); only unit-cost
//!    rates stay fractional
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod costing;
pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, StateConflict, ValidationError};
pub use money::Money;
pub use types::*;
pub use units::Unit;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default location ID for v0.1 (single-location runtime with
/// multi-location schema). Replaced with dynamic resolution later.
pub const DEFAULT_LOCATION_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed on a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line. Guards against typing 1000 for 10.
pub const MAX_LINE_QUANTITY: i64 = 999;
