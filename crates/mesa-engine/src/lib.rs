//! # mesa-engine: Orchestration Services for Mesa POS
//!
//! The service layer between the surfaces (admin, register) and the data
//! layer. Owns every workflow that spans aggregates.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Service Layer                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    mesa-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │  LedgerService    apply / reverse / reapply of stock receipts   │   │
//! │  │  CostingService   weighted-average recalc + recipe fan-out      │   │
//! │  │  AuditService     stock counts, ledger lock boundary            │   │
//! │  │  OrderService     draft → paid → completed, stock deduction,    │   │
//! │  │                   discount resolution, loyalty side effect      │   │
//! │  │                                                                 │   │
//! │  └───────────┬─────────────────────────────────┬───────────────────┘   │
//! │              │ pure rules                      │ SQL                   │
//! │              ▼                                 ▼                       │
//! │          mesa-core                         mesa-db                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mesa_db::{Database, DbConfig};
//! use mesa_engine::{EngineConfig, NoopLoyalty, OrderService};
//!
//! let db = Database::new(DbConfig::new("mesa.db")).await?;
//! let orders = OrderService::new(db, EngineConfig::new(warehouse_id), Arc::new(NoopLoyalty));
//! let draft = orders.start("reg-1", "cashier-1", None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod config;
pub mod costing;
pub mod error;
pub mod ledger;
pub mod loyalty;
pub mod orders;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditCountRequest, AuditRequest, AuditService};
pub use config::EngineConfig;
pub use costing::CostingService;
pub use error::{EngineError, EngineResult};
pub use ledger::{
    LedgerService, ReceiptLineRequest, ReceiptRequest, ReceiptUpdateRequest,
};
pub use loyalty::{Loyalty, LoyaltyError, NoopLoyalty, PointsEarned};
pub use orders::{
    OrderDetail, OrderItemRequest, OrderItemsRequest, OrderService, PaymentRequest,
};
