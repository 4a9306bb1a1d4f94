//! # mesa-db: Database Layer for Mesa POS
//!
//! This crate provides database access for the Mesa POS back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Data Flow                               │
//! │                                                                         │
//! │  Engine service (LedgerService, OrderService, ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      mesa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (receipt.rs,  │    │  (embedded)  │  │   │
//! │  │   │               │    │  order.rs...) │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ per-aggregate │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ typed methods │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                       SQLite database file                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (inventory, orders, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesa_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/mesa.db")).await?;
//! let warehouses = db.warehouses().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AuditRepository, BalanceChange, CatalogRepository, DiscountRepository, InventoryRepository,
    OrderRepository, ReceiptRepository, WarehouseRepository,
};
pub use repository::catalog::ProductInput;
