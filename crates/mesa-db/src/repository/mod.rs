//! # Repository Module
//!
//! One repository per aggregate. Each wraps the shared pool and exposes
//! typed async methods; nothing outside this module writes SQL.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repository Layout                                │
//! │                                                                         │
//! │  WarehouseRepository   warehouses                                       │
//! │  InventoryRepository   inventory_items (balance upserts)                │
//! │  ReceiptRepository     stock_receipts, receipt_lines, receipt_effects   │
//! │  AuditRepository       inventory_audits, audit_lines                    │
//! │  CatalogRepository     ingredients, products, recipe_entries            │
//! │  DiscountRepository    discounts                                        │
//! │  OrderRepository       orders, order_items, order_discounts             │
//! │                                                                         │
//! │  Multi-table invariants (apply ledger effect + move balances, pay       │
//! │  order + deduct stock) run inside a single transaction in the owning    │
//! │  repository.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod catalog;
pub mod discount;
pub mod inventory;
pub mod order;
pub mod receipt;
pub mod warehouse;

pub use audit::AuditRepository;
pub use catalog::CatalogRepository;
pub use discount::DiscountRepository;
pub use inventory::{BalanceChange, InventoryRepository};
pub use order::OrderRepository;
pub use receipt::ReceiptRepository;
pub use warehouse::WarehouseRepository;
