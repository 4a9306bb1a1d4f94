//! # Receipt Repository
//!
//! Database operations for the inventory ledger: receipt documents, their
//! lines, and the effects they had on balances.
//!
//! ## Apply / Reverse
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  APPLY (one transaction)                                                │
//! │    1. INSERT receipt_effects rows (what this document did)              │
//! │    2. Upsert each balance with its quantity delta and new avg cost      │
//! │                                                                         │
//! │  REVERSE (one transaction)                                              │
//! │    1. DELETE receipt_effects rows for the document                      │
//! │    2. Upsert each balance with the inverse delta / unfolded cost        │
//! │                                                                         │
//! │  The engine computes the deltas and costs; this layer only guarantees   │
//! │  that effects and balances never disagree.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{adjust_in, BalanceChange};
use chrono::{DateTime, Utc};
use mesa_core::{ReceiptEffect, ReceiptLine, StockReceipt};

/// Repository for stock receipt database operations.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    /// Creates a new ReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    /// Inserts a receipt document and its lines in one transaction.
    ///
    /// Does NOT touch balances; the engine applies effects separately.
    pub async fn create(&self, receipt: &StockReceipt, lines: &[ReceiptLine]) -> DbResult<()> {
        debug!(id = %receipt.id, kind = %receipt.kind, "Inserting stock receipt");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_receipts (id, kind, warehouse_id, supplier_id, occurred_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&receipt.id)
        .bind(receipt.kind)
        .bind(&receipt.warehouse_id)
        .bind(&receipt.supplier_id)
        .bind(receipt.occurred_at)
        .bind(receipt.created_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO receipt_lines (receipt_id, item_type, item_id, quantity, unit_cost)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&receipt.id)
            .bind(line.item_type)
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(line.unit_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a receipt by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockReceipt>> {
        let receipt = sqlx::query_as::<_, StockReceipt>(
            r#"
            SELECT id, kind, warehouse_id, supplier_id, occurred_at, created_at
            FROM stock_receipts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receipt)
    }

    /// Lists receipts for a warehouse, newest first.
    pub async fn list_for_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<StockReceipt>> {
        let receipts = sqlx::query_as::<_, StockReceipt>(
            r#"
            SELECT id, kind, warehouse_id, supplier_id, occurred_at, created_at
            FROM stock_receipts
            WHERE warehouse_id = ?1
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(receipts)
    }

    /// Gets the lines of a receipt.
    pub async fn get_lines(&self, receipt_id: &str) -> DbResult<Vec<ReceiptLine>> {
        let lines = sqlx::query_as::<_, ReceiptLine>(
            r#"
            SELECT receipt_id, item_type, item_id, quantity, unit_cost
            FROM receipt_lines
            WHERE receipt_id = ?1
            "#,
        )
        .bind(receipt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets the stored applied effect of a receipt. Empty when the receipt
    /// was never applied (or already reversed).
    pub async fn get_effects(&self, receipt_id: &str) -> DbResult<Vec<ReceiptEffect>> {
        let effects = sqlx::query_as::<_, ReceiptEffect>(
            r#"
            SELECT receipt_id, item_type, item_id, quantity_delta, unit_cost
            FROM receipt_effects
            WHERE receipt_id = ?1
            "#,
        )
        .bind(receipt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(effects)
    }

    /// Updates a receipt's header fields.
    pub async fn update_header(
        &self,
        id: &str,
        supplier_id: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_receipts SET supplier_id = ?2, occurred_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(supplier_id)
        .bind(occurred_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockReceipt", id));
        }

        Ok(())
    }

    /// Replaces a receipt's lines in one transaction.
    pub async fn replace_lines(&self, receipt_id: &str, lines: &[ReceiptLine]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM receipt_lines WHERE receipt_id = ?1")
            .bind(receipt_id)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO receipt_lines (receipt_id, item_type, item_id, quantity, unit_cost)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(receipt_id)
            .bind(line.item_type)
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(line.unit_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a receipt document. Lines and effects cascade.
    ///
    /// The engine must have reversed the applied effect first.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM stock_receipts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockReceipt", id));
        }

        Ok(())
    }

    /// Records a receipt's effect and moves the balances, atomically.
    pub async fn apply(
        &self,
        warehouse_id: &str,
        effects: &[ReceiptEffect],
        changes: &[BalanceChange],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for effect in effects {
            sqlx::query(
                r#"
                INSERT INTO receipt_effects (receipt_id, item_type, item_id, quantity_delta, unit_cost)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&effect.receipt_id)
            .bind(effect.item_type)
            .bind(&effect.item_id)
            .bind(effect.quantity_delta)
            .bind(effect.unit_cost)
            .execute(&mut *tx)
            .await?;
        }

        for change in changes {
            adjust_in(&mut *tx, warehouse_id, change).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Drops a receipt's stored effect and applies the inverse balance
    /// changes, atomically. `changes` must already be inverted by the
    /// caller.
    pub async fn reverse(
        &self,
        receipt_id: &str,
        warehouse_id: &str,
        changes: &[BalanceChange],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM receipt_effects WHERE receipt_id = ?1")
            .bind(receipt_id)
            .execute(&mut *tx)
            .await?;

        for change in changes {
            adjust_in(&mut *tx, warehouse_id, change).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
