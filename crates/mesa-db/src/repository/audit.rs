//! # Audit Repository
//!
//! Database operations for inventory audits.
//!
//! An audit is written once, in one transaction, together with the balance
//! overwrites its counts imply. After that the rows are never updated; the
//! latest `performed_at` per warehouse is the ledger's edit lock boundary.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::inventory::set_absolute_in;
use mesa_core::{AuditLine, InventoryAudit};

/// Repository for inventory audit database operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Persists an audit, its lines, and the counted balances atomically.
    ///
    /// Each line's `counted_quantity` becomes the absolute balance for that
    /// item; the stored unit cost is left as-is (the audit only snapshots
    /// it).
    pub async fn create(&self, audit: &InventoryAudit, lines: &[AuditLine]) -> DbResult<()> {
        debug!(id = %audit.id, warehouse_id = %audit.warehouse_id, lines = lines.len(), "Recording audit");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_audits (
                id, warehouse_id, performed_by, performed_at,
                total_loss_cents, total_gain_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&audit.id)
        .bind(&audit.warehouse_id)
        .bind(&audit.performed_by)
        .bind(audit.performed_at)
        .bind(audit.total_loss_cents)
        .bind(audit.total_gain_cents)
        .bind(audit.created_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO audit_lines (
                    audit_id, item_type, item_id,
                    previous_quantity, counted_quantity, difference,
                    unit_cost_snapshot, value_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&line.audit_id)
            .bind(line.item_type)
            .bind(&line.item_id)
            .bind(line.previous_quantity)
            .bind(line.counted_quantity)
            .bind(line.difference)
            .bind(line.unit_cost_snapshot)
            .bind(line.value_cents)
            .execute(&mut *tx)
            .await?;

            set_absolute_in(
                &mut tx,
                &audit.warehouse_id,
                line.item_type,
                &line.item_id,
                line.counted_quantity,
                None,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an audit by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryAudit>> {
        let audit = sqlx::query_as::<_, InventoryAudit>(
            r#"
            SELECT id, warehouse_id, performed_by, performed_at,
                   total_loss_cents, total_gain_cents, created_at
            FROM inventory_audits
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(audit)
    }

    /// Gets the lines of an audit.
    pub async fn get_lines(&self, audit_id: &str) -> DbResult<Vec<AuditLine>> {
        let lines = sqlx::query_as::<_, AuditLine>(
            r#"
            SELECT audit_id, item_type, item_id,
                   previous_quantity, counted_quantity, difference,
                   unit_cost_snapshot, value_cents
            FROM audit_lines
            WHERE audit_id = ?1
            "#,
        )
        .bind(audit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists audits for a warehouse, newest first.
    pub async fn list_for_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<InventoryAudit>> {
        let audits = sqlx::query_as::<_, InventoryAudit>(
            r#"
            SELECT id, warehouse_id, performed_by, performed_at,
                   total_loss_cents, total_gain_cents, created_at
            FROM inventory_audits
            WHERE warehouse_id = ?1
            ORDER BY performed_at DESC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(audits)
    }

    /// The lock boundary: the latest audit time for a warehouse, if any.
    /// Receipts dated on or before this can no longer be edited or deleted.
    pub async fn latest_audit_at(&self, warehouse_id: &str) -> DbResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT MAX(performed_at)
            FROM inventory_audits
            WHERE warehouse_id = ?1
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(latest)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use mesa_core::ItemType;
    use uuid::Uuid;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        (db, wh.id)
    }

    fn audit_fixture(warehouse_id: &str) -> InventoryAudit {
        InventoryAudit {
            id: Uuid::new_v4().to_string(),
            warehouse_id: warehouse_id.to_string(),
            performed_by: "user-1".to_string(),
            performed_at: Utc::now(),
            total_loss_cents: 150,
            total_gain_cents: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_overwrites_balances() {
        let (db, wh) = setup().await;
        let audit = audit_fixture(&wh);
        let lines = vec![AuditLine {
            audit_id: audit.id.clone(),
            item_type: ItemType::Ingredient,
            item_id: "flour".to_string(),
            previous_quantity: 1000.0,
            counted_quantity: 925.0,
            difference: -75.0,
            unit_cost_snapshot: Some(0.02),
            value_cents: -150,
        }];

        db.audits().create(&audit, &lines).await.unwrap();

        let balance = db
            .inventory()
            .get(&wh, ItemType::Ingredient, "flour")
            .await
            .unwrap()
            .unwrap();
        assert!((balance.quantity - 925.0).abs() < 1e-9);
        assert_eq!(db.audits().get_lines(&audit.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_audit_at() {
        let (db, wh) = setup().await;
        let repo = db.audits();

        assert!(repo.latest_audit_at(&wh).await.unwrap().is_none());

        let audit = audit_fixture(&wh);
        repo.create(&audit, &[]).await.unwrap();

        let latest = repo.latest_audit_at(&wh).await.unwrap().unwrap();
        assert!((latest - audit.performed_at).num_seconds().abs() <= 1);
    }
}
