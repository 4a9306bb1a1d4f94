//! # Inventory Repository
//!
//! Balance reads and the atomic upsert that every stock movement funnels
//! through.
//!
//! ## The Balance Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO inventory_items (..., quantity, ...)                       │
//! │  VALUES (..., Δ, ...)                                                   │
//! │  ON CONFLICT (warehouse_id, item_type, item_id) DO UPDATE SET           │
//! │      quantity = inventory_items.quantity + excluded.quantity            │
//! │                                                                         │
//! │  One statement, no read-modify-write: concurrent movements against      │
//! │  the same balance serialize inside SQLite instead of clobbering each    │
//! │  other.                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Balances may go negative; there is no floor here or anywhere else.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;
use mesa_core::{InventoryItem, ItemType};

/// One balance adjustment: a signed quantity delta plus, optionally, the
/// new weighted-average unit cost to store alongside it. `None` leaves the
/// stored cost untouched.
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub item_type: ItemType,
    pub item_id: String,
    pub quantity_delta: f64,
    pub unit_cost: Option<f64>,
}

/// Repository for inventory balance operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets one balance row, if it exists.
    pub async fn get(
        &self,
        warehouse_id: &str,
        item_type: ItemType,
        item_id: &str,
    ) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT warehouse_id, item_type, item_id, quantity, unit_cost, updated_at
            FROM inventory_items
            WHERE warehouse_id = ?1 AND item_type = ?2 AND item_id = ?3
            "#,
        )
        .bind(warehouse_id)
        .bind(item_type)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists all balances in a warehouse.
    pub async fn list_for_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT warehouse_id, item_type, item_id, quantity, unit_cost, updated_at
            FROM inventory_items
            WHERE warehouse_id = ?1
            ORDER BY item_type, item_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists every warehouse's balance for one item. The costing engine
    /// treats these as lots for the weighted average.
    pub async fn list_for_item(
        &self,
        item_type: ItemType,
        item_id: &str,
    ) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT warehouse_id, item_type, item_id, quantity, unit_cost, updated_at
            FROM inventory_items
            WHERE item_type = ?1 AND item_id = ?2
            "#,
        )
        .bind(item_type)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Applies one balance change via the atomic upsert.
    pub async fn adjust(&self, warehouse_id: &str, change: &BalanceChange) -> DbResult<()> {
        adjust_in(&self.pool, warehouse_id, change).await
    }
}

/// The upsert itself, usable against the pool or inside a transaction
/// owned by another repository (ledger apply, order payment).
pub(crate) async fn adjust_in<'e, E>(
    executor: E,
    warehouse_id: &str,
    change: &BalanceChange,
) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO inventory_items (warehouse_id, item_type, item_id, quantity, unit_cost, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (warehouse_id, item_type, item_id) DO UPDATE SET
            quantity = inventory_items.quantity + excluded.quantity,
            unit_cost = COALESCE(excluded.unit_cost, inventory_items.unit_cost),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(warehouse_id)
    .bind(change.item_type)
    .bind(&change.item_id)
    .bind(change.quantity_delta)
    .bind(change.unit_cost)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrites a balance to an absolute quantity (recounts, audits).
pub(crate) async fn set_absolute_in(
    tx: &mut Transaction<'_, Sqlite>,
    warehouse_id: &str,
    item_type: ItemType,
    item_id: &str,
    quantity: f64,
    unit_cost: Option<f64>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_items (warehouse_id, item_type, item_id, quantity, unit_cost, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (warehouse_id, item_type, item_id) DO UPDATE SET
            quantity = excluded.quantity,
            unit_cost = COALESCE(excluded.unit_cost, inventory_items.unit_cost),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(warehouse_id)
    .bind(item_type)
    .bind(item_id)
    .bind(quantity)
    .bind(unit_cost)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        (db, wh.id)
    }

    fn change(item_id: &str, delta: f64, cost: Option<f64>) -> BalanceChange {
        BalanceChange {
            item_type: ItemType::Ingredient,
            item_id: item_id.to_string(),
            quantity_delta: delta,
            unit_cost: cost,
        }
    }

    #[tokio::test]
    async fn test_adjust_creates_then_accumulates() {
        let (db, wh) = setup().await;
        let repo = db.inventory();

        repo.adjust(&wh, &change("flour", 1000.0, Some(0.002)))
            .await
            .unwrap();
        repo.adjust(&wh, &change("flour", -250.0, None)).await.unwrap();

        let item = repo
            .get(&wh, ItemType::Ingredient, "flour")
            .await
            .unwrap()
            .unwrap();
        assert!((item.quantity - 750.0).abs() < 1e-9);
        // cost survives an uncosted adjustment
        assert_eq!(item.unit_cost, Some(0.002));
    }

    #[tokio::test]
    async fn test_balance_can_go_negative() {
        let (db, wh) = setup().await;
        let repo = db.inventory();

        repo.adjust(&wh, &change("milk", -3.5, None)).await.unwrap();
        let item = repo
            .get(&wh, ItemType::Ingredient, "milk")
            .await
            .unwrap()
            .unwrap();
        assert!((item.quantity + 3.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_list_for_item_spans_warehouses() {
        let (db, wh1) = setup().await;
        let wh2 = db.warehouses().create("Second", None).await.unwrap();
        let repo = db.inventory();

        repo.adjust(&wh1, &change("beans", 10.0, Some(12.0)))
            .await
            .unwrap();
        repo.adjust(&wh2.id, &change("beans", 5.0, Some(15.0)))
            .await
            .unwrap();

        let lots = repo.list_for_item(ItemType::Ingredient, "beans").await.unwrap();
        assert_eq!(lots.len(), 2);
    }
}
