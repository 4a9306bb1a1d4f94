//! # Warehouse Repository
//!
//! Database operations for stock-keeping locations.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::Warehouse;

/// Repository for warehouse database operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    /// Creates a new WarehouseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Creates a new warehouse.
    pub async fn create(&self, name: &str, location: Option<&str>) -> DbResult<Warehouse> {
        let warehouse = Warehouse {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            location: location.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %warehouse.id, name = %warehouse.name, "Creating warehouse");

        sqlx::query(
            r#"
            INSERT INTO warehouses (id, name, location, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(warehouse.created_at)
        .execute(&self.pool)
        .await?;

        Ok(warehouse)
    }

    /// Gets a warehouse by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, name, location, created_at
            FROM warehouses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(warehouse)
    }

    /// Lists all warehouses, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, name, location, created_at
            FROM warehouses
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(warehouses)
    }

    /// Renames or relocates a warehouse.
    pub async fn update(&self, id: &str, name: &str, location: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE warehouses SET name = ?2, location = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(location)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Warehouse", id));
        }

        Ok(())
    }

    /// Deletes a warehouse.
    ///
    /// Fails with a foreign key violation while receipts, audits, or
    /// balances still reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Warehouse", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        let wh = repo.create("Main", Some("Back room")).await.unwrap();
        let found = repo.get_by_id(&wh.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Main");
        assert_eq!(found.location.as_deref(), Some("Back room"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        let err = repo.update("nope", "x", None).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        repo.create("A", None).await.unwrap();
        repo.create("B", None).await.unwrap();
        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
