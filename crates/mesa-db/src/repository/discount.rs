//! # Discount Repository
//!
//! Database operations for discount definitions.
//!
//! Target category IDs and auto-apply day sets are stored as JSON text
//! columns; window times as "HH:MM" text. Rows that fail to decode map to
//! `DbError::CorruptRow` rather than panicking.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mesa_core::{Discount, DiscountKind, DiscountScope, TimeOfDay};

/// Raw row shape; JSON/text columns decoded in `into_discount`.
#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: String,
    name: String,
    scope: DiscountScope,
    kind: DiscountKind,
    value: f64,
    category_ids: String,
    product_id: Option<String>,
    auto_apply: bool,
    auto_apply_days: String,
    auto_apply_start: Option<String>,
    auto_apply_end: Option<String>,
    is_active: bool,
}

impl DiscountRow {
    fn into_discount(self) -> DbResult<Discount> {
        let category_ids: Vec<String> = serde_json::from_str(&self.category_ids)
            .map_err(|e| DbError::CorruptRow(format!("discount {} category_ids: {}", self.id, e)))?;
        let auto_apply_days: Vec<u8> = serde_json::from_str(&self.auto_apply_days)
            .map_err(|e| DbError::CorruptRow(format!("discount {} auto_apply_days: {}", self.id, e)))?;

        let parse_time = |field: &str, s: Option<String>| -> DbResult<Option<TimeOfDay>> {
            s.map(|s| {
                s.parse::<TimeOfDay>()
                    .map_err(|e| DbError::CorruptRow(format!("discount {} {}: {}", self.id, field, e)))
            })
            .transpose()
        };
        let auto_apply_start = parse_time("auto_apply_start", self.auto_apply_start.clone())?;
        let auto_apply_end = parse_time("auto_apply_end", self.auto_apply_end.clone())?;

        Ok(Discount {
            id: self.id,
            name: self.name,
            scope: self.scope,
            kind: self.kind,
            value: self.value,
            category_ids,
            product_id: self.product_id,
            auto_apply: self.auto_apply,
            auto_apply_days,
            auto_apply_start,
            auto_apply_end,
            is_active: self.is_active,
        })
    }
}

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Inserts a discount definition. Validation happens upstream.
    pub async fn create(&self, discount: &Discount) -> DbResult<()> {
        debug!(id = %discount.id, name = %discount.name, "Creating discount");

        let category_ids = serde_json::to_string(&discount.category_ids)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let auto_apply_days = serde_json::to_string(&discount.auto_apply_days)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, name, scope, kind, value,
                category_ids, product_id,
                auto_apply, auto_apply_days, auto_apply_start, auto_apply_end,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(discount.scope)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(category_ids)
        .bind(&discount.product_id)
        .bind(discount.auto_apply)
        .bind(auto_apply_days)
        .bind(discount.auto_apply_start.map(|t| t.to_string()))
        .bind(discount.auto_apply_end.map(|t| t.to_string()))
        .bind(discount.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a discount by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let row = sqlx::query_as::<_, DiscountRow>(
            r#"
            SELECT id, name, scope, kind, value,
                   category_ids, product_id,
                   auto_apply, auto_apply_days, auto_apply_start, auto_apply_end,
                   is_active
            FROM discounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DiscountRow::into_discount).transpose()
    }

    /// Lists active discounts. Totals calculation works from this set.
    pub async fn list_active(&self) -> DbResult<Vec<Discount>> {
        let rows = sqlx::query_as::<_, DiscountRow>(
            r#"
            SELECT id, name, scope, kind, value,
                   category_ids, product_id,
                   auto_apply, auto_apply_days, auto_apply_start, auto_apply_end,
                   is_active
            FROM discounts
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DiscountRow::into_discount).collect()
    }

    /// Overwrites a discount definition.
    pub async fn update(&self, discount: &Discount) -> DbResult<()> {
        let category_ids = serde_json::to_string(&discount.category_ids)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let auto_apply_days = serde_json::to_string(&discount.auto_apply_days)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE discounts SET
                name = ?2, scope = ?3, kind = ?4, value = ?5,
                category_ids = ?6, product_id = ?7,
                auto_apply = ?8, auto_apply_days = ?9,
                auto_apply_start = ?10, auto_apply_end = ?11,
                is_active = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(discount.scope)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(category_ids)
        .bind(&discount.product_id)
        .bind(discount.auto_apply)
        .bind(auto_apply_days)
        .bind(discount.auto_apply_start.map(|t| t.to_string()))
        .bind(discount.auto_apply_end.map(|t| t.to_string()))
        .bind(discount.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", &discount.id));
        }

        Ok(())
    }

    /// Soft-deletes a discount.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE discounts SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    fn happy_hour() -> Discount {
        Discount {
            id: Uuid::new_v4().to_string(),
            name: "Happy Hour".to_string(),
            scope: DiscountScope::Category,
            kind: DiscountKind::Percentage,
            value: 20.0,
            category_ids: vec!["coffee".to_string()],
            product_id: None,
            auto_apply: true,
            auto_apply_days: vec![1, 2, 3, 4, 5],
            auto_apply_start: Some("16:00".parse().unwrap()),
            auto_apply_end: Some("18:00".parse().unwrap()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_round_trip_with_json_columns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.discounts();

        let discount = happy_hour();
        repo.create(&discount).await.unwrap();

        let found = repo.get_by_id(&discount.id).await.unwrap().unwrap();
        assert_eq!(found.category_ids, vec!["coffee".to_string()]);
        assert_eq!(found.auto_apply_days, vec![1, 2, 3, 4, 5]);
        assert_eq!(found.auto_apply_start, discount.auto_apply_start);
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_active_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.discounts();

        let discount = happy_hour();
        repo.create(&discount).await.unwrap();
        assert_eq!(repo.list_active().await.unwrap().len(), 1);

        repo.deactivate(&discount.id).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
    }
}
