//! # Order Repository
//!
//! Database operations for orders, their line items, and snapshotted
//! discounts.
//!
//! ## Status Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every transition is a single guarded UPDATE:                           │
//! │                                                                         │
//! │    UPDATE orders SET status = 'paid', ...                               │
//! │    WHERE id = ?1 AND status = 'draft'                                   │
//! │                                                                         │
//! │  rows_affected() == 0 means the order was missing OR already past the   │
//! │  guard. Two registers paying the same draft race on this one statement  │
//! │  and exactly one wins; the loser gets a not-found for "Order (draft)".  │
//! │                                                                         │
//! │  Payment additionally deducts stock in the SAME transaction as the      │
//! │  status flip: a paid order without its deduction cannot be observed.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{adjust_in, BalanceChange};
use mesa_core::{AppliedDiscount, Money, Order, OrderItem, PaymentMethod};

/// Row shape for the order_discounts snapshot table.
#[derive(Debug, sqlx::FromRow)]
struct OrderDiscountRow {
    discount_id: String,
    name_snapshot: String,
    amount_cents: i64,
    auto_applied: bool,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a new order row.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, register_id = %order.register_id, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, status, location_id, register_id, cashier_id, warehouse_id, customer_id,
                subtotal_cents, discount_cents, manual_discount_cents, total_cents,
                payment_method, paid_amount_cents, change_cents,
                created_at, updated_at, paid_at, completed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(&order.location_id)
        .bind(&order.register_id)
        .bind(&order.cashier_id)
        .bind(&order.warehouse_id)
        .bind(&order.customer_id)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.manual_discount_cents)
        .bind(order.total_cents)
        .bind(order.payment_method)
        .bind(order.paid_amount_cents)
        .bind(order.change_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.paid_at)
        .bind(order.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds the open draft for a register position, if one exists.
    ///
    /// `start` relies on this for its lookup-before-create: at most one
    /// draft per (location, register, cashier).
    pub async fn find_draft(
        &self,
        location_id: &str,
        register_id: &str,
        cashier_id: &str,
    ) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, status, location_id, register_id, cashier_id, warehouse_id, customer_id,
                   subtotal_cents, discount_cents, manual_discount_cents, total_cents,
                   payment_method, paid_amount_cents, change_cents,
                   created_at, updated_at, paid_at, completed_at
            FROM orders
            WHERE location_id = ?1 AND register_id = ?2 AND cashier_id = ?3 AND status = 'draft'
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(location_id)
        .bind(register_id)
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, status, location_id, register_id, cashier_id, warehouse_id, customer_id,
                   subtotal_cents, discount_cents, manual_discount_cents, total_cents,
                   payment_method, paid_amount_cents, change_cents,
                   created_at, updated_at, paid_at, completed_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists orders for a location, newest first.
    pub async fn list_for_location(&self, location_id: &str, limit: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, status, location_id, register_id, cashier_id, warehouse_id, customer_id,
                   subtotal_cents, discount_cents, manual_discount_cents, total_cents,
                   payment_method, paid_amount_cents, change_cents,
                   created_at, updated_at, paid_at, completed_at
            FROM orders
            WHERE location_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(location_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Gets all items of an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot, category_id,
                   quantity, unit_price_cents, modifiers, line_total_cents
            FROM order_items
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the discounts snapshotted onto an order.
    pub async fn get_applied_discounts(&self, order_id: &str) -> DbResult<Vec<AppliedDiscount>> {
        let rows = sqlx::query_as::<_, OrderDiscountRow>(
            r#"
            SELECT discount_id, name_snapshot, amount_cents, auto_applied
            FROM order_discounts
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| AppliedDiscount {
                discount_id: r.discount_id,
                name: r.name_snapshot,
                amount: Money::from_cents(r.amount_cents),
                auto_applied: r.auto_applied,
            })
            .collect())
    }

    /// Replaces an order's items, discount snapshot, and totals in one
    /// transaction. Draft only.
    #[allow(clippy::too_many_arguments)]
    pub async fn replace_items(
        &self,
        order_id: &str,
        items: &[OrderItem],
        discounts: &[AppliedDiscount],
        subtotal_cents: i64,
        discount_cents: i64,
        manual_discount_cents: i64,
        total_cents: i64,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                subtotal_cents = ?2,
                discount_cents = ?3,
                manual_discount_cents = ?4,
                total_cents = ?5,
                updated_at = ?6
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(order_id)
        .bind(subtotal_cents)
        .bind(discount_cents)
        .bind(manual_discount_cents)
        .bind(total_cents)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (draft)", order_id));
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM order_discounts WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot, category_id,
                    quantity, unit_price_cents, modifiers, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(&item.category_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(&item.modifiers)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        for discount in discounts {
            sqlx::query(
                r#"
                INSERT INTO order_discounts (order_id, discount_id, name_snapshot, amount_cents, auto_applied)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(order_id)
            .bind(&discount.discount_id)
            .bind(&discount.name)
            .bind(discount.amount.cents())
            .bind(discount.auto_applied)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attaches or detaches a customer. Draft only.
    pub async fn set_customer(&self, order_id: &str, customer_id: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET customer_id = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(order_id)
        .bind(customer_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (draft)", order_id));
        }

        Ok(())
    }

    /// Flips a draft to paid and deducts stock, in one transaction.
    ///
    /// The guarded UPDATE is the concurrency control; when it matches no
    /// row the whole transaction rolls back and nothing was deducted.
    pub async fn mark_paid(
        &self,
        order_id: &str,
        method: PaymentMethod,
        paid_amount_cents: i64,
        change_cents: i64,
        paid_at: DateTime<Utc>,
        warehouse_id: &str,
        deductions: &[BalanceChange],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'paid',
                payment_method = ?2,
                paid_amount_cents = ?3,
                change_cents = ?4,
                paid_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(order_id)
        .bind(method)
        .bind(paid_amount_cents)
        .bind(change_cents)
        .bind(paid_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (draft)", order_id));
        }

        for deduction in deductions {
            adjust_in(&mut *tx, warehouse_id, deduction).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Flips a paid order to completed.
    pub async fn mark_completed(&self, order_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = 'completed', completed_at = ?2, updated_at = ?2
            WHERE id = ?1 AND status = 'paid'
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (paid)", order_id));
        }

        Ok(())
    }

    /// Deletes a draft. Items and discount snapshots cascade. Paid and
    /// completed orders are permanent.
    pub async fn delete_draft(&self, order_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'draft'")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (draft)", order_id));
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
    use mesa_core::{ItemType, OrderStatus};
    use uuid::Uuid;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        (db, wh.id)
    }

    fn draft_order(warehouse_id: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Draft,
            location_id: "loc-1".to_string(),
            register_id: "reg-1".to_string(),
            cashier_id: "cash-1".to_string(),
            warehouse_id: warehouse_id.to_string(),
            customer_id: None,
            subtotal_cents: 0,
            discount_cents: 0,
            manual_discount_cents: 0,
            total_cents: 0,
            payment_method: None,
            paid_amount_cents: None,
            change_cents: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_draft_scoped_to_register_position() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();

        let found = repo.find_draft("loc-1", "reg-1", "cash-1").await.unwrap();
        assert_eq!(found.unwrap().id, order.id);

        let other = repo.find_draft("loc-1", "reg-2", "cash-1").await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_mark_paid_deducts_in_same_transaction() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();

        let deductions = vec![BalanceChange {
            item_type: ItemType::Ingredient,
            item_id: "beans".to_string(),
            quantity_delta: -18.0,
            unit_cost: None,
        }];
        repo.mark_paid(
            &order.id,
            PaymentMethod::Cash,
            1000,
            100,
            Utc::now(),
            &wh,
            &deductions,
        )
        .await
        .unwrap();

        let paid = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.change_cents, Some(100));

        let balance = db
            .inventory()
            .get(&wh, ItemType::Ingredient, "beans")
            .await
            .unwrap()
            .unwrap();
        assert!((balance.quantity + 18.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_double_pay_loses_the_guard() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();

        repo.mark_paid(&order.id, PaymentMethod::Card, 500, 0, Utc::now(), &wh, &[])
            .await
            .unwrap();

        let err = repo
            .mark_paid(&order.id, PaymentMethod::Card, 500, 0, Utc::now(), &wh, &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));

        // stock untouched by the losing attempt
        assert!(db
            .inventory()
            .get(&wh, ItemType::Ingredient, "beans")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_complete_requires_paid() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();

        assert!(repo.mark_completed(&order.id).await.is_err());

        repo.mark_paid(&order.id, PaymentMethod::Card, 0, 0, Utc::now(), &wh, &[])
            .await
            .unwrap();
        repo.mark_completed(&order.id).await.unwrap();

        let done = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_replace_items_snapshots_discounts() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();

        let items = vec![OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            product_id: "p-1".to_string(),
            name_snapshot: "Latte".to_string(),
            category_id: Some("coffee".to_string()),
            quantity: 2,
            unit_price_cents: 500,
            modifiers: None,
            line_total_cents: 1000,
        }];
        let discounts = vec![AppliedDiscount {
            discount_id: "d-1".to_string(),
            name: "Happy Hour".to_string(),
            amount: Money::from_cents(100),
            auto_applied: true,
        }];
        repo.replace_items(&order.id, &items, &discounts, 1000, 100, 0, 900)
            .await
            .unwrap();

        assert_eq!(repo.get_items(&order.id).await.unwrap().len(), 1);
        let applied = repo.get_applied_discounts(&order.id).await.unwrap();
        assert_eq!(applied, discounts);

        let updated = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(updated.total_cents, 900);
    }

    #[tokio::test]
    async fn test_delete_draft_only() {
        let (db, wh) = setup().await;
        let repo = db.orders();

        let order = draft_order(&wh);
        repo.insert(&order).await.unwrap();
        repo.mark_paid(&order.id, PaymentMethod::Cash, 0, 0, Utc::now(), &wh, &[])
            .await
            .unwrap();

        assert!(repo.delete_draft(&order.id).await.is_err());
        assert!(repo.get_by_id(&order.id).await.unwrap().is_some());
    }
}
