//! # Order Service
//!
//! The order state machine and everything that hangs off its transitions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  start ──► draft ──pay──► paid ──complete──► completed                  │
//! │              │                                                          │
//! │              └──cancel──► (deleted)                                     │
//! │                                                                         │
//! │  start:     at most one draft per (location, register, cashier);        │
//! │             look-up-before-create                                       │
//! │  set_items: draft only; snapshots product data; recomputes totals       │
//! │             through the discount engine                                 │
//! │  pay:       guarded flip + recipe-driven stock deduction in ONE         │
//! │             transaction; then best-effort loyalty accrual               │
//! │  complete:  flag flip, paid only                                        │
//! │  cancel:    hard delete, draft only                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wrong-state attempts distinguish "already in that state" from "illegal
//! transition".

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::loyalty::{accrue_best_effort, Loyalty};
use mesa_core::discount::calculate_order_totals;
use mesa_core::units::convert;
use mesa_core::validation::{
    validate_line_quantity, validate_manual_discount, validate_order_size,
    validate_payment_amount,
};
use mesa_core::{
    AppliedDiscount, ItemType, Money, Order, OrderItem, OrderStatus, PaymentMethod,
    StateConflict, ValidationError,
};
use mesa_db::{BalanceChange, Database, DbError};

// =============================================================================
// Request DTOs
// =============================================================================

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Free-form modifier notes, stored verbatim on the snapshot.
    pub modifiers: Option<String>,
}

/// Full replacement of a draft's items and discount selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItemsRequest {
    pub items: Vec<OrderItemRequest>,
    pub selected_discount_ids: Vec<String>,
    pub manual_discount_cents: i64,
    pub customer_id: Option<String>,
}

/// A payment attempt against a draft.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount_cents: i64,
}

/// An order with its lines and resolved discounts.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub discounts: Vec<AppliedDiscount>,
}

// =============================================================================
// Service
// =============================================================================

/// Service that owns the order lifecycle.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
    config: EngineConfig,
    loyalty: Arc<dyn Loyalty>,
}

impl OrderService {
    /// Creates a new OrderService.
    pub fn new(db: Database, config: EngineConfig, loyalty: Arc<dyn Loyalty>) -> Self {
        OrderService {
            db,
            config,
            loyalty,
        }
    }

    /// Returns the open draft for a register position, creating one if
    /// none exists.
    pub async fn start(
        &self,
        register_id: &str,
        cashier_id: &str,
        warehouse_id: Option<&str>,
    ) -> EngineResult<Order> {
        let orders = self.db.orders();

        if let Some(existing) = orders
            .find_draft(&self.config.location_id, register_id, cashier_id)
            .await?
        {
            return Ok(existing);
        }

        let warehouse_id = warehouse_id.unwrap_or(&self.config.default_warehouse_id);
        self.db
            .warehouses()
            .get_by_id(warehouse_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Warehouse", warehouse_id))?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Draft,
            location_id: self.config.location_id.clone(),
            register_id: register_id.to_string(),
            cashier_id: cashier_id.to_string(),
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
        };
        orders.insert(&order).await?;

        info!(id = %order.id, register_id, cashier_id, "Draft order started");
        Ok(order)
    }

    /// Replaces a draft's items, recomputes totals through the discount
    /// engine, and attaches/detaches the customer.
    pub async fn set_items(&self, order_id: &str, request: OrderItemsRequest) -> EngineResult<Order> {
        let order = self.get_checked(order_id).await?;
        require_status(&order, OrderStatus::Draft, "set_items")?;

        validate_order_size(request.items.len())?;
        validate_manual_discount(request.manual_discount_cents)?;

        let catalog = self.db.catalog();
        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            validate_line_quantity(line.quantity)?;
            if line.quantity == 0 {
                continue;
            }

            let product = catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;
            if !product.is_active {
                return Err(ValidationError::NotAllowed {
                    field: "product_id".to_string(),
                    allowed: vec!["active products".to_string()],
                }
                .into());
            }

            items.push(OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.to_string(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                category_id: product.category_id.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                modifiers: line.modifiers.clone(),
                line_total_cents: product.price_cents * line.quantity,
            });
        }

        let discounts = self.db.discounts().list_active().await?;
        let totals = calculate_order_totals(
            &items,
            &discounts,
            &request.selected_discount_ids,
            Money::from_cents(request.manual_discount_cents),
            Utc::now(),
        );

        let orders = self.db.orders();
        orders
            .replace_items(
                order_id,
                &items,
                &totals.applied,
                totals.subtotal.cents(),
                totals.total_discount.cents(),
                totals.manual_discount.cents(),
                totals.total.cents(),
            )
            .await
            .map_err(|e| self.draft_conflict(&order, e))?;
        orders
            .set_customer(order_id, request.customer_id.as_deref())
            .await
            .map_err(|e| self.draft_conflict(&order, e))?;

        self.get_checked(order_id).await
    }

    /// Pays a draft: guarded status flip plus stock deduction in one
    /// transaction, then best-effort loyalty accrual.
    pub async fn pay(&self, order_id: &str, request: PaymentRequest) -> EngineResult<Order> {
        let order = self.get_checked(order_id).await?;
        require_status(&order, OrderStatus::Draft, "pay")?;

        if order.total_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "total".to_string(),
            }
            .into());
        }
        validate_payment_amount(request.amount_cents)?;
        if request.amount_cents < order.total_cents {
            return Err(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: order.total_cents,
                max: i64::MAX,
            }
            .into());
        }

        let change_cents = match request.method {
            PaymentMethod::Cash => request.amount_cents - order.total_cents,
            // card charges the exact total
            PaymentMethod::Card => 0,
        };

        let items = self.db.orders().get_items(order_id).await?;
        let deductions = self.build_deductions(&items).await?;

        let paid_at = Utc::now();
        self.db
            .orders()
            .mark_paid(
                order_id,
                request.method,
                request.amount_cents,
                change_cents,
                paid_at,
                &order.warehouse_id,
                &deductions,
            )
            .await
            .map_err(|e| self.draft_conflict(&order, e))?;

        info!(
            id = %order_id,
            method = %request.method,
            total_cents = order.total_cents,
            change_cents,
            "Order paid, stock deducted"
        );

        if let Some(customer_id) = &order.customer_id {
            accrue_best_effort(
                self.loyalty.as_ref(),
                self.config.loyalty_timeout,
                customer_id,
                order_id,
                Money::from_cents(order.total_cents),
            )
            .await;
        }

        self.get_checked(order_id).await
    }

    /// Completes a paid order.
    pub async fn complete(&self, order_id: &str) -> EngineResult<Order> {
        let order = self.get_checked(order_id).await?;
        require_status(&order, OrderStatus::Paid, "complete")?;

        self.db.orders().mark_completed(order_id).await?;
        info!(id = %order_id, "Order completed");
        self.get_checked(order_id).await
    }

    /// Cancels a draft. Paid and completed orders are permanent.
    pub async fn cancel(&self, order_id: &str) -> EngineResult<()> {
        let order = self.get_checked(order_id).await?;
        require_status(&order, OrderStatus::Draft, "cancel")?;

        self.db
            .orders()
            .delete_draft(order_id)
            .await
            .map_err(|e| self.draft_conflict(&order, e))?;
        info!(id = %order_id, "Draft order cancelled");
        Ok(())
    }

    /// Gets an order with its items and resolved discounts.
    pub async fn get_order(&self, order_id: &str) -> EngineResult<OrderDetail> {
        let order = self.get_checked(order_id).await?;
        let items = self.db.orders().get_items(order_id).await?;
        let discounts = self.db.orders().get_applied_discounts(order_id).await?;
        Ok(OrderDetail {
            order,
            items,
            discounts,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn get_checked(&self, order_id: &str) -> EngineResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order", order_id))
    }

    /// What payment takes out of the warehouse: recipe lines × quantity
    /// converted into each ingredient's canonical unit; products without a
    /// recipe consume their own stock.
    async fn build_deductions(&self, items: &[OrderItem]) -> EngineResult<Vec<BalanceChange>> {
        let catalog = self.db.catalog();
        // item id → accumulated deduction, merged across lines
        let mut totals: HashMap<(ItemType, String), f64> = HashMap::new();

        for item in items {
            let recipe = catalog.get_recipe(&item.product_id).await?;
            if recipe.is_empty() {
                *totals
                    .entry((ItemType::Product, item.product_id.clone()))
                    .or_default() += item.quantity as f64;
                continue;
            }

            for entry in &recipe {
                let ingredient = catalog
                    .get_ingredient(&entry.ingredient_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Ingredient", &entry.ingredient_id))?;
                let per_unit = convert(entry.quantity, entry.unit, ingredient.unit);
                *totals
                    .entry((ItemType::Ingredient, entry.ingredient_id.clone()))
                    .or_default() += per_unit * item.quantity as f64;
            }
        }

        Ok(totals
            .into_iter()
            .map(|((item_type, item_id), quantity)| BalanceChange {
                item_type,
                item_id,
                quantity_delta: -quantity,
                unit_cost: None,
            })
            .collect())
    }

    /// A guarded draft write that matched no row means the order left the
    /// draft state under us.
    fn draft_conflict(&self, order: &Order, err: DbError) -> EngineError {
        match err {
            DbError::NotFound { .. } => StateConflict::ConcurrentModification {
                id: order.id.clone(),
            }
            .into(),
            other => other.into(),
        }
    }
}

/// Checks the current status against the one a transition requires,
/// distinguishing "already there" from "illegal from here".
fn require_status(order: &Order, required: OrderStatus, action: &str) -> EngineResult<()> {
    if order.status == required {
        return Ok(());
    }

    let already_target = matches!(
        (action, order.status),
        ("pay", OrderStatus::Paid) | ("complete", OrderStatus::Completed)
    );
    let conflict = if already_target {
        StateConflict::AlreadyInState {
            entity: "Order".to_string(),
            id: order.id.clone(),
            status: order.status.to_string(),
        }
    } else {
        StateConflict::IllegalTransition {
            entity: "Order".to_string(),
            id: order.id.clone(),
            current: order.status.to_string(),
            action: action.to_string(),
        }
    };
    Err(conflict.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loyalty::NoopLoyalty;
    use mesa_db::{DbConfig, ProductInput};

    async fn setup() -> (Database, OrderService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        let service = OrderService::new(
            db.clone(),
            EngineConfig::new(wh.id),
            Arc::new(NoopLoyalty),
        );
        (db, service)
    }

    async fn simple_product(db: &Database, name: &str, price: i64) -> String {
        db.catalog()
            .create_product(&ProductInput {
                name: name.to_string(),
                category_id: Some("coffee".to_string()),
                base_price_cents: price,
                price_cents: price,
                discount_kind: None,
                discount_value: None,
            })
            .await
            .unwrap()
            .id
    }

    fn one_line(product_id: &str, quantity: i64) -> OrderItemsRequest {
        OrderItemsRequest {
            items: vec![OrderItemRequest {
                product_id: product_id.to_string(),
                quantity,
                modifiers: None,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_reuses_existing_draft() {
        let (_db, service) = setup().await;

        let first = service.start("reg-1", "cash-1", None).await.unwrap();
        let second = service.start("reg-1", "cash-1", None).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = service.start("reg-2", "cash-1", None).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_set_items_computes_totals() {
        let (db, service) = setup().await;
        let product = simple_product(&db, "Latte", 450).await;

        let order = service.start("reg-1", "cash-1", None).await.unwrap();
        let order = service.set_items(&order.id, one_line(&product, 2)).await.unwrap();

        assert_eq!(order.subtotal_cents, 900);
        assert_eq!(order.total_cents, 900);
    }

    #[tokio::test]
    async fn test_zero_quantity_drops_the_line() {
        let (db, service) = setup().await;
        let product = simple_product(&db, "Latte", 450).await;

        let order = service.start("reg-1", "cash-1", None).await.unwrap();
        let order = service.set_items(&order.id, one_line(&product, 0)).await.unwrap();

        assert_eq!(order.subtotal_cents, 0);
        assert!(db.orders().get_items(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pay_validations() {
        let (db, service) = setup().await;
        let product = simple_product(&db, "Latte", 450).await;
        let order = service.start("reg-1", "cash-1", None).await.unwrap();

        // empty order cannot be paid
        let err = service
            .pay(
                &order.id,
                PaymentRequest {
                    method: PaymentMethod::Cash,
                    amount_cents: 500,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        service.set_items(&order.id, one_line(&product, 1)).await.unwrap();

        // underpayment rejected
        let err = service
            .pay(
                &order.id,
                PaymentRequest {
                    method: PaymentMethod::Cash,
                    amount_cents: 400,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cash_change_and_card_exact() {
        let (db, service) = setup().await;
        let product = simple_product(&db, "Latte", 450).await;

        let order = service.start("reg-1", "cash-1", None).await.unwrap();
        service.set_items(&order.id, one_line(&product, 1)).await.unwrap();
        let paid = service
            .pay(
                &order.id,
                PaymentRequest {
                    method: PaymentMethod::Cash,
                    amount_cents: 500,
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.change_cents, Some(50));

        let order2 = service.start("reg-2", "cash-1", None).await.unwrap();
        service.set_items(&order2.id, one_line(&product, 1)).await.unwrap();
        let paid2 = service
            .pay(
                &order2.id,
                PaymentRequest {
                    method: PaymentMethod::Card,
                    amount_cents: 450,
                },
            )
            .await
            .unwrap();
        assert_eq!(paid2.change_cents, Some(0));
    }

    #[tokio::test]
    async fn test_state_machine_rejections() {
        let (db, service) = setup().await;
        let product = simple_product(&db, "Latte", 450).await;

        let order = service.start("reg-1", "cash-1", None).await.unwrap();
        service.set_items(&order.id, one_line(&product, 1)).await.unwrap();

        // complete before pay is an illegal transition
        let err = service.complete(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict(StateConflict::IllegalTransition { .. })
        ));

        service
            .pay(
                &order.id,
                PaymentRequest {
                    method: PaymentMethod::Card,
                    amount_cents: 450,
                },
            )
            .await
            .unwrap();

        // paying again: already in the target state
        let err = service
            .pay(
                &order.id,
                PaymentRequest {
                    method: PaymentMethod::Card,
                    amount_cents: 450,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict(StateConflict::AlreadyInState { .. })
        ));

        // cancel after payment is forbidden
        let err = service.cancel(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict(StateConflict::IllegalTransition { .. })
        ));

        // items are frozen after payment
        let err = service
            .set_items(&order.id, one_line(&product, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_deletes_draft() {
        let (db, service) = setup().await;

        let order = service.start("reg-1", "cash-1", None).await.unwrap();
        service.cancel(&order.id).await.unwrap();
        assert!(db.orders().get_by_id(&order.id).await.unwrap().is_none());

        // the register gets a fresh draft afterwards
        let fresh = service.start("reg-1", "cash-1", None).await.unwrap();
        assert_ne!(fresh.id, order.id);
    }
}
