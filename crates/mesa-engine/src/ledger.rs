//! # Inventory Ledger Service
//!
//! Orchestrates stock receipt documents against balances.
//!
//! ## Reverse-Then-Reapply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREATE                                                                 │
//! │    insert document + lines                                              │
//! │    compute effect (per-line delta, folded cost)                         │
//! │    apply: record effect rows + move balances (one transaction)          │
//! │                                                                         │
//! │  EDIT                                                                   │
//! │    reject if locked behind an audit                                     │
//! │    reverse the STORED effect (inverse deltas, unfolded costs)           │
//! │    replace header + lines                                               │
//! │    apply the new effect                                                 │
//! │                                                                         │
//! │  DELETE                                                                 │
//! │    reject if locked behind an audit                                     │
//! │    reverse the stored effect, then drop the document                    │
//! │                                                                         │
//! │  Reversal always replays the stored effect. The current line list is    │
//! │  never trusted for it: after an edit the lines no longer describe what  │
//! │  was originally applied.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every apply and reverse ends with the costing cascade for the touched
//! items.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::costing::CostingService;
use crate::error::{EngineError, EngineResult};
use mesa_core::costing::{fold_lot, unfold_lot};
use mesa_core::validation::{
    validate_counted_quantity, validate_stock_quantity, validate_unit_cost,
};
use mesa_core::{
    ItemType, ReceiptEffect, ReceiptKind, ReceiptLine, StateConflict, StockReceipt,
    ValidationError,
};
use mesa_db::{BalanceChange, Database};

// =============================================================================
// Request DTOs
// =============================================================================

/// One line of a receipt request. Quantities are in the item's canonical
/// unit; for recounts the quantity is the absolute counted value.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptLineRequest {
    pub item_type: ItemType,
    pub item_id: String,
    pub quantity: f64,
    /// Incoming lot cost per unit. Meaningful for goods-in only.
    pub unit_cost: Option<f64>,
}

/// A request to create a stock receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRequest {
    pub kind: ReceiptKind,
    pub warehouse_id: String,
    pub supplier_id: Option<String>,
    /// Defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
    pub lines: Vec<ReceiptLineRequest>,
}

/// A request to edit an existing receipt. The kind and warehouse are
/// fixed at creation.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptUpdateRequest {
    pub supplier_id: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub lines: Vec<ReceiptLineRequest>,
}

// =============================================================================
// Service
// =============================================================================

/// Service that owns receipt apply/reverse orchestration.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    costing: CostingService,
}

impl LedgerService {
    /// Creates a new LedgerService.
    pub fn new(db: Database) -> Self {
        let costing = CostingService::new(db.clone());
        LedgerService { db, costing }
    }

    /// Creates a receipt, applies its effect, and runs the costing cascade.
    pub async fn create_receipt(&self, request: ReceiptRequest) -> EngineResult<StockReceipt> {
        validate_lines(request.kind, &request.lines)?;

        self.db
            .warehouses()
            .get_by_id(&request.warehouse_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Warehouse", &request.warehouse_id))?;

        let now = Utc::now();
        let receipt = StockReceipt {
            id: Uuid::new_v4().to_string(),
            kind: request.kind,
            warehouse_id: request.warehouse_id.clone(),
            supplier_id: request.supplier_id.clone(),
            occurred_at: request.occurred_at.unwrap_or(now),
            created_at: now,
        };
        let lines = materialize_lines(&receipt.id, &request.lines);

        self.db.receipts().create(&receipt, &lines).await?;
        let touched = self.apply(&receipt, &lines).await?;
        self.costing.recalculate_for_items(&touched).await?;

        info!(id = %receipt.id, kind = %receipt.kind, lines = lines.len(), "Receipt applied");
        Ok(receipt)
    }

    /// Edits a receipt: reverse the stored effect, replace the document,
    /// apply the new effect.
    pub async fn update_receipt(
        &self,
        receipt_id: &str,
        request: ReceiptUpdateRequest,
    ) -> EngineResult<StockReceipt> {
        let receipt = self.get_checked(receipt_id).await?;
        validate_lines(receipt.kind, &request.lines)?;

        let occurred_at = request.occurred_at.unwrap_or(receipt.occurred_at);
        self.check_lock(&receipt.warehouse_id, receipt_id, receipt.occurred_at)
            .await?;
        self.check_lock(&receipt.warehouse_id, receipt_id, occurred_at)
            .await?;

        let mut touched = self.reverse(&receipt).await?;

        self.db
            .receipts()
            .update_header(receipt_id, request.supplier_id.as_deref(), occurred_at)
            .await?;
        let lines = materialize_lines(receipt_id, &request.lines);
        self.db.receipts().replace_lines(receipt_id, &lines).await?;

        let updated = StockReceipt {
            supplier_id: request.supplier_id,
            occurred_at,
            ..receipt
        };
        touched.extend(self.apply(&updated, &lines).await?);
        let mut seen = std::collections::HashSet::new();
        touched.retain(|item| seen.insert(item.clone()));
        self.costing.recalculate_for_items(&touched).await?;

        info!(id = %receipt_id, "Receipt edited and reapplied");
        Ok(updated)
    }

    /// Deletes a receipt after reversing its stored effect.
    pub async fn delete_receipt(&self, receipt_id: &str) -> EngineResult<()> {
        let receipt = self.get_checked(receipt_id).await?;
        self.check_lock(&receipt.warehouse_id, receipt_id, receipt.occurred_at)
            .await?;

        let touched = self.reverse(&receipt).await?;
        self.db.receipts().delete(receipt_id).await?;
        self.costing.recalculate_for_items(&touched).await?;

        info!(id = %receipt_id, "Receipt reversed and deleted");
        Ok(())
    }

    /// Ad-hoc correction: a positive delta becomes a one-line goods-in
    /// (uncosted), a negative delta a one-line write-off.
    pub async fn adjust(
        &self,
        warehouse_id: &str,
        item_type: ItemType,
        item_id: &str,
        delta: f64,
    ) -> EngineResult<StockReceipt> {
        if delta == 0.0 || !delta.is_finite() {
            return Err(ValidationError::MustBePositive {
                field: "delta".to_string(),
            }
            .into());
        }

        let (kind, quantity) = if delta > 0.0 {
            (ReceiptKind::Receipt, delta)
        } else {
            (ReceiptKind::WriteOff, -delta)
        };

        self.create_receipt(ReceiptRequest {
            kind,
            warehouse_id: warehouse_id.to_string(),
            supplier_id: None,
            occurred_at: None,
            lines: vec![ReceiptLineRequest {
                item_type,
                item_id: item_id.to_string(),
                quantity,
                unit_cost: None,
            }],
        })
        .await
    }

    /// Gets a receipt with its lines.
    pub async fn get_receipt(&self, receipt_id: &str) -> EngineResult<(StockReceipt, Vec<ReceiptLine>)> {
        let receipt = self.get_checked(receipt_id).await?;
        let lines = self.db.receipts().get_lines(receipt_id).await?;
        Ok((receipt, lines))
    }

    /// Lists receipts for a warehouse, newest first.
    pub async fn list_receipts(&self, warehouse_id: &str) -> EngineResult<Vec<StockReceipt>> {
        Ok(self.db.receipts().list_for_warehouse(warehouse_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn get_checked(&self, receipt_id: &str) -> EngineResult<StockReceipt> {
        self.db
            .receipts()
            .get_by_id(receipt_id)
            .await?
            .ok_or_else(|| EngineError::not_found("StockReceipt", receipt_id))
    }

    /// Rejects edits/deletes of receipts dated on/before the warehouse's
    /// latest audit.
    async fn check_lock(
        &self,
        warehouse_id: &str,
        receipt_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let Some(boundary) = self.db.audits().latest_audit_at(warehouse_id).await? {
            if occurred_at <= boundary {
                return Err(StateConflict::ReceiptLocked {
                    receipt_id: receipt_id.to_string(),
                    locked_at: boundary,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Computes and applies a receipt's effect. Returns the touched items
    /// for the costing cascade.
    async fn apply(
        &self,
        receipt: &StockReceipt,
        lines: &[ReceiptLine],
    ) -> EngineResult<Vec<(ItemType, String)>> {
        let inventory = self.db.inventory();
        let mut effects = Vec::with_capacity(lines.len());
        let mut changes = Vec::with_capacity(lines.len());
        let mut touched = Vec::with_capacity(lines.len());

        for line in lines {
            let current = inventory
                .get(&receipt.warehouse_id, line.item_type, &line.item_id)
                .await?;
            let (current_qty, current_cost) = current
                .map(|c| (c.quantity, c.unit_cost))
                .unwrap_or((0.0, None));

            let (delta, effect_cost, new_cost) = match receipt.kind {
                ReceiptKind::Receipt => {
                    let new_cost = line
                        .unit_cost
                        .map(|lot| fold_lot(current_qty, current_cost, line.quantity, lot));
                    (line.quantity, line.unit_cost, new_cost)
                }
                ReceiptKind::WriteOff => (-line.quantity, None, None),
                ReceiptKind::Recount => (line.quantity - current_qty, None, None),
            };

            effects.push(ReceiptEffect {
                receipt_id: receipt.id.clone(),
                item_type: line.item_type,
                item_id: line.item_id.clone(),
                quantity_delta: delta,
                unit_cost: effect_cost,
            });
            changes.push(BalanceChange {
                item_type: line.item_type,
                item_id: line.item_id.clone(),
                quantity_delta: delta,
                unit_cost: new_cost,
            });
            touched.push((line.item_type, line.item_id.clone()));
        }

        self.db
            .receipts()
            .apply(&receipt.warehouse_id, &effects, &changes)
            .await?;
        Ok(touched)
    }

    /// Replays the inverse of a receipt's stored effect against the
    /// balances and drops the effect rows.
    async fn reverse(&self, receipt: &StockReceipt) -> EngineResult<Vec<(ItemType, String)>> {
        let effects = self.db.receipts().get_effects(&receipt.id).await?;
        let inventory = self.db.inventory();
        let mut changes = Vec::with_capacity(effects.len());
        let mut touched = Vec::with_capacity(effects.len());

        for effect in &effects {
            // Unfold the moving average for costed goods-in effects. When
            // the inversion is degenerate the current cost stays.
            let restored_cost = match effect.unit_cost {
                Some(lot_cost) => {
                    let current = inventory
                        .get(&receipt.warehouse_id, effect.item_type, &effect.item_id)
                        .await?;
                    current.and_then(|c| {
                        c.unit_cost.and_then(|cost_after| {
                            unfold_lot(c.quantity, cost_after, effect.quantity_delta, lot_cost)
                        })
                    })
                }
                None => None,
            };

            changes.push(BalanceChange {
                item_type: effect.item_type,
                item_id: effect.item_id.clone(),
                quantity_delta: -effect.quantity_delta,
                unit_cost: restored_cost,
            });
            touched.push((effect.item_type, effect.item_id.clone()));
        }

        self.db
            .receipts()
            .reverse(&receipt.id, &receipt.warehouse_id, &changes)
            .await?;
        Ok(touched)
    }
}

fn validate_lines(kind: ReceiptKind, lines: &[ReceiptLineRequest]) -> EngineResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        }
        .into());
    }
    for line in lines {
        match kind {
            ReceiptKind::Recount => validate_counted_quantity(line.quantity)?,
            _ => validate_stock_quantity(line.quantity)?,
        }
        validate_unit_cost(line.unit_cost)?;
    }
    Ok(())
}

fn materialize_lines(receipt_id: &str, requests: &[ReceiptLineRequest]) -> Vec<ReceiptLine> {
    requests
        .iter()
        .map(|r| ReceiptLine {
            receipt_id: receipt_id.to_string(),
            item_type: r.item_type,
            item_id: r.item_id.clone(),
            quantity: r.quantity,
            unit_cost: r.unit_cost.map(mesa_core::money::round_rate),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mesa_core::InventoryAudit;
    use mesa_db::DbConfig;

    async fn setup() -> (Database, LedgerService, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        let service = LedgerService::new(db.clone());
        (db, service, wh.id)
    }

    fn goods_in(wh: &str, item_id: &str, qty: f64, cost: f64) -> ReceiptRequest {
        ReceiptRequest {
            kind: ReceiptKind::Receipt,
            warehouse_id: wh.to_string(),
            supplier_id: None,
            occurred_at: None,
            lines: vec![ReceiptLineRequest {
                item_type: ItemType::Ingredient,
                item_id: item_id.to_string(),
                quantity: qty,
                unit_cost: Some(cost),
            }],
        }
    }

    async fn balance(db: &Database, wh: &str, item_id: &str) -> (f64, Option<f64>) {
        db.inventory()
            .get(wh, ItemType::Ingredient, item_id)
            .await
            .unwrap()
            .map(|b| (b.quantity, b.unit_cost))
            .unwrap_or((0.0, None))
    }

    #[tokio::test]
    async fn test_goods_in_folds_moving_average() {
        let (db, service, wh) = setup().await;

        service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();
        service.create_receipt(goods_in(&wh, "beans", 5.0, 5.0)).await.unwrap();

        let (qty, cost) = balance(&db, &wh, "beans").await;
        assert!((qty - 15.0).abs() < 1e-9);
        assert_eq!(cost, Some(3.0));
    }

    #[tokio::test]
    async fn test_write_off_leaves_cost_basis() {
        let (db, service, wh) = setup().await;
        service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();

        service
            .create_receipt(ReceiptRequest {
                kind: ReceiptKind::WriteOff,
                warehouse_id: wh.clone(),
                supplier_id: None,
                occurred_at: None,
                lines: vec![ReceiptLineRequest {
                    item_type: ItemType::Ingredient,
                    item_id: "beans".to_string(),
                    quantity: 4.0,
                    unit_cost: None,
                }],
            })
            .await
            .unwrap();

        let (qty, cost) = balance(&db, &wh, "beans").await;
        assert!((qty - 6.0).abs() < 1e-9);
        assert_eq!(cost, Some(2.0));
    }

    #[tokio::test]
    async fn test_recount_applies_counted_minus_previous() {
        let (db, service, wh) = setup().await;
        service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();

        let receipt = service
            .create_receipt(ReceiptRequest {
                kind: ReceiptKind::Recount,
                warehouse_id: wh.clone(),
                supplier_id: None,
                occurred_at: None,
                lines: vec![ReceiptLineRequest {
                    item_type: ItemType::Ingredient,
                    item_id: "beans".to_string(),
                    quantity: 7.5,
                    unit_cost: None,
                }],
            })
            .await
            .unwrap();

        let (qty, _) = balance(&db, &wh, "beans").await;
        assert!((qty - 7.5).abs() < 1e-9);

        // the stored effect is the delta, not the counted value
        let effects = db.receipts().get_effects(&receipt.id).await.unwrap();
        assert!((effects[0].quantity_delta + 2.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_edit_is_idempotent_on_balances() {
        let (db, service, wh) = setup().await;
        let receipt = service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();

        // edit to 6 units; balance must reflect only the new lines
        service
            .update_receipt(
                &receipt.id,
                ReceiptUpdateRequest {
                    supplier_id: None,
                    occurred_at: None,
                    lines: vec![ReceiptLineRequest {
                        item_type: ItemType::Ingredient,
                        item_id: "beans".to_string(),
                        quantity: 6.0,
                        unit_cost: Some(2.0),
                    }],
                },
            )
            .await
            .unwrap();

        let (qty, cost) = balance(&db, &wh, "beans").await;
        assert!((qty - 6.0).abs() < 1e-9);
        assert_eq!(cost, Some(2.0));
    }

    #[tokio::test]
    async fn test_delete_restores_prior_state() {
        let (db, service, wh) = setup().await;
        service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();
        let second = service.create_receipt(goods_in(&wh, "beans", 5.0, 5.0)).await.unwrap();

        service.delete_receipt(&second.id).await.unwrap();

        let (qty, cost) = balance(&db, &wh, "beans").await;
        assert!((qty - 10.0).abs() < 1e-9);
        // moving average unfolded back to the first lot's cost
        assert_eq!(cost, Some(2.0));
    }

    #[tokio::test]
    async fn test_audit_locks_earlier_receipts() {
        let (db, service, wh) = setup().await;
        let receipt = service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();

        let audit = InventoryAudit {
            id: uuid::Uuid::new_v4().to_string(),
            warehouse_id: wh.clone(),
            performed_by: "user-1".to_string(),
            performed_at: Utc::now() + Duration::seconds(5),
            total_loss_cents: 0,
            total_gain_cents: 0,
            created_at: Utc::now(),
        };
        db.audits().create(&audit, &[]).await.unwrap();

        let err = service.delete_receipt(&receipt.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict(StateConflict::ReceiptLocked { .. })
        ));

        let err = service
            .update_receipt(
                &receipt.id,
                ReceiptUpdateRequest {
                    supplier_id: None,
                    occurred_at: None,
                    lines: vec![ReceiptLineRequest {
                        item_type: ItemType::Ingredient,
                        item_id: "beans".to_string(),
                        quantity: 1.0,
                        unit_cost: None,
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict(StateConflict::ReceiptLocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_helper_routes_through_receipts() {
        let (db, service, wh) = setup().await;
        service.create_receipt(goods_in(&wh, "beans", 10.0, 2.0)).await.unwrap();

        service
            .adjust(&wh, ItemType::Ingredient, "beans", -3.0)
            .await
            .unwrap();
        let (qty, _) = balance(&db, &wh, "beans").await;
        assert!((qty - 7.0).abs() < 1e-9);

        service
            .adjust(&wh, ItemType::Ingredient, "beans", 1.0)
            .await
            .unwrap();
        let (qty, cost) = balance(&db, &wh, "beans").await;
        assert!((qty - 8.0).abs() < 1e-9);
        // uncosted adjustment leaves the average alone
        assert_eq!(cost, Some(2.0));
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_lines() {
        let (_db, service, wh) = setup().await;

        let err = service.create_receipt(goods_in(&wh, "beans", -1.0, 2.0)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = service
            .create_receipt(ReceiptRequest {
                kind: ReceiptKind::Receipt,
                warehouse_id: wh.clone(),
                supplier_id: None,
                occurred_at: None,
                lines: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
