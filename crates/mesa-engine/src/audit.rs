//! # Inventory Audit Service
//!
//! Turns a physical count into an immutable audit record: per-item
//! differences valued at the frozen unit cost, loss/gain totals, and the
//! balance overwrites the count implies. The audit's `performed_at` then
//! locks earlier ledger documents against edit (enforced in the ledger
//! service).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use mesa_core::audit::{build_audit_line, summarize};
use mesa_core::validation::validate_counted_quantity;
use mesa_core::{AuditLine, InventoryAudit, ItemType, ValidationError};
use mesa_db::Database;

// =============================================================================
// Request DTOs
// =============================================================================

/// One counted item.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditCountRequest {
    pub item_type: ItemType,
    pub item_id: String,
    pub counted_quantity: f64,
}

/// A request to record a stock count.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditRequest {
    pub warehouse_id: String,
    pub performed_by: String,
    /// Defaults to now. This becomes the ledger lock boundary.
    pub performed_at: Option<DateTime<Utc>>,
    pub counts: Vec<AuditCountRequest>,
}

// =============================================================================
// Service
// =============================================================================

/// Service for recording inventory audits.
#[derive(Debug, Clone)]
pub struct AuditService {
    db: Database,
}

impl AuditService {
    /// Creates a new AuditService.
    pub fn new(db: Database) -> Self {
        AuditService { db }
    }

    /// Records an audit: values each count against the current balance,
    /// overwrites the balances to the counted quantities, and persists the
    /// immutable record.
    pub async fn perform_audit(
        &self,
        request: AuditRequest,
    ) -> EngineResult<(InventoryAudit, Vec<AuditLine>)> {
        if request.counts.is_empty() {
            return Err(ValidationError::Required {
                field: "counts".to_string(),
            }
            .into());
        }
        for count in &request.counts {
            validate_counted_quantity(count.counted_quantity)?;
        }

        self.db
            .warehouses()
            .get_by_id(&request.warehouse_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Warehouse", &request.warehouse_id))?;

        let audit_id = Uuid::new_v4().to_string();
        let inventory = self.db.inventory();
        let mut lines = Vec::with_capacity(request.counts.len());

        for count in &request.counts {
            let current = inventory
                .get(&request.warehouse_id, count.item_type, &count.item_id)
                .await?;
            let (previous, unit_cost) = current
                .map(|c| (c.quantity, c.unit_cost))
                .unwrap_or((0.0, None));

            lines.push(build_audit_line(
                &audit_id,
                count.item_type,
                &count.item_id,
                previous,
                count.counted_quantity,
                unit_cost,
            ));
        }

        let (loss, gain) = summarize(&lines);
        let now = Utc::now();
        let audit = InventoryAudit {
            id: audit_id,
            warehouse_id: request.warehouse_id,
            performed_by: request.performed_by,
            performed_at: request.performed_at.unwrap_or(now),
            total_loss_cents: loss.cents(),
            total_gain_cents: gain.cents(),
            created_at: now,
        };

        self.db.audits().create(&audit, &lines).await?;
        info!(
            id = %audit.id,
            warehouse_id = %audit.warehouse_id,
            loss_cents = audit.total_loss_cents,
            gain_cents = audit.total_gain_cents,
            "Audit recorded"
        );

        Ok((audit, lines))
    }

    /// Gets an audit with its lines.
    pub async fn get_audit(&self, audit_id: &str) -> EngineResult<(InventoryAudit, Vec<AuditLine>)> {
        let audit = self
            .db
            .audits()
            .get_by_id(audit_id)
            .await?
            .ok_or_else(|| EngineError::not_found("InventoryAudit", audit_id))?;
        let lines = self.db.audits().get_lines(audit_id).await?;
        Ok((audit, lines))
    }

    /// Lists audits for a warehouse, newest first.
    pub async fn list_audits(&self, warehouse_id: &str) -> EngineResult<Vec<InventoryAudit>> {
        Ok(self.db.audits().list_for_warehouse(warehouse_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
