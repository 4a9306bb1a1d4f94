//! # Engine Configuration
//!
//! Runtime knobs for the service layer. Resolved once at construction;
//! services never re-read configuration mid-operation.

use std::time::Duration;

use mesa_core::DEFAULT_LOCATION_ID;

/// Configuration for the order and ledger services.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Location this process serves. Single-location runtime for now.
    pub location_id: String,

    /// Warehouse orders consume stock from when none is named explicitly.
    pub default_warehouse_id: String,

    /// Upper bound on the loyalty accrual call. Payment never waits longer
    /// than this on the side effect.
    pub loyalty_timeout: Duration,
}

impl EngineConfig {
    /// Creates a configuration with the given default warehouse.
    pub fn new(default_warehouse_id: impl Into<String>) -> Self {
        EngineConfig {
            location_id: DEFAULT_LOCATION_ID.to_string(),
            default_warehouse_id: default_warehouse_id.into(),
            loyalty_timeout: Duration::from_secs(3),
        }
    }

    /// Sets the location ID.
    pub fn location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = location_id.into();
        self
    }

    /// Sets the loyalty call timeout.
    pub fn loyalty_timeout(mut self, timeout: Duration) -> Self {
        self.loyalty_timeout = timeout;
        self
    }
}
