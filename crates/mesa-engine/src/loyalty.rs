//! # Loyalty Collaborator
//!
//! Trait seam for the loyalty program. The order service calls it after a
//! successful payment, best-effort:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay() ──► status flip + stock deduction (transactional, must succeed)  │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          loyalty.accrue()  ── bounded by EngineConfig.loyalty_timeout   │
//! │              │                                                          │
//! │        error or timeout ──► warn! and move on; the payment stands       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use mesa_core::Money;

/// Points credited by a successful accrual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsEarned {
    pub points: i64,
}

/// Loyalty call failures. Only ever logged.
#[derive(Debug, Error)]
pub enum LoyaltyError {
    #[error("loyalty provider unavailable: {0}")]
    Unavailable(String),

    #[error("unknown customer: {0}")]
    UnknownCustomer(String),
}

/// The loyalty program seam.
#[async_trait]
pub trait Loyalty: Send + Sync {
    /// Credits points for a paid order.
    async fn accrue(
        &self,
        customer_id: &str,
        order_id: &str,
        total: Money,
    ) -> Result<PointsEarned, LoyaltyError>;
}

/// A loyalty program that does nothing. Default when no provider is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoyalty;

#[async_trait]
impl Loyalty for NoopLoyalty {
    async fn accrue(
        &self,
        _customer_id: &str,
        _order_id: &str,
        _total: Money,
    ) -> Result<PointsEarned, LoyaltyError> {
        Ok(PointsEarned { points: 0 })
    }
}

/// Runs an accrual with a timeout, swallowing every failure mode.
pub(crate) async fn accrue_best_effort(
    loyalty: &dyn Loyalty,
    timeout: Duration,
    customer_id: &str,
    order_id: &str,
    total: Money,
) -> Option<PointsEarned> {
    match tokio::time::timeout(timeout, loyalty.accrue(customer_id, order_id, total)).await {
        Ok(Ok(earned)) => Some(earned),
        Ok(Err(e)) => {
            warn!(order_id, customer_id, error = %e, "Loyalty accrual failed");
            None
        }
        Err(_) => {
            warn!(order_id, customer_id, timeout_ms = timeout.as_millis() as u64, "Loyalty accrual timed out");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLoyalty;

    #[async_trait]
    impl Loyalty for FailingLoyalty {
        async fn accrue(
            &self,
            _customer_id: &str,
            _order_id: &str,
            _total: Money,
        ) -> Result<PointsEarned, LoyaltyError> {
            Err(LoyaltyError::Unavailable("down".to_string()))
        }
    }

    struct SlowLoyalty;

    #[async_trait]
    impl Loyalty for SlowLoyalty {
        async fn accrue(
            &self,
            _customer_id: &str,
            _order_id: &str,
            _total: Money,
        ) -> Result<PointsEarned, LoyaltyError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(PointsEarned { points: 1 })
        }
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let result = accrue_best_effort(
            &FailingLoyalty,
            Duration::from_secs(1),
            "c-1",
            "o-1",
            Money::from_cents(900),
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_swallowed() {
        let result = accrue_best_effort(
            &SlowLoyalty,
            Duration::from_millis(50),
            "c-1",
            "o-1",
            Money::from_cents(900),
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_noop_succeeds() {
        let result = accrue_best_effort(
            &NoopLoyalty,
            Duration::from_secs(1),
            "c-1",
            "o-1",
            Money::from_cents(900),
        )
        .await;
        assert_eq!(result, Some(PointsEarned { points: 0 }));
    }
}
