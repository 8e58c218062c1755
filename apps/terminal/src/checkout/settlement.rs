//! # Payment Settlement
//!
//! The finalizer settles the ticket total before it touches the ledger.
//! Providers implement [`Settlement`]; the terminal ships with
//! [`InstantSettlement`], which accepts every request immediately.
//!
//! A settle future that is dropped before it resolves (abort or timeout)
//! must leave nothing charged.

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tracing::debug;

use lumina_core::Money;

/// What to charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub checkout_id: String,
    pub amount: Money,
}

/// Proof of a settled payment, kept so it can be voided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub checkout_id: String,
    pub reference: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    /// The provider refused the payment.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The provider could not be reached.
    #[error("Settlement provider unavailable: {0}")]
    Unavailable(String),
}

/// A payment provider.
pub trait Settlement: Send + Sync {
    fn settle(
        &self,
        request: SettlementRequest,
    ) -> impl Future<Output = Result<SettlementReceipt, SettlementError>> + Send;

    /// Reverses a settled payment whose commit failed.
    fn void(
        &self,
        receipt: &SettlementReceipt,
    ) -> impl Future<Output = Result<(), SettlementError>> + Send;
}

/// Settles immediately with a reference derived from the checkout id.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantSettlement;

impl Settlement for InstantSettlement {
    async fn settle(&self, request: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
        debug!(checkout_id = %request.checkout_id, amount = request.amount.cents(), "Instant settlement");
        Ok(SettlementReceipt {
            reference: format!("instant-{}", request.checkout_id),
            checkout_id: request.checkout_id,
            amount: request.amount,
        })
    }

    async fn void(&self, receipt: &SettlementReceipt) -> Result<(), SettlementError> {
        debug!(reference = %receipt.reference, "Instant settlement voided");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_settlement_echoes_request() {
        let receipt = InstantSettlement
            .settle(SettlementRequest {
                checkout_id: "c-1".to_string(),
                amount: Money::from_cents(342_200),
            })
            .await
            .unwrap();

        assert_eq!(receipt.reference, "instant-c-1");
        assert_eq!(receipt.amount.cents(), 342_200);
        assert!(InstantSettlement.void(&receipt).await.is_ok());
    }
}
