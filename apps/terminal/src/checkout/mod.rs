//! # Checkout
//!
//! Turns a frozen cart into a committed checkout, or into nothing at all.
//!
//! ```text
//! checkout/
//! ├── mod.rs         ◄─── CheckoutError, CheckoutOutcome
//! ├── finalizer.rs   ◄─── re-check → settle → commit (with one retry)
//! └── settlement.rs  ◄─── Settlement trait, InstantSettlement
//! ```

mod finalizer;
mod settlement;

pub use finalizer::CheckoutFinalizer;
pub use settlement::{
    InstantSettlement, Settlement, SettlementError, SettlementReceipt, SettlementRequest,
};

use serde::Serialize;
use thiserror::Error;

use lumina_core::cart::CartLineView;
use lumina_core::{CheckoutRecord, DenialReason, Denied};
use lumina_db::DbError;

/// Why a checkout did not complete.
///
/// Every variant leaves the ledger exactly as it was.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    /// finalize() called while the session is already processing.
    #[error("A checkout is already processing for this session")]
    AlreadyProcessing,

    /// The whole-cart re-check refused the sale.
    #[error("{0}")]
    Denied(#[from] Denied),

    /// The commit lost a race for `resource`, and so did its retry.
    ///
    /// `reasons` is the retry's denial list when the re-check itself
    /// refused; empty when the second commit conflicted too.
    #[error("Stock for {resource} was taken by another checkout")]
    CommitConflict {
        resource: String,
        reasons: Vec<DenialReason>,
    },

    #[error("{0}")]
    Settlement(#[from] SettlementError),

    #[error("Checkout cancelled")]
    Cancelled,

    #[error("Settlement timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    /// A cart line's product has disappeared from the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("{0}")]
    Database(#[from] DbError),
}

impl CheckoutError {
    /// Blocking resources reported with this error.
    pub fn denials(&self) -> &[DenialReason] {
        match self {
            CheckoutError::Denied(denied) => &denied.reasons,
            CheckoutError::CommitConflict { reasons, .. } => reasons,
            _ => &[],
        }
    }
}

/// A completed checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub record: CheckoutRecord,
    pub lines: Vec<CartLineView>,
    /// Commit attempts, 2 when the first lost a race and the retry won.
    pub attempts: u32,
}
