//! # Error Types
//!
//! Domain-specific error types for lumina-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lumina-core errors (this file)                                         │
//! │  ├── DenialReason     - One blocking resource (stock, material, config) │
//! │  ├── Denied           - Every blocking resource for one request         │
//! │  ├── CoreError        - General domain errors                           │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  lumina-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, incl. StockConflict          │
//! │                                                                         │
//! │  lumina-terminal errors (in app)                                        │
//! │  ├── CheckoutError    - Finalizer outcome                               │
//! │  └── ApiError         - What the operator sees (serialized)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Denials Accumulate
//! A cart that is short on hose AND acrylic must report both, so the
//! availability checker never stops at the first problem. [`Denied`] carries
//! the full ordered list.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::CheckoutPhase;

// =============================================================================
// Denials
// =============================================================================

/// A single resource that blocks a sale.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// More finished units requested than are on hand.
    #[error(
        "Finished stock exceeded for {product_id}: requested {requested}, available {available} (short {shortfall})"
    )]
    FinishedStockExceeded {
        product_id: String,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    /// A raw material cannot cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Add "Neón Flex Pro 5m" (10th unit)
    ///      │
    ///      ▼
    /// needs 5 m × 10 = 50 m of INS-001, ledger has 45 m
    ///      │
    ///      ▼
    /// MaterialShortage { INS-001, needed: 50, available: 45 }
    /// ```
    #[error("Material shortage for {material_id}: needed {needed}, available {available}")]
    MaterialShortage {
        material_id: String,
        needed: Quantity,
        available: Quantity,
    },

    /// The product's bill of materials names a material the ledger does not
    /// know. Bad seed data, not a stock problem; the product is unsellable
    /// until the catalog is fixed.
    #[error("Product {product_id} references unknown material {material_id}")]
    ConfigurationError {
        product_id: String,
        material_id: String,
    },
}

impl DenialReason {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, DenialReason::ConfigurationError { .. })
    }

    /// Id of the blocking resource (product or material).
    pub fn resource_id(&self) -> &str {
        match self {
            DenialReason::FinishedStockExceeded { product_id, .. } => product_id,
            DenialReason::MaterialShortage { material_id, .. } => material_id,
            DenialReason::ConfigurationError { material_id, .. } => material_id,
        }
    }
}

/// Every reason a request was refused, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denied {
    pub reasons: Vec<DenialReason>,
}

impl Denied {
    pub fn new(reasons: Vec<DenialReason>) -> Self {
        Denied { reasons }
    }

    /// Configuration problems hiding in the list, if any.
    pub fn configuration_errors(&self) -> impl Iterator<Item = &DenialReason> {
        self.reasons.iter().filter(|r| r.is_configuration_error())
    }
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blocked by {} resource(s)", self.reasons.len())?;
        for reason in &self.reasons {
            write!(f, "; {}", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for Denied {}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is not in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The availability checker refused the request.
    #[error("{0}")]
    Denied(#[from] Denied),

    /// The cart is frozen while a checkout is processing.
    ///
    /// ## When This Occurs
    /// - Operator taps "+" while the payment is being settled
    /// - A second finalize() on the same session
    #[error("A checkout is in progress; the cart cannot change until it finishes")]
    CheckoutInProgress,

    /// Illegal checkout phase transition.
    #[error("Checkout cannot move from {from:?} to {to:?}")]
    InvalidCheckoutPhase {
        from: CheckoutPhase,
        to: CheckoutPhase,
    },

    /// Cart has reached its line limit.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Denial list carried by this error, empty for other variants.
    pub fn denials(&self) -> &[DenialReason] {
        match self {
            CoreError::Denied(denied) => &denied.reasons,
            _ => &[],
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. bad id characters, bad UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} '{value}' must be one of: {allowed:?}")]
    NotAllowed {
        field: String,
        allowed: Vec<String>,
        value: String,
    },

    /// Duplicate value (e.g. a material listed twice in one BOM).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_messages() {
        let reason = DenialReason::MaterialShortage {
            material_id: "INS-001".to_string(),
            needed: Quantity::from_units(50),
            available: Quantity::from_units(45),
        };
        assert_eq!(
            reason.to_string(),
            "Material shortage for INS-001: needed 50, available 45"
        );

        let reason = DenialReason::FinishedStockExceeded {
            product_id: "POS-LX-006".to_string(),
            requested: 1,
            available: 0,
            shortfall: 1,
        };
        assert_eq!(
            reason.to_string(),
            "Finished stock exceeded for POS-LX-006: requested 1, available 0 (short 1)"
        );
    }

    #[test]
    fn test_denied_lists_every_reason() {
        let denied = Denied::new(vec![
            DenialReason::MaterialShortage {
                material_id: "INS-001".to_string(),
                needed: Quantity::from_units(6),
                available: Quantity::from_units(5),
            },
            DenialReason::ConfigurationError {
                product_id: "POS-LX-009".to_string(),
                material_id: "INS-404".to_string(),
            },
        ]);

        let message = denied.to_string();
        assert!(message.starts_with("Blocked by 2 resource(s)"));
        assert!(message.contains("INS-001"));
        assert!(message.contains("INS-404"));
        assert_eq!(denied.configuration_errors().count(), 1);
    }

    #[test]
    fn test_denial_serializes_with_kind_tag() {
        let reason = DenialReason::ConfigurationError {
            product_id: "P".to_string(),
            material_id: "M".to_string(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "configuration_error");
        assert_eq!(reason.resource_id(), "M");
    }

    #[test]
    fn test_denied_converts_to_core_error() {
        let core: CoreError = Denied::new(vec![]).into();
        assert!(matches!(core, CoreError::Denied(_)));
        assert!(core.denials().is_empty());
    }
}
