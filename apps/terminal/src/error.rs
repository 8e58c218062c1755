//! # API Error Type
//!
//! Unified error type for terminal commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Lumina Terminal                        │
//! │                                                                         │
//! │  "add POS-LX-001"                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  Command Function  → Result<T, ApiError>                         │   │
//! │  │                                                                  │   │
//! │  │  DbError        ──┐                                              │   │
//! │  │  CoreError      ──┼──► ApiError { code, message, denials } ────► │   │
//! │  │  CheckoutError  ──┘                                              │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  stdout:                                                                │
//! │  {"ok":false,"error":{"code":"INSUFFICIENT_STOCK",                      │
//! │    "message":"Blocked by 1 resource(s); ...",                           │
//! │    "denials":[{"kind":"material_shortage","material_id":"INS-001",...}]}}│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Denials always carry every blocking resource, never only the first.

use serde::Serialize;
use tracing::error;

use crate::checkout::CheckoutError;
use lumina_core::{CoreError, DenialReason};
use lumina_db::DbError;

/// Error printed for a failed command.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Every resource that blocked the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub denials: Vec<DenialReason>,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    DatabaseError,

    /// Unknown or malformed command
    BadCommand,

    Internal,

    /// Cart operation failed
    CartError,

    /// Finished stock or materials cannot cover the request
    InsufficientStock,

    /// The catalog references a material the ledger does not have
    ConfigurationError,

    /// The cart is frozen by a running checkout
    CheckoutInProgress,

    /// Another checkout took the stock first
    StockConflict,

    /// Payment processing error
    PaymentError,

    /// Checkout abandoned or timed out
    CheckoutAborted,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            denials: Vec::new(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn bad_command(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadCommand, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// A denial with its full reason list.
    ///
    /// Any configuration error in the list is bad catalog data: logged at
    /// error level, and the code says so.
    fn denied(message: String, denials: Vec<DenialReason>) -> Self {
        let mut code = ErrorCode::InsufficientStock;
        for reason in denials.iter().filter(|r| r.is_configuration_error()) {
            if let DenialReason::ConfigurationError {
                product_id,
                material_id,
            } = reason
            {
                error!(
                    product_id = %product_id,
                    material_id = %material_id,
                    "Product references a material missing from the ledger"
                );
            }
            code = ErrorCode::ConfigurationError;
        }

        ApiError {
            code,
            message,
            denials,
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::StockConflict { resource, .. } => ApiError::new(
                ErrorCode::StockConflict,
                format!("Stock for {} was taken by another checkout", resource),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::InvalidSeed(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Invalid seed data: {}", e))
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::Denied(denied) => ApiError::denied(message, denied.reasons),
            CoreError::CheckoutInProgress => ApiError::new(ErrorCode::CheckoutInProgress, message),
            CoreError::InvalidCheckoutPhase { .. } => ApiError::internal(message),
            CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, message),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts checkout failures to API errors.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::EmptyCart => ApiError::new(ErrorCode::CartError, message),
            CheckoutError::AlreadyProcessing => {
                ApiError::new(ErrorCode::CheckoutInProgress, message)
            }
            CheckoutError::Denied(denied) => ApiError::denied(message, denied.reasons),
            CheckoutError::CommitConflict { reasons, .. } => ApiError {
                code: ErrorCode::StockConflict,
                message,
                denials: reasons,
            },
            CheckoutError::Settlement(_) => ApiError::new(ErrorCode::PaymentError, message),
            CheckoutError::Cancelled | CheckoutError::TimedOut { .. } => {
                ApiError::new(ErrorCode::CheckoutAborted, message)
            }
            CheckoutError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CheckoutError::Database(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_core::{Denied, Quantity};

    #[test]
    fn test_denial_keeps_every_reason() {
        let denied = Denied::new(vec![
            DenialReason::FinishedStockExceeded {
                product_id: "POS-LX-004".to_string(),
                requested: 4,
                available: 3,
                shortfall: 1,
            },
            DenialReason::MaterialShortage {
                material_id: "INS-001".to_string(),
                needed: Quantity::from_units(12),
                available: Quantity::from_units(9),
            },
        ]);

        let api: ApiError = CoreError::Denied(denied).into();
        assert_eq!(api.code, ErrorCode::InsufficientStock);
        assert_eq!(api.denials.len(), 2);

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["denials"][1]["kind"], "material_shortage");
    }

    #[test]
    fn test_configuration_error_code() {
        let denied = Denied::new(vec![DenialReason::ConfigurationError {
            product_id: "POS-LX-009".to_string(),
            material_id: "INS-404".to_string(),
        }]);

        let api: ApiError = CheckoutError::Denied(denied).into();
        assert_eq!(api.code, ErrorCode::ConfigurationError);
    }

    #[test]
    fn test_plain_errors_omit_denials() {
        let api: ApiError = CheckoutError::EmptyCart.into();
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "CART_ERROR");
        assert!(json.get("denials").is_none());

        let api: ApiError = CoreError::CheckoutInProgress.into();
        assert_eq!(api.code, ErrorCode::CheckoutInProgress);
        assert!(api.message.contains("in progress"));
    }

    #[test]
    fn test_stock_conflict_from_db() {
        let api: ApiError = DbError::stock_conflict("POS-LX-900", 1).into();
        assert_eq!(api.code, ErrorCode::StockConflict);
        assert!(api.message.contains("POS-LX-900"));
    }
}
