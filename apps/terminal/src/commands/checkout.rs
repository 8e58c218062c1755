//! # Checkout Commands
//!
//! Finalizing the cart and reading back completed checkouts.

use chrono::SecondsFormat;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info};

use crate::checkout::{CheckoutFinalizer, CheckoutOutcome, Settlement};
use crate::config::TerminalConfig;
use crate::error::ApiError;
use crate::state::CartState;
use lumina_core::validation::validate_uuid;
use lumina_core::{CheckoutLineRecord, CheckoutRecord, Money};
use lumina_db::Database;

/// Printed receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptResponse {
    pub checkout_id: String,
    pub store_name: String,
    pub timestamp: String,
    pub items: Vec<ReceiptItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub total_display: String,
    pub settlement_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl ReceiptResponse {
    fn new(
        record: CheckoutRecord,
        items: Vec<ReceiptItem>,
        config: &TerminalConfig,
    ) -> Self {
        ReceiptResponse {
            store_name: config.store_name.clone(),
            timestamp: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            total_display: config.format_currency(record.total),
            checkout_id: record.id,
            items,
            subtotal: record.subtotal,
            tax: record.tax,
            total: record.total,
            settlement_reference: record.settlement_reference,
        }
    }

    fn from_outcome(outcome: CheckoutOutcome, config: &TerminalConfig) -> Self {
        let items = outcome
            .lines
            .into_iter()
            .map(|l| ReceiptItem {
                product_id: l.product_id,
                name: l.name,
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_total: l.line_total,
            })
            .collect();
        ReceiptResponse::new(outcome.record, items, config)
    }

    fn from_history(
        record: CheckoutRecord,
        lines: Vec<CheckoutLineRecord>,
        config: &TerminalConfig,
    ) -> Self {
        let items = lines
            .into_iter()
            .map(|l| ReceiptItem {
                product_id: l.product_id,
                name: l.name_snapshot,
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_total: l.line_total,
            })
            .collect();
        ReceiptResponse::new(record, items, config)
    }
}

/// Finalizes the session's cart.
///
/// ## Returns
/// * `Ok(ReceiptResponse)` - committed; the cart is now empty
/// * `Err(ApiError)` - nothing committed; the cart is as it was
pub async fn checkout<S, A>(
    finalizer: &CheckoutFinalizer<S>,
    cart: &CartState,
    config: &TerminalConfig,
    abort: A,
) -> Result<ReceiptResponse, ApiError>
where
    S: Settlement,
    A: Future<Output = ()>,
{
    debug!("checkout command");

    let outcome = finalizer.finalize_until(cart, abort).await?;
    info!(checkout_id = %outcome.record.id, "Receipt issued");

    Ok(ReceiptResponse::from_outcome(outcome, config))
}

/// Most recent checkouts with their lines.
pub async fn history(
    db: &Database,
    config: &TerminalConfig,
    limit: u32,
) -> Result<Vec<ReceiptResponse>, ApiError> {
    debug!(limit, "history command");

    let records = db.checkouts().recent(limit).await?;
    let mut receipts = Vec::with_capacity(records.len());
    for record in records {
        let lines = db.checkouts().get_lines(&record.id).await?;
        receipts.push(ReceiptResponse::from_history(record, lines, config));
    }

    Ok(receipts)
}

/// Reprints one receipt.
pub async fn get_receipt(
    db: &Database,
    config: &TerminalConfig,
    checkout_id: &str,
) -> Result<ReceiptResponse, ApiError> {
    validate_uuid(checkout_id).map_err(|e| ApiError::validation(e.to_string()))?;

    let record = db
        .checkouts()
        .get_by_id(checkout_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Checkout", checkout_id))?;
    let lines = db.checkouts().get_lines(checkout_id).await?;

    Ok(ReceiptResponse::from_history(record, lines, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::InstantSettlement;
    use crate::commands::cart::add_to_cart;
    use crate::error::ErrorCode;
    use lumina_db::{DbConfig, SeedData};

    #[tokio::test]
    async fn test_checkout_then_history_and_reprint() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.seed(&SeedData::embedded().unwrap()).await.unwrap();
        let config = TerminalConfig::default();
        let cart = CartState::new(config.tax_rate());
        let finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement);

        add_to_cart(&db, &cart, "POS-LX-004").await.unwrap();
        let receipt = checkout(&finalizer, &cart, &config, std::future::pending())
            .await
            .unwrap();
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.total_display, "$2146.00");
        assert_eq!(receipt.store_name, "Lumina Ops");

        add_to_cart(&db, &cart, "POS-LX-002").await.unwrap();
        let second = checkout(&finalizer, &cart, &config, std::future::pending())
            .await
            .unwrap();

        let recent = history(&db, &config, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].checkout_id, second.checkout_id);
        assert_eq!(recent[1].items[0].name, "Letrero \"Open\" Std");

        let reprint = get_receipt(&db, &config, &receipt.checkout_id).await.unwrap();
        assert_eq!(reprint.total, receipt.total);
    }

    #[tokio::test]
    async fn test_empty_checkout_is_cart_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = TerminalConfig::default();
        let finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement);

        let err = checkout(
            &finalizer,
            &CartState::new(config.tax_rate()),
            &config,
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }
}
