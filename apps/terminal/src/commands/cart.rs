//! # Cart Commands
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌────────────┐     ┌──────────┐      │
//! │  │  Empty   │────►│ In Cart  │────►│ Processing │────►│ Committed│      │
//! │  │  Cart    │     │          │     │  (frozen)  │     │          │      │
//! │  └──────────┘     └──────────┘     └────────────┘     └──────────┘      │
//! │                        │                 │                              │
//! │                   add / dec / rm     checkout                           │
//! │                        │             (checkout.rs)                      │
//! │                        ▼                                                │
//! │                   clear ──────────────────────► (back to empty)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `add` re-reads the product and the materials it consumes, so the
//! availability check always sees current stock.

use serde::Serialize;
use tracing::debug;

use crate::config::TerminalConfig;
use crate::error::ApiError;
use crate::state::CartState;
use lumina_core::validation::validate_item_id;
use lumina_core::{CartSnapshot, CheckoutPhase};
use lumina_db::Database;

/// Cart response: lines, totals, and the totals formatted for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: CartSnapshot,
    pub phase: CheckoutPhase,
    pub subtotal_display: String,
    pub tax_display: String,
    pub total_display: String,
}

impl CartResponse {
    pub fn new(cart: CartSnapshot, phase: CheckoutPhase, config: &TerminalConfig) -> Self {
        CartResponse {
            subtotal_display: config.format_currency(cart.totals.subtotal),
            tax_display: config.format_currency(cart.totals.tax),
            total_display: config.format_currency(cart.totals.total),
            cart,
            phase,
        }
    }
}

/// Current cart contents. Allowed in every phase.
pub fn get_cart(cart: &CartState) -> CartSnapshot {
    debug!("get_cart command");
    cart.with_cart(|c| c.snapshot())
}

/// Adds one unit of a product.
///
/// ## Behavior
/// ```text
/// add POS-LX-001
///      │
///      ▼
/// 1. Fetch product (current finished stock + bill of materials)
/// 2. Fetch ledger levels for the materials it consumes
/// 3. cart.add_or_increment: check (current + 1) against both
///      │
///      ├── OK     → line added / incremented, snapshot returned
///      └── Denied → cart unchanged, every blocking resource listed
/// ```
pub async fn add_to_cart(
    db: &Database,
    cart: &CartState,
    product_id: &str,
) -> Result<CartSnapshot, ApiError> {
    debug!(product_id = %product_id, "add_to_cart command");
    validate_item_id(product_id).map_err(|e| ApiError::validation(e.to_string()))?;

    let product = db
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    let material_ids: Vec<String> = product
        .required_materials
        .iter()
        .map(|r| r.material_id.clone())
        .collect();
    let ledger = db.materials().ledger_for(&material_ids).await?;

    let snapshot = cart.with_cart_mut(|c| c.add_or_increment(&product, &ledger))?;
    Ok(snapshot)
}

/// Removes one unit; a line at quantity 1 stays as it is.
pub fn decrement_item(cart: &CartState, product_id: &str) -> Result<CartSnapshot, ApiError> {
    debug!(product_id = %product_id, "decrement_item command");
    Ok(cart.with_cart_mut(|c| Ok(c.decrement(product_id)))?)
}

/// Deletes a line. Unknown ids are ignored.
pub fn remove_from_cart(cart: &CartState, product_id: &str) -> Result<CartSnapshot, ApiError> {
    debug!(product_id = %product_id, "remove_from_cart command");
    Ok(cart.with_cart_mut(|c| Ok(c.remove(product_id)))?)
}

/// Empties the cart.
pub fn clear_cart(cart: &CartState) -> Result<CartSnapshot, ApiError> {
    debug!("clear_cart command");
    Ok(cart.with_cart_mut(|c| {
        c.clear();
        Ok(c.snapshot())
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use lumina_core::{DenialReason, Money, Quantity, TaxRate};
    use lumina_db::{DbConfig, SeedData};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.seed(&SeedData::embedded().unwrap()).await.unwrap();
        db
    }

    fn session() -> CartState {
        CartState::new(TaxRate::from_bps(1600))
    }

    #[tokio::test]
    async fn test_totals_scenario() {
        let db = seeded().await;
        let cart = session();

        add_to_cart(&db, &cart, "POS-LX-001").await.unwrap();
        add_to_cart(&db, &cart, "POS-LX-001").await.unwrap();
        let snapshot = add_to_cart(&db, &cart, "POS-LX-003").await.unwrap();

        assert_eq!(snapshot.totals.subtotal, Money::from_major_minor(2950, 0));
        assert_eq!(snapshot.totals.tax, Money::from_major_minor(472, 0));
        assert_eq!(snapshot.totals.total, Money::from_major_minor(3422, 0));

        let response = CartResponse::new(snapshot, CheckoutPhase::Idle, &TerminalConfig::default());
        assert_eq!(response.total_display, "$3422.00");
    }

    #[tokio::test]
    async fn test_tenth_flex_is_denied() {
        let db = seeded().await;
        let cart = session();

        for _ in 0..9 {
            add_to_cart(&db, &cart, "POS-LX-001").await.unwrap();
        }

        let err = add_to_cart(&db, &cart, "POS-LX-001").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.denials,
            vec![DenialReason::MaterialShortage {
                material_id: "INS-001".to_string(),
                needed: Quantity::from_units(50),
                available: Quantity::from_units(45),
            }]
        );
        assert_eq!(get_cart(&cart).lines[0].quantity, 9);
    }

    #[tokio::test]
    async fn test_out_of_stock_product() {
        let db = seeded().await;
        let cart = session();

        let err = add_to_cart(&db, &cart, "POS-LX-006").await.unwrap_err();
        assert!(matches!(
            err.denials.as_slice(),
            [DenialReason::FinishedStockExceeded { shortfall: 1, .. }]
        ));
        assert!(get_cart(&cart).lines.is_empty());
    }

    #[tokio::test]
    async fn test_dangling_material_is_configuration_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let data = SeedData::from_json(
            r#"{
                "products": [
                    { "id": "POS-LX-901", "name": "Letrero Huérfano", "category": "neon",
                      "unit_price": 100000, "finished_stock": 5, "max_stock": 5,
                      "required_materials": [ { "material_id": "INS-404", "quantity_per_unit": 1000 } ] }
                ]
            }"#,
        )
        .unwrap();
        db.seed(&data).await.unwrap();

        let cart = session();
        let err = add_to_cart(&db, &cart, "POS-LX-901").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigurationError);
        assert!(get_cart(&cart).lines.is_empty());
    }

    #[tokio::test]
    async fn test_decrement_remove_clear() {
        let db = seeded().await;
        let cart = session();
        add_to_cart(&db, &cart, "POS-LX-002").await.unwrap();
        add_to_cart(&db, &cart, "POS-LX-005").await.unwrap();

        // Floor of one
        let snapshot = decrement_item(&cart, "POS-LX-002").unwrap();
        assert_eq!(snapshot.lines[0].quantity, 1);

        let snapshot = remove_from_cart(&cart, "POS-LX-002").unwrap();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].product_id, "POS-LX-005");

        // Unknown id is a no-op
        let snapshot = remove_from_cart(&cart, "POS-LX-404").unwrap();
        assert_eq!(snapshot.lines.len(), 1);

        let snapshot = clear_cart(&cart).unwrap();
        assert!(snapshot.lines.is_empty());
        assert_eq!(snapshot.totals.total, Money::zero());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = seeded().await;
        let err = add_to_cart(&db, &session(), "POS-LX-404").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
