//! # Checkout Repository
//!
//! The only path that moves stock: the atomic checkout commit.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├── for each product in the plan                                      │
//! │   │     UPDATE products SET finished_stock = finished_stock - n         │
//! │   │      WHERE id = ? AND finished_stock >= n      ── 0 rows? ──┐       │
//! │   │                                                             │       │
//! │   ├── for each material in the plan                             │       │
//! │   │     UPDATE raw_materials SET available_milli = ... - q      │       │
//! │   │      WHERE id = ? AND available_milli >= q     ── 0 rows? ──┤       │
//! │   │                                                             │       │
//! │   ├── INSERT checkouts, checkout_lines                          ▼       │
//! │   │                                                     ROLLBACK        │
//! │  COMMIT                                                 StockConflict   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each decrement re-asserts its own precondition, so the commit stays safe
//! even if the ledger moved after the caller's re-check. The first statement
//! is a write, so the transaction takes SQLite's write lock up front and two
//! commits never interleave.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use lumina_core::{CheckoutLineRecord, CheckoutRecord, Consumption, Money};

// =============================================================================
// Input Types
// =============================================================================

/// One line of a checkout about to be committed.
#[derive(Debug, Clone)]
pub struct NewCheckoutLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl NewCheckoutLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Everything the commit writes.
///
/// `consumption` is the decrement plan produced by the whole-cart check;
/// `lines` is the receipt.
#[derive(Debug, Clone)]
pub struct NewCheckout {
    pub id: String,
    pub lines: Vec<NewCheckoutLine>,
    pub consumption: Consumption,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub settlement_reference: Option<String>,
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct CheckoutRow {
    id: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    line_count: i64,
    settlement_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CheckoutRow> for CheckoutRecord {
    fn from(row: CheckoutRow) -> Self {
        CheckoutRecord {
            id: row.id,
            subtotal: Money::from_cents(row.subtotal_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
            line_count: row.line_count,
            settlement_reference: row.settlement_reference,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CheckoutLineRow {
    id: String,
    checkout_id: String,
    product_id: String,
    name_snapshot: String,
    unit_price_cents: i64,
    quantity: i64,
    line_total_cents: i64,
}

impl From<CheckoutLineRow> for CheckoutLineRecord {
    fn from(row: CheckoutLineRow) -> Self {
        CheckoutLineRecord {
            id: row.id,
            checkout_id: row.checkout_id,
            product_id: row.product_id,
            name_snapshot: row.name_snapshot,
            unit_price: Money::from_cents(row.unit_price_cents),
            quantity: row.quantity,
            line_total: Money::from_cents(row.line_total_cents),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for checkout commit and history.
#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
}

impl CheckoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutRepository { pool }
    }

    /// Debits finished stock and raw materials and records the checkout,
    /// all or nothing.
    ///
    /// ## Returns
    /// * `Ok(CheckoutRecord)` - committed
    /// * `Err(DbError::StockConflict)` - a resource no longer covers the
    ///   plan; nothing was written
    pub async fn commit(&self, checkout: &NewCheckout) -> DbResult<CheckoutRecord> {
        debug!(
            checkout_id = %checkout.id,
            products = checkout.consumption.products.len(),
            materials = checkout.consumption.materials.len(),
            "Committing checkout"
        );

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for demand in &checkout.consumption.products {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET finished_stock = finished_stock - ?2,
                    updated_at = ?3
                WHERE id = ?1 AND finished_stock >= ?2
                "#,
            )
            .bind(&demand.product_id)
            .bind(demand.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                warn!(product_id = %demand.product_id, quantity = demand.quantity, "Finished stock conflict, rolled back");
                return Err(DbError::stock_conflict(&demand.product_id, demand.quantity));
            }
        }

        for demand in &checkout.consumption.materials {
            let result = sqlx::query(
                r#"
                UPDATE raw_materials
                SET available_milli = available_milli - ?2,
                    updated_at = ?3
                WHERE id = ?1 AND available_milli >= ?2
                "#,
            )
            .bind(&demand.material_id)
            .bind(demand.quantity.milli())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                warn!(material_id = %demand.material_id, quantity = %demand.quantity, "Material conflict, rolled back");
                return Err(DbError::stock_conflict(&demand.material_id, demand.quantity));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO checkouts (
                id, subtotal_cents, tax_cents, total_cents,
                line_count, settlement_reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&checkout.id)
        .bind(checkout.subtotal.cents())
        .bind(checkout.tax.cents())
        .bind(checkout.total.cents())
        .bind(checkout.lines.len() as i64)
        .bind(&checkout.settlement_reference)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, line) in checkout.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO checkout_lines (
                    id, checkout_id, position, product_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&checkout.id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(line.unit_price.cents())
            .bind(line.quantity)
            .bind(line.line_total().cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            checkout_id = %checkout.id,
            total = checkout.total.cents(),
            "Checkout committed"
        );

        Ok(CheckoutRecord {
            id: checkout.id.clone(),
            subtotal: checkout.subtotal,
            tax: checkout.tax,
            total: checkout.total,
            line_count: checkout.lines.len() as i64,
            settlement_reference: checkout.settlement_reference.clone(),
            created_at: now,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CheckoutRecord>> {
        let row: Option<CheckoutRow> = sqlx::query_as(
            r#"
            SELECT id, subtotal_cents, tax_cents, total_cents, line_count,
                   settlement_reference, created_at
            FROM checkouts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Most recent checkouts first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<CheckoutRecord>> {
        let rows: Vec<CheckoutRow> = sqlx::query_as(
            r#"
            SELECT id, subtotal_cents, tax_cents, total_cents, line_count,
                   settlement_reference, created_at
            FROM checkouts
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lines of one checkout, in cart order.
    pub async fn get_lines(&self, checkout_id: &str) -> DbResult<Vec<CheckoutLineRecord>> {
        let rows: Vec<CheckoutLineRow> = sqlx::query_as(
            r#"
            SELECT id, checkout_id, product_id, name_snapshot,
                   unit_price_cents, quantity, line_total_cents
            FROM checkout_lines
            WHERE checkout_id = ?1
            ORDER BY position
            "#,
        )
        .bind(checkout_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkouts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new checkout id.
pub fn generate_checkout_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
