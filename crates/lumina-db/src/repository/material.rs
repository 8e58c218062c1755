//! # Material Repository
//!
//! Read access to the raw material ledger and the supplier orders placed
//! for it.
//!
//! Levels are stored as integer thousandths (`available_milli`) and come back
//! as [`Quantity`]. [`MaterialRepository::ledger_for`] builds the snapshot the
//! availability checker runs against.

use chrono::{NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use lumina_core::{MaterialLedger, Quantity, RawMaterial, ReplenishmentOrder, ReplenishmentStatus};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: String,
    name: String,
    unit: String,
    available_milli: i64,
    minimum_threshold_milli: i64,
    provider: Option<String>,
}

impl From<MaterialRow> for RawMaterial {
    fn from(row: MaterialRow) -> Self {
        RawMaterial {
            id: row.id,
            name: row.name,
            unit: row.unit,
            available: Quantity::from_milli(row.available_milli),
            minimum_threshold: Quantity::from_milli(row.minimum_threshold_milli),
            provider: row.provider,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReplenishmentRow {
    id: String,
    material_id: String,
    quantity_milli: i64,
    ordered_on: NaiveDate,
    status: ReplenishmentStatus,
    expected_on: Option<NaiveDate>,
}

impl From<ReplenishmentRow> for ReplenishmentOrder {
    fn from(row: ReplenishmentRow) -> Self {
        ReplenishmentOrder {
            id: row.id,
            material_id: row.material_id,
            quantity: Quantity::from_milli(row.quantity_milli),
            ordered_on: row.ordered_on,
            status: row.status,
            expected_on: row.expected_on,
        }
    }
}

const MATERIAL_COLUMNS: &str =
    "id, name, unit, available_milli, minimum_threshold_milli, provider";

// =============================================================================
// Repository
// =============================================================================

/// Repository for raw material reads.
#[derive(Debug, Clone)]
pub struct MaterialRepository {
    pool: SqlitePool,
}

impl MaterialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MaterialRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RawMaterial>> {
        let sql = format!("SELECT {} FROM raw_materials WHERE id = ?1", MATERIAL_COLUMNS);
        let row: Option<MaterialRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Every material, ordered by id.
    pub async fn list(&self) -> DbResult<Vec<RawMaterial>> {
        let sql = format!("SELECT {} FROM raw_materials ORDER BY id", MATERIAL_COLUMNS);
        let rows: Vec<MaterialRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Ledger snapshot restricted to `ids`.
    ///
    /// Ids with no row are left out, so the checker reports them as
    /// configuration errors.
    ///
    /// ```text
    /// ledger_for(["INS-001", "INS-404"])
    ///     → SELECT ... WHERE id IN (?, ?)
    ///     → { INS-001 → 45 }            (INS-404 absent)
    /// ```
    pub async fn ledger_for(&self, ids: &[String]) -> DbResult<MaterialLedger> {
        if ids.is_empty() {
            return Ok(MaterialLedger::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM raw_materials WHERE id IN (",
            MATERIAL_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows: Vec<MaterialRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        debug!(requested = ids.len(), found = rows.len(), "Loaded ledger snapshot");

        Ok(rows.into_iter().map(RawMaterial::from).collect())
    }

    /// Whole ledger as a snapshot.
    pub async fn ledger(&self) -> DbResult<MaterialLedger> {
        Ok(self.list().await?.into_iter().collect())
    }

    /// Materials below their reorder threshold, ordered by id.
    pub async fn low_stock(&self) -> DbResult<Vec<RawMaterial>> {
        let sql = format!(
            "SELECT {} FROM raw_materials \
             WHERE available_milli < minimum_threshold_milli ORDER BY id",
            MATERIAL_COLUMNS
        );
        let rows: Vec<MaterialRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Supplier orders for `material_id` not yet received, oldest first.
    pub async fn open_orders(&self, material_id: &str) -> DbResult<Vec<ReplenishmentOrder>> {
        let rows: Vec<ReplenishmentRow> = sqlx::query_as(
            r#"
            SELECT id, material_id, quantity_milli, ordered_on, status, expected_on
            FROM replenishment_orders
            WHERE material_id = ?1 AND status != ?2
            ORDER BY ordered_on, id
            "#,
        )
        .bind(material_id)
        .bind(ReplenishmentStatus::Received)
        .fetch_all(&self.pool)
        .await?;

        debug!(material_id = %material_id, open = rows.len(), "Loaded open supplier orders");
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Inserts a raw material. Seed-only.
pub(crate) async fn insert_material(
    conn: &mut SqliteConnection,
    material: &RawMaterial,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO raw_materials
            (id, name, unit, available_milli, minimum_threshold_milli, provider, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&material.id)
    .bind(&material.name)
    .bind(&material.unit)
    .bind(material.available.milli())
    .bind(material.minimum_threshold.milli())
    .bind(&material.provider)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a supplier order. Seed-only.
pub(crate) async fn insert_replenishment(
    conn: &mut SqliteConnection,
    order: &ReplenishmentOrder,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO replenishment_orders
            (id, material_id, quantity_milli, ordered_on, status, expected_on)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&order.id)
    .bind(&order.material_id)
    .bind(order.quantity.milli())
    .bind(order.ordered_on)
    .bind(order.status)
    .bind(order.expected_on)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
