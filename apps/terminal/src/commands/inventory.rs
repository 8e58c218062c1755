//! # Inventory Commands
//!
//! Raw material ledger views for the workshop dashboard, plus the supplier
//! orders still open for a material. All read-only.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use lumina_core::validation::validate_item_id;
use lumina_core::{MaterialStatus, Quantity, RawMaterial, ReplenishmentOrder};
use lumina_db::Database;

#[derive(Debug, Clone, Serialize)]
pub struct MaterialDto {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub available: Quantity,
    pub minimum_threshold: Quantity,
    pub status: MaterialStatus,
    pub provider: Option<String>,
}

impl From<RawMaterial> for MaterialDto {
    fn from(m: RawMaterial) -> Self {
        MaterialDto {
            status: m.status(),
            id: m.id,
            name: m.name,
            unit: m.unit,
            available: m.available,
            minimum_threshold: m.minimum_threshold,
            provider: m.provider,
        }
    }
}

/// Every ledger entry, ordered by id.
pub async fn list_materials(db: &Database) -> Result<Vec<MaterialDto>, ApiError> {
    debug!("list_materials command");
    let materials = db.materials().list().await?;
    Ok(materials.into_iter().map(MaterialDto::from).collect())
}

/// Materials below their reorder threshold.
pub async fn low_stock(db: &Database) -> Result<Vec<MaterialDto>, ApiError> {
    debug!("low_stock command");
    let materials = db.materials().low_stock().await?;
    Ok(materials.into_iter().map(MaterialDto::from).collect())
}

/// A material and the supplier orders not yet received for it.
#[derive(Debug, Clone, Serialize)]
pub struct ReplenishmentResponse {
    pub material: MaterialDto,
    pub open_orders: Vec<ReplenishmentOrder>,
}

/// Open supplier orders for one material, oldest first.
pub async fn replenishments(
    db: &Database,
    material_id: &str,
) -> Result<ReplenishmentResponse, ApiError> {
    debug!(material_id = %material_id, "replenishments command");
    validate_item_id(material_id).map_err(|e| ApiError::validation(e.to_string()))?;

    let material = db
        .materials()
        .get_by_id(material_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Material", material_id))?;
    let open_orders = db.materials().open_orders(material_id).await?;

    Ok(ReplenishmentResponse {
        material: material.into(),
        open_orders,
    })
}
