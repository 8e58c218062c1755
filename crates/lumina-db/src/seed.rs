//! # Seed Data
//!
//! Static catalog and ledger loaded at start-up.
//!
//! There is no API for creating products or materials; the shop's catalog
//! is a JSON document (`seed/luminaflex.json` is embedded in the binary) that
//! is written to an empty database once.
//!
//! ## Seed Format
//! ```text
//! {
//!   "materials": [ { "id": "INS-001", "unit": "Metros", "provider": "...",
//!                    "available": 45000, "minimum_threshold": 100000 } ],
//!   "replenishments": [ { "id": "RE-771", "material_id": "INS-001",
//!                         "quantity": 200000, "ordered_on": "2024-05-20",
//!                         "status": "in_transit", "expected_on": "2024-05-25" } ],
//!   "products":  [ { "id": "POS-LX-001", "category": "neon",
//!                    "unit_price": 125000, "finished_stock": 12, "max_stock": 20,
//!                    "required_materials": [ { "material_id": "INS-001",
//!                                              "quantity_per_unit": 5000 } ] } ]
//! }
//! ```
//! Money is in cents, quantities in thousandths.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::material::{insert_material, insert_replenishment};
use crate::repository::product::insert_product;
use lumina_core::validation::{validate_material, validate_product, validate_replenishment};
use lumina_core::{Product, RawMaterial, ReplenishmentOrder};

const EMBEDDED_SEED: &str = include_str!("../seed/luminaflex.json");

/// Catalog plus ledger, as read from a seed document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub materials: Vec<RawMaterial>,
    #[serde(default)]
    pub replenishments: Vec<ReplenishmentOrder>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl SeedData {
    /// The catalog shipped with the binary.
    pub fn embedded() -> DbResult<Self> {
        Self::from_json(EMBEDDED_SEED)
    }

    /// Parses and validates a seed document.
    pub fn from_json(json: &str) -> DbResult<Self> {
        let data: SeedData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    pub fn from_path(path: &Path) -> DbResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DbError::InvalidSeed(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Field rules per record plus unique ids. Supplier orders must name a
    /// material in the same document.
    ///
    /// A bill of materials naming an unknown material is only warned about:
    /// the product stays in the catalog and the availability checker
    /// refuses to sell it.
    pub fn validate(&self) -> DbResult<()> {
        let mut material_ids = HashSet::new();
        for material in &self.materials {
            validate_material(material)
                .map_err(|e| DbError::InvalidSeed(format!("material {}: {}", material.id, e)))?;
            if !material_ids.insert(material.id.as_str()) {
                return Err(DbError::InvalidSeed(format!(
                    "duplicate material id {}",
                    material.id
                )));
            }
        }

        let mut order_ids = HashSet::new();
        for order in &self.replenishments {
            validate_replenishment(order)
                .map_err(|e| DbError::InvalidSeed(format!("replenishment {}: {}", order.id, e)))?;
            if !order_ids.insert(order.id.as_str()) {
                return Err(DbError::InvalidSeed(format!(
                    "duplicate replenishment id {}",
                    order.id
                )));
            }
            if !material_ids.contains(order.material_id.as_str()) {
                return Err(DbError::InvalidSeed(format!(
                    "replenishment {} references unknown material {}",
                    order.id, order.material_id
                )));
            }
        }

        let mut product_ids = HashSet::new();
        for product in &self.products {
            validate_product(product)
                .map_err(|e| DbError::InvalidSeed(format!("product {}: {}", product.id, e)))?;
            if !product_ids.insert(product.id.as_str()) {
                return Err(DbError::InvalidSeed(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }

            for requirement in &product.required_materials {
                if !material_ids.contains(requirement.material_id.as_str()) {
                    warn!(
                        product_id = %product.id,
                        material_id = %requirement.material_id,
                        "Seed product references unknown material"
                    );
                }
            }
        }

        Ok(())
    }
}

impl Database {
    /// Writes `data` in one transaction.
    pub async fn seed(&self, data: &SeedData) -> DbResult<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for material in &data.materials {
            insert_material(&mut *tx, material).await?;
        }
        for order in &data.replenishments {
            insert_replenishment(&mut *tx, order).await?;
        }
        for product in &data.products {
            insert_product(&mut *tx, product).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            products = data.products.len(),
            materials = data.materials.len(),
            replenishments = data.replenishments.len(),
            "Seed data written"
        );
        Ok(())
    }

    /// Seeds only when the catalog is empty. Returns whether it wrote.
    pub async fn seed_if_empty(&self, data: &SeedData) -> DbResult<bool> {
        let existing = self.products().count().await?;
        if existing > 0 {
            info!(existing, "Catalog already present, skipping seed");
            return Ok(false);
        }

        self.seed(data).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[test]
    fn test_embedded_seed_parses() {
        let data = SeedData::embedded().unwrap();
        assert_eq!(data.products.len(), 6);
        assert_eq!(data.materials.len(), 4);
        assert_eq!(data.replenishments.len(), 3);

        let sign = data.products.iter().find(|p| p.id == "POS-LX-004").unwrap();
        assert_eq!(sign.required_materials.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{
            "materials": [],
            "products": [
                { "id": "A", "name": "A", "category": "service", "unit_price": 100,
                  "finished_stock": 1, "max_stock": 1 },
                { "id": "A", "name": "B", "category": "service", "unit_price": 100,
                  "finished_stock": 1, "max_stock": 1 }
            ]
        }"#;

        assert!(matches!(
            SeedData::from_json(json),
            Err(DbError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_dangling_material_is_allowed() {
        let json = r#"{
            "products": [
                { "id": "P", "name": "P", "category": "neon", "unit_price": 100,
                  "finished_stock": 1, "max_stock": 1,
                  "required_materials": [ { "material_id": "INS-404", "quantity_per_unit": 1000 } ] }
            ]
        }"#;

        assert!(SeedData::from_json(json).is_ok());
    }

    #[test]
    fn test_replenishment_for_unknown_material_rejected() {
        let json = r#"{
            "materials": [
                { "id": "INS-001", "name": "Hose", "unit": "m",
                  "available": 1000, "minimum_threshold": 0 }
            ],
            "replenishments": [
                { "id": "RE-900", "material_id": "INS-404", "quantity": 1000,
                  "ordered_on": "2024-05-20", "status": "pending" }
            ]
        }"#;

        let err = SeedData::from_json(json).unwrap_err();
        assert!(err.to_string().contains("INS-404"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SeedData::from_json("{ not json"),
            Err(DbError::InvalidSeed(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_if_empty_runs_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let data = SeedData::embedded().unwrap();

        assert!(db.seed_if_empty(&data).await.unwrap());
        assert!(!db.seed_if_empty(&data).await.unwrap());
        assert_eq!(db.products().count().await.unwrap(), 6);
    }
}
