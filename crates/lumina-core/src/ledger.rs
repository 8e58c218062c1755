//! # Raw Material Ledger
//!
//! Read-only view of raw material levels, as the availability checker sees it.
//!
//! The authoritative ledger lives in the database (`raw_materials` table).
//! Before a check the host loads the rows it needs into a [`MaterialLedger`];
//! the checker itself only depends on the [`MaterialLevels`] trait, so tests
//! can hand it a ledger built in memory.
//!
//! ```text
//! ┌──────────────────────┐  ledger_for(ids)   ┌──────────────────────┐
//! │  raw_materials (DB)  │ ─────────────────► │    MaterialLedger    │
//! └──────────────────────┘                    │  INS-001 → 45        │
//!                                             │  INS-002 → 12        │
//!                                             └──────────┬───────────┘
//!                                                        │ available()
//!                                                        ▼
//!                                             check_availability / check_cart
//! ```

use std::collections::BTreeMap;

use crate::quantity::Quantity;
use crate::types::{MaterialStatus, RawMaterial};

/// Lookup of available quantity per material id.
///
/// `None` means the material is not in the ledger at all, which the checker
/// reports as a configuration error rather than a shortage.
pub trait MaterialLevels {
    fn available(&self, material_id: &str) -> Option<Quantity>;
}

/// Snapshot of raw material rows keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MaterialLedger {
    materials: BTreeMap<String, RawMaterial>,
}

impl MaterialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a material.
    pub fn insert(&mut self, material: RawMaterial) {
        self.materials.insert(material.id.clone(), material);
    }

    pub fn get(&self, material_id: &str) -> Option<&RawMaterial> {
        self.materials.get(material_id)
    }

    /// All materials, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &RawMaterial> {
        self.materials.values()
    }

    /// Materials below their reorder threshold, ordered by id.
    pub fn low_stock(&self) -> Vec<&RawMaterial> {
        self.materials
            .values()
            .filter(|m| m.status() == MaterialStatus::Low)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl MaterialLevels for MaterialLedger {
    fn available(&self, material_id: &str) -> Option<Quantity> {
        self.materials.get(material_id).map(|m| m.available)
    }
}

impl FromIterator<RawMaterial> for MaterialLedger {
    fn from_iter<I: IntoIterator<Item = RawMaterial>>(iter: I) -> Self {
        let mut ledger = MaterialLedger::new();
        for material in iter {
            ledger.insert(material);
        }
        ledger
    }
}

/// Plain maps work as ledgers too (handy in tests).
impl MaterialLevels for BTreeMap<String, Quantity> {
    fn available(&self, material_id: &str) -> Option<Quantity> {
        self.get(material_id).copied()
    }
}
