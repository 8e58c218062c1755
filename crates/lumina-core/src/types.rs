//! # Domain Types
//!
//! Core domain types for the workshop point of sale.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐               │
//! │  │       Product        │        │     RawMaterial      │               │
//! │  │  ──────────────────  │  BOM   │  ──────────────────  │               │
//! │  │  id  "POS-LX-001"    │───────►│  id  "INS-001"       │               │
//! │  │  category (Neon…)    │ 5 m /  │  unit "m"            │               │
//! │  │  unit_price (Money)  │  unit  │  available (Qty)     │               │
//! │  │  finished_stock      │        │  minimum_threshold   │               │
//! │  │  required_materials  │        │  → status Low/Nominal│               │
//! │  └──────────────────────┘        └──────────────────────┘               │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐               │
//! │  │    CheckoutPhase     │        │    CheckoutRecord    │               │
//! │  │  Idle → Processing   │        │  id, totals, lines   │               │
//! │  │  → Completed/Failed  │        │  written on commit   │               │
//! │  └──────────────────────┘        └──────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Category
// =============================================================================

/// What kind of thing a catalog entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Neon signs and flex hose.
    Neon,
    /// Power supplies, connectors, mounting kits.
    Accessory,
    /// Installation, design and other labor.
    Service,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Neon, Category::Accessory, Category::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Neon => "neon",
            Category::Accessory => "accessory",
            Category::Service => "service",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the English names and the Spanish tab labels used on the shop floor.
impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neon" | "neón" => Ok(Category::Neon),
            "accessory" | "accessories" | "accesorios" => Ok(Category::Accessory),
            "service" | "services" | "servicios" => Ok(Category::Service),
            other => Err(crate::error::ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: Category::ALL.iter().map(|c| c.to_string()).collect(),
                value: other.to_string(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// One line of a product's bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MaterialRequirement {
    /// Raw material consumed.
    pub material_id: String,

    /// Amount consumed per finished unit sold. Always > 0.
    pub quantity_per_unit: Quantity,
}

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Business identifier, e.g. `POS-LX-001`.
    pub id: String,

    /// Display name shown at the counter.
    pub name: String,

    pub category: Category,

    /// Unit price in cents.
    pub unit_price: Money,

    /// On-hand finished units.
    pub finished_stock: i64,

    /// Shelf capacity, always >= finished_stock.
    pub max_stock: i64,

    /// Materials consumed per unit, in declared order.
    #[serde(default)]
    pub required_materials: Vec<MaterialRequirement>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    /// Stock level as a fraction of shelf capacity, in basis points.
    ///
    /// Drives the stock bar on the catalog cards. Zero capacity reads as empty.
    pub fn stock_fill_bps(&self) -> u32 {
        if self.max_stock <= 0 {
            return 0;
        }
        let bps = self.finished_stock.max(0) * 10_000 / self.max_stock;
        bps.min(10_000) as u32
    }

    /// True when no finished units are on hand.
    pub fn is_out_of_stock(&self) -> bool {
        self.finished_stock <= 0
    }
}

// =============================================================================
// Raw Material
// =============================================================================

/// Derived health of a raw material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    /// Below the reorder threshold.
    Low,
    Nominal,
}

/// A consumable input tracked in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawMaterial {
    /// Ledger key, e.g. `INS-001`.
    pub id: String,

    pub name: String,

    /// Unit of measure ("m", "sheet", "pcs").
    pub unit: String,

    /// Quantity on hand.
    pub available: Quantity,

    /// Reorder threshold.
    pub minimum_threshold: Quantity,

    /// Supplier the material is reordered from.
    #[serde(default)]
    pub provider: Option<String>,
}

impl RawMaterial {
    pub fn status(&self) -> MaterialStatus {
        if self.available < self.minimum_threshold {
            MaterialStatus::Low
        } else {
            MaterialStatus::Nominal
        }
    }
}

// =============================================================================
// Replenishment
// =============================================================================

/// Where a supplier order stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishmentStatus {
    /// Placed, not shipped yet.
    Pending,
    InTransit,
    /// Delivered. Closed orders are history only.
    Received,
}

impl ReplenishmentStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, ReplenishmentStatus::Received)
    }
}

/// A supplier order for a raw material.
///
/// Informational: the ledger level only changes through checkouts, so an
/// order arriving does not add to `available` here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReplenishmentOrder {
    /// Supplier reference, e.g. `RE-771`.
    pub id: String,
    pub material_id: String,
    pub quantity: Quantity,
    #[ts(as = "String")]
    pub ordered_on: NaiveDate,
    pub status: ReplenishmentStatus,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_on: Option<NaiveDate>,
}

// =============================================================================
// Checkout Phase
// =============================================================================

/// Lifecycle of a checkout, owned by one cart session.
///
/// ```text
///            finalize()
///   Idle ───────────────► Processing ──┬──► Completed ──┐
///    ▲                                 │                 │
///    │                                 └──► Failed ──────┤
///    └───────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// Cart is editable; finalize may be called.
    #[default]
    Idle,
    /// Settlement/commit in flight; the cart is frozen.
    Processing,
    /// Ledger debited, cart cleared.
    Completed,
    /// Nothing committed, cart preserved.
    Failed,
}

impl CheckoutPhase {
    /// Validates and performs a phase transition.
    pub fn transition(self, next: CheckoutPhase) -> CoreResult<CheckoutPhase> {
        use CheckoutPhase::*;

        let allowed = matches!(
            (self, next),
            (Idle, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Idle)
                | (Failed, Idle)
        );

        if allowed {
            Ok(next)
        } else {
            Err(CoreError::InvalidCheckoutPhase {
                from: self,
                to: next,
            })
        }
    }

    /// Whether cart lines may be changed in this phase.
    pub fn accepts_cart_changes(&self) -> bool {
        matches!(self, CheckoutPhase::Idle)
    }
}

// =============================================================================
// Checkout Records
// =============================================================================

/// A completed checkout, as persisted by the commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRecord {
    pub id: String,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    /// Number of distinct cart lines.
    pub line_count: i64,
    /// Reference handed back by the settlement provider.
    pub settlement_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One line of a completed checkout. Name and price are frozen copies.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLineRecord {
    pub id: String,
    pub checkout_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(stock: i64, max: i64) -> Product {
        Product {
            id: "POS-LX-004".to_string(),
            name: "Letrero Open".to_string(),
            category: Category::Neon,
            unit_price: Money::from_major_minor(1850, 0),
            finished_stock: stock,
            max_stock: max,
            required_materials: vec![],
            description: None,
        }
    }

    #[test]
    fn test_material_status() {
        let mut hose = RawMaterial {
            id: "INS-001".to_string(),
            name: "Manguera Neón Flex 12V".to_string(),
            unit: "m".to_string(),
            available: Quantity::from_units(45),
            minimum_threshold: Quantity::from_units(100),
            provider: Some("Silicon Valley LED".to_string()),
        };
        assert_eq!(hose.status(), MaterialStatus::Low);

        hose.available = Quantity::from_units(100);
        assert_eq!(hose.status(), MaterialStatus::Nominal);
    }

    #[test]
    fn test_stock_fill() {
        assert_eq!(sign(3, 10).stock_fill_bps(), 3000);
        assert_eq!(sign(0, 0).stock_fill_bps(), 0);
        assert!(sign(0, 25).is_out_of_stock());
    }

    #[test]
    fn test_replenishment_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReplenishmentStatus::InTransit).unwrap(),
            r#""in_transit""#
        );
        assert!(ReplenishmentStatus::Pending.is_open());
        assert!(!ReplenishmentStatus::Received.is_open());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Neon".parse::<Category>().unwrap(), Category::Neon);
        assert_eq!("servicios".parse::<Category>().unwrap(), Category::Service);
        assert_eq!("accesorios".parse::<Category>().unwrap(), Category::Accessory);
        assert!("lamps".parse::<Category>().is_err());
    }

    #[test]
    fn test_phase_transitions() {
        let phase = CheckoutPhase::default();
        assert_eq!(phase, CheckoutPhase::Idle);

        let phase = phase.transition(CheckoutPhase::Processing).unwrap();
        assert!(!phase.accepts_cart_changes());

        let phase = phase.transition(CheckoutPhase::Failed).unwrap();
        let phase = phase.transition(CheckoutPhase::Idle).unwrap();
        assert!(phase.accepts_cart_changes());

        assert!(CheckoutPhase::Idle
            .transition(CheckoutPhase::Completed)
            .is_err());
        assert!(CheckoutPhase::Processing
            .transition(CheckoutPhase::Processing)
            .is_err());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::Accessory).unwrap();
        assert_eq!(json, "\"accessory\"");
    }
}
