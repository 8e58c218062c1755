//! # Availability Checker
//!
//! Decides whether a product may be sold in a given quantity.
//!
//! ## Check Order
//! ```text
//! check_availability(product, target, ledger)
//!      │
//!      ├── 1. target > finished_stock ?     → FinishedStockExceeded
//!      │
//!      └── 2. for each requirement (declared order)
//!              needed = quantity_per_unit × target
//!              ├── material unknown ?       → ConfigurationError
//!              └── needed > available ?     → MaterialShortage
//!                  (a demand that overflows i64 saturates to
//!                   Quantity::MAX, which is always a shortage)
//!
//!   Every failing resource is collected; Ok(()) only when none fail.
//! ```
//!
//! Pure predicate: nothing is mutated, the same inputs always give the same
//! answer. The cart uses [`check_availability`] per line when the operator
//! adds a unit; the checkout re-check uses [`check_cart`], which sums the
//! demand of every line first so two signs sharing one hose cannot each pass
//! on their own and then overdraw it together.

use crate::error::{DenialReason, Denied};
use crate::ledger::MaterialLevels;
use crate::quantity::Quantity;
use crate::types::Product;

// =============================================================================
// Single Product
// =============================================================================

/// Checks whether `target_quantity` units of `product` can be sold.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use lumina_core::availability::check_availability;
/// use lumina_core::quantity::Quantity;
/// use lumina_core::types::{Category, MaterialRequirement, Product};
/// use lumina_core::Money;
///
/// let hose = Product {
///     id: "POS-LX-001".into(),
///     name: "Neón Flex Pro 5m".into(),
///     category: Category::Neon,
///     unit_price: Money::from_major_minor(1250, 0),
///     finished_stock: 12,
///     max_stock: 20,
///     required_materials: vec![MaterialRequirement {
///         material_id: "INS-001".into(),
///         quantity_per_unit: Quantity::from_units(5),
///     }],
///     description: None,
/// };
/// let mut ledger = BTreeMap::new();
/// ledger.insert("INS-001".to_string(), Quantity::from_units(45));
///
/// assert!(check_availability(&hose, 9, &ledger).is_ok());
/// assert!(check_availability(&hose, 10, &ledger).is_err());
/// ```
pub fn check_availability<L>(product: &Product, target_quantity: i64, ledger: &L) -> Result<(), Denied>
where
    L: MaterialLevels + ?Sized,
{
    let mut reasons = Vec::new();

    if let Some(reason) = finished_stock_denial(product, target_quantity) {
        reasons.push(reason);
    }

    for requirement in &product.required_materials {
        let needed = requirement.quantity_per_unit.times(target_quantity);
        if let Some(reason) = material_denial(&product.id, &requirement.material_id, needed, ledger)
        {
            reasons.push(reason);
        }
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(Denied::new(reasons))
    }
}

fn finished_stock_denial(product: &Product, requested: i64) -> Option<DenialReason> {
    if requested > product.finished_stock {
        Some(DenialReason::FinishedStockExceeded {
            product_id: product.id.clone(),
            requested,
            available: product.finished_stock,
            shortfall: requested - product.finished_stock,
        })
    } else {
        None
    }
}

fn material_denial<L>(
    product_id: &str,
    material_id: &str,
    needed: Quantity,
    ledger: &L,
) -> Option<DenialReason>
where
    L: MaterialLevels + ?Sized,
{
    match ledger.available(material_id) {
        None => Some(DenialReason::ConfigurationError {
            product_id: product_id.to_string(),
            material_id: material_id.to_string(),
        }),
        Some(available) if needed.is_saturated() || needed > available => {
            Some(DenialReason::MaterialShortage {
                material_id: material_id.to_string(),
                needed,
                available,
            })
        }
        Some(_) => None,
    }
}

// =============================================================================
// Whole Cart
// =============================================================================

/// Finished units a checkout will take from one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDemand {
    pub product_id: String,
    pub quantity: i64,
}

/// Quantity a checkout will take from one raw material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDemand {
    pub material_id: String,
    pub quantity: Quantity,
    /// First product (in cart order) whose bill of materials named it.
    pub first_requested_by: String,
}

/// Everything a checkout consumes, aggregated per resource.
///
/// Products are in cart order, materials in first-seen order. This is the
/// exact list of conditional decrements the commit performs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consumption {
    pub products: Vec<ProductDemand>,
    pub materials: Vec<MaterialDemand>,
}

impl Consumption {
    /// Aggregates demand for `(product, quantity)` pairs.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (&'a Product, i64)>,
    {
        let mut consumption = Consumption::default();

        for (product, quantity) in lines {
            match consumption
                .products
                .iter_mut()
                .find(|d| d.product_id == product.id)
            {
                Some(existing) => existing.quantity += quantity,
                None => consumption.products.push(ProductDemand {
                    product_id: product.id.clone(),
                    quantity,
                }),
            }

            for requirement in &product.required_materials {
                let needed = requirement.quantity_per_unit.times(quantity);
                match consumption
                    .materials
                    .iter_mut()
                    .find(|d| d.material_id == requirement.material_id)
                {
                    Some(existing) => existing.quantity = existing.quantity.saturating_add(needed),
                    None => consumption.materials.push(MaterialDemand {
                        material_id: requirement.material_id.clone(),
                        quantity: needed,
                        first_requested_by: product.id.clone(),
                    }),
                }
            }
        }

        consumption
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Material ids touched, in first-seen order.
    pub fn material_ids(&self) -> Vec<String> {
        self.materials.iter().map(|m| m.material_id.clone()).collect()
    }
}

/// Checks a whole cart against the ledger with demand summed per resource.
///
/// `lines` pairs each product (ideally a fresh read, so finished stock is
/// current) with its cart quantity. Returns the consumption plan when every
/// resource covers the combined demand.
///
/// ```text
/// Letrero Open ×3   → INS-001  9 m    INS-002 1.5 sheets
/// Neón Flex Pro ×8  → INS-001 40 m
///                      ───────────
///                      INS-001 49 m  > 45 available → MaterialShortage
/// ```
pub fn check_cart<'a, I, L>(lines: I, ledger: &L) -> Result<Consumption, Denied>
where
    I: IntoIterator<Item = (&'a Product, i64)>,
    L: MaterialLevels + ?Sized,
{
    let lines: Vec<(&Product, i64)> = lines.into_iter().collect();
    let consumption = Consumption::from_lines(lines.iter().copied());
    let mut reasons = Vec::new();

    for demand in &consumption.products {
        if let Some(product) = lines
            .iter()
            .map(|(p, _)| *p)
            .find(|p| p.id == demand.product_id)
        {
            if let Some(reason) = finished_stock_denial(product, demand.quantity) {
                reasons.push(reason);
            }
        }
    }

    for demand in &consumption.materials {
        if let Some(reason) = material_denial(
            &demand.first_requested_by,
            &demand.material_id,
            demand.quantity,
            ledger,
        ) {
            reasons.push(reason);
        }
    }

    if reasons.is_empty() {
        Ok(consumption)
    } else {
        Err(Denied::new(reasons))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
