//! # Validation Module
//!
//! Input validation for ids, names, quantities and seed records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal command parser                                       │
//! │  └── JSON shape, argument count                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Ids, names, search text                                            │
//! │  └── Seed records (prices, stock bounds, bills of materials)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── CHECK (finished_stock >= 0), CHECK (available >= 0), UNIQUE ids    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lumina_core::validation::{validate_item_id, validate_quantity};
//!
//! validate_item_id("POS-LX-001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Product, RawMaterial, ReplenishmentOrder};
use crate::{MAX_ITEM_QUANTITY, MAX_REQUIREMENT_MILLI, MAX_SEARCH_LENGTH, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or material id.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use lumina_core::validation::validate_item_id;
///
/// assert!(validate_item_id("INS-001").is_ok());
/// assert!(validate_item_id("").is_err());
/// assert!(validate_item_id("INS 001").is_err());
/// ```
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: 50,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (products and materials).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
///
/// Empty is fine: it means "everything in the selected category".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LENGTH {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_LENGTH,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a finished-unit quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (bundled services).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a catalog entry before it is seeded.
///
/// ## Rules
/// ```text
/// id / name            → see validate_item_id, validate_name
/// unit_price           → 0..=MAX_UNIT_PRICE_CENTS
/// finished_stock       → >= 0
/// max_stock            → >= finished_stock
/// required_materials   → each quantity_per_unit in 1..=MAX_REQUIREMENT_MILLI,
///                        no material twice
/// ```
///
/// Whether each material actually exists is NOT checked here; that is the
/// availability checker's ConfigurationError.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_item_id(&product.id)?;
    validate_name(&product.name)?;
    validate_price_cents(product.unit_price.cents())?;

    if product.finished_stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "finished_stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if product.max_stock < product.finished_stock {
        return Err(ValidationError::OutOfRange {
            field: "max_stock".to_string(),
            min: product.finished_stock,
            max: i64::MAX,
        });
    }

    let mut seen = HashSet::new();
    for requirement in &product.required_materials {
        validate_item_id(&requirement.material_id)?;

        if !requirement.quantity_per_unit.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "quantity_per_unit".to_string(),
            });
        }

        if requirement.quantity_per_unit.milli() > MAX_REQUIREMENT_MILLI {
            return Err(ValidationError::OutOfRange {
                field: "quantity_per_unit".to_string(),
                min: 1,
                max: MAX_REQUIREMENT_MILLI,
            });
        }

        if !seen.insert(requirement.material_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "material_id".to_string(),
                value: requirement.material_id.clone(),
            });
        }
    }

    Ok(())
}

/// Validates a raw material before it is seeded.
pub fn validate_material(material: &RawMaterial) -> ValidationResult<()> {
    validate_item_id(&material.id)?;
    validate_name(&material.name)?;

    if material.unit.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "unit".to_string(),
        });
    }

    if material.available.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "available".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if material.minimum_threshold.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "minimum_threshold".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a supplier order before it is seeded.
///
/// Whether the material exists is checked by the seed loader, which knows
/// the whole ledger.
pub fn validate_replenishment(order: &ReplenishmentOrder) -> ValidationResult<()> {
    validate_item_id(&order.id)?;
    validate_item_id(&order.material_id)?;

    if !order.quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if order.expected_on.is_some_and(|expected| expected < order.ordered_on) {
        return Err(ValidationError::InvalidFormat {
            field: "expected_on".to_string(),
            reason: "must not be before ordered_on".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a checkout id.
///
/// ```rust
/// use lumina_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::quantity::Quantity;
    use crate::types::{Category, MaterialRequirement};

    fn product() -> Product {
        Product {
            id: "POS-LX-004".to_string(),
            name: "Letrero \"Open\" Std".to_string(),
            category: Category::Neon,
            unit_price: Money::from_major_minor(1850, 0),
            finished_stock: 3,
            max_stock: 10,
            required_materials: vec![
                MaterialRequirement {
                    material_id: "INS-001".to_string(),
                    quantity_per_unit: Quantity::from_units(3),
                },
                MaterialRequirement {
                    material_id: "INS-002".to_string(),
                    quantity_per_unit: Quantity::from_milli(500),
                },
            ],
            description: None,
        }
    }

    #[test]
    fn test_validate_item_id() {
        assert!(validate_item_id("POS-LX-001").is_ok());
        assert!(validate_item_id("ins_004").is_ok());

        assert!(validate_item_id("").is_err());
        assert!(validate_item_id("   ").is_err());
        assert!(validate_item_id("has space").is_err());
        assert!(validate_item_id(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_name_counts_characters() {
        assert!(validate_name("Acrílico Negro 3mm").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"ñ".repeat(200)).is_ok());
        assert!(validate_name(&"ñ".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  neón ").unwrap(), "neón");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"x".repeat(MAX_SEARCH_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_product() {
        assert!(validate_product(&product()).is_ok());

        let mut over_capacity = product();
        over_capacity.max_stock = 2;
        assert!(validate_product(&over_capacity).is_err());

        let mut zero_requirement = product();
        zero_requirement.required_materials[1].quantity_per_unit = Quantity::zero();
        assert!(matches!(
            validate_product(&zero_requirement),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut huge_requirement = product();
        huge_requirement.required_materials[0].quantity_per_unit =
            Quantity::from_milli(i64::MAX / 2 + 1);
        assert!(matches!(
            validate_product(&huge_requirement),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut at_bound = product();
        at_bound.required_materials[0].quantity_per_unit = Quantity::from_milli(MAX_REQUIREMENT_MILLI);
        at_bound.unit_price = Money::from_cents(MAX_UNIT_PRICE_CENTS);
        assert!(validate_product(&at_bound).is_ok());

        let mut huge_price = product();
        huge_price.unit_price = Money::from_cents(MAX_UNIT_PRICE_CENTS + 1);
        assert!(validate_product(&huge_price).is_err());

        let mut duplicate = product();
        duplicate.required_materials[1].material_id = "INS-001".to_string();
        assert!(matches!(
            validate_product(&duplicate),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_validate_material() {
        let mut material = RawMaterial {
            id: "INS-002".to_string(),
            name: "Acrílico Negro 3mm".to_string(),
            unit: "Láminas".to_string(),
            available: Quantity::from_units(12),
            minimum_threshold: Quantity::from_units(5),
            provider: Some("Plasticorp".to_string()),
        };
        assert!(validate_material(&material).is_ok());

        material.available = Quantity::from_milli(-1);
        assert!(validate_material(&material).is_err());
    }

    #[test]
    fn test_validate_replenishment() {
        use crate::types::ReplenishmentStatus;
        use chrono::NaiveDate;

        let mut order = ReplenishmentOrder {
            id: "RE-771".to_string(),
            material_id: "INS-001".to_string(),
            quantity: Quantity::from_units(200),
            ordered_on: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            status: ReplenishmentStatus::InTransit,
            expected_on: NaiveDate::from_ymd_opt(2024, 5, 25),
        };
        assert!(validate_replenishment(&order).is_ok());

        order.expected_on = NaiveDate::from_ymd_opt(2024, 5, 19);
        assert!(validate_replenishment(&order).is_err());

        order.expected_on = None;
        order.quantity = Quantity::zero();
        assert!(matches!(
            validate_replenishment(&order),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(1600).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
