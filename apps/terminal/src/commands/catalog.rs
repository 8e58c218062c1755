//! # Catalog Commands
//!
//! Read-only views of the product catalog.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::TerminalConfig;
use crate::error::ApiError;
use lumina_core::validation::{validate_item_id, validate_search_query};
use lumina_core::{Category, MaterialRequirement, Money, Product};
use lumina_db::Database;

/// Product card as shown on the catalog grid.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub unit_price: Money,
    /// `unit_price` formatted with the configured currency.
    pub price_display: String,
    pub finished_stock: i64,
    pub max_stock: i64,
    /// Stock bar fill, 0..=10000.
    pub stock_fill_bps: u32,
    pub out_of_stock: bool,
    pub required_materials: Vec<MaterialRequirement>,
}

impl ProductDto {
    pub fn new(product: Product, config: &TerminalConfig) -> Self {
        ProductDto {
            price_display: config.format_currency(product.unit_price),
            stock_fill_bps: product.stock_fill_bps(),
            out_of_stock: product.is_out_of_stock(),
            id: product.id,
            name: product.name,
            category: product.category,
            description: product.description,
            unit_price: product.unit_price,
            finished_stock: product.finished_stock,
            max_stock: product.max_stock,
            required_materials: product.required_materials,
        }
    }
}

/// The whole catalog, ordered by id.
pub async fn list_products(
    db: &Database,
    config: &TerminalConfig,
) -> Result<Vec<ProductDto>, ApiError> {
    debug!("list_products command");
    let products = db.products().list().await?;
    Ok(products
        .into_iter()
        .map(|p| ProductDto::new(p, config))
        .collect())
}

/// Name/id search, optionally within one category.
///
/// ## Arguments
/// * `query` - Search text; empty lists everything in `category`
/// * `category` - `neon`, `accessory` or `service`
pub async fn search_products(
    db: &Database,
    config: &TerminalConfig,
    query: &str,
    category: Option<Category>,
) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(query).map_err(|e| ApiError::validation(e.to_string()))?;

    debug!(query = %query, category = ?category, "search_products command");

    let products = db.products().search(&query, category).await?;
    let dtos: Vec<ProductDto> = products
        .into_iter()
        .map(|p| ProductDto::new(p, config))
        .collect();

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        query = %query,
        "search_products complete"
    );

    Ok(dtos)
}

/// One product by id.
pub async fn get_product(
    db: &Database,
    config: &TerminalConfig,
    id: &str,
) -> Result<ProductDto, ApiError> {
    validate_item_id(id).map_err(|e| ApiError::validation(e.to_string()))?;

    let product = db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(ProductDto::new(product, config))
}
