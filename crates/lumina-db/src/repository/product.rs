//! # Catalog Repository
//!
//! Read access to sellable products and their bills of materials.
//!
//! ## Storage Layout
//! ```text
//! products                         product_materials
//! ┌────────────┬──────┬───────┐    ┌────────────┬─────┬─────────┬───────┐
//! │ id         │ ...  │ stock │    │ product_id │ pos │ material│ milli │
//! ├────────────┼──────┼───────┤    ├────────────┼─────┼─────────┼───────┤
//! │ POS-LX-004 │ ...  │   3   │───<│ POS-LX-004 │  0  │ INS-001 │ 3000  │
//! │            │      │       │    │ POS-LX-004 │  1  │ INS-002 │  500  │
//! └────────────┴──────┴───────┘    └────────────┴─────┴─────────┴───────┘
//! ```
//!
//! `position` keeps the declared order of the bill of materials, which is
//! the order denials are reported in.
//!
//! The only writes here are the seed inserts; stock moves exclusively through
//! [`CheckoutRepository::commit`](crate::repository::checkout::CheckoutRepository::commit).

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use lumina_core::{Category, MaterialRequirement, Money, Product, Quantity};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: Category,
    description: Option<String>,
    unit_price_cents: i64,
    finished_stock: i64,
    max_stock: i64,
}

#[derive(Debug, FromRow)]
struct RequirementRow {
    product_id: String,
    material_id: String,
    quantity_per_unit_milli: i64,
}

impl ProductRow {
    fn into_product(self, required_materials: Vec<MaterialRequirement>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            category: self.category,
            unit_price: Money::from_cents(self.unit_price_cents),
            finished_stock: self.finished_stock,
            max_stock: self.max_stock,
            required_materials,
            description: self.description,
        }
    }
}

impl From<RequirementRow> for MaterialRequirement {
    fn from(row: RequirementRow) -> Self {
        MaterialRequirement {
            material_id: row.material_id,
            quantity_per_unit: Quantity::from_milli(row.quantity_per_unit_milli),
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, category, description, unit_price_cents, finished_stock, max_stock";

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.products();
///
/// let product = catalog.get_by_id("POS-LX-001").await?;
/// let neon = catalog.search("open", Some(Category::Neon)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a product, with its bill of materials, by id.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - found
    /// * `Ok(None)` - no such product
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let requirements: Vec<RequirementRow> = sqlx::query_as(
            r#"
            SELECT product_id, material_id, quantity_per_unit_milli
            FROM product_materials
            WHERE product_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let requirements = requirements.into_iter().map(Into::into).collect();
        Ok(Some(row.into_product(requirements)))
    }

    /// Fetches several products at once, in the order of `ids`.
    ///
    /// Missing ids are simply absent from the result.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get_by_id(id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    /// The whole catalog, ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS);
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        self.attach_requirements(rows).await
    }

    /// Name/id search with an optional category filter.
    ///
    /// ## How It Works
    /// ```text
    /// query "open", category Neon
    ///      │
    ///      ▼
    /// WHERE (name LIKE '%open%' OR id LIKE '%open%') AND category = 'neon'
    ///      │
    ///      ▼
    /// [POS-LX-004 Letrero "Open" Std]
    /// ```
    ///
    /// An empty query lists the whole category (or the whole catalog).
    /// `%` and `_` typed by the operator are matched literally.
    pub async fn search(&self, query: &str, category: Option<Category>) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, category = ?category, "Searching catalog");

        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE (name LIKE ?1 ESCAPE '\' OR id LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR category = ?2)
            ORDER BY id
            "#,
            PRODUCT_COLUMNS
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(pattern)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        self.attach_requirements(rows).await
    }

    /// Counts catalog entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Loads bills of materials for `rows` in one query and joins them.
    async fn attach_requirements(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let requirements: Vec<RequirementRow> = sqlx::query_as(
            r#"
            SELECT product_id, material_id, quantity_per_unit_milli
            FROM product_materials
            ORDER BY product_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<String, Vec<MaterialRequirement>> = HashMap::new();
        for row in requirements {
            by_product
                .entry(row.product_id.clone())
                .or_default()
                .push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let requirements = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(requirements)
            })
            .collect())
    }
}

/// Inserts a product and its bill of materials. Seed-only.
pub(crate) async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, category, description, unit_price_cents,
            finished_stock, max_stock, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.category)
    .bind(&product.description)
    .bind(product.unit_price.cents())
    .bind(product.finished_stock)
    .bind(product.max_stock)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for (position, requirement) in product.required_materials.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO product_materials (product_id, position, material_id, quantity_per_unit_milli)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&product.id)
        .bind(position as i64)
        .bind(&requirement.material_id)
        .bind(requirement.quantity_per_unit.milli())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::SeedData;
    use crate::{Database, DbConfig};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.seed(&SeedData::embedded().unwrap()).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_by_id_keeps_bom_order() {
        let db = seeded().await;

        let sign = db.products().get_by_id("POS-LX-004").await.unwrap().unwrap();
        assert_eq!(sign.finished_stock, 3);
        assert_eq!(sign.unit_price, Money::from_major_minor(1850, 0));

        let ids: Vec<&str> = sign
            .required_materials
            .iter()
            .map(|r| r.material_id.as_str())
            .collect();
        assert_eq!(ids, vec!["INS-001", "INS-002"]);
        assert_eq!(
            sign.required_materials[1].quantity_per_unit,
            Quantity::from_milli(500)
        );

        assert!(db.products().get_by_id("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = seeded().await;

        let all = db.products().list().await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].id, "POS-LX-001");
        assert_eq!(all[0].required_materials.len(), 1);
        assert_eq!(db.products().count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_search_by_name_and_category() {
        let db = seeded().await;
        let catalog = db.products();

        let services = catalog.search("", Some(Category::Service)).await.unwrap();
        let ids: Vec<&str> = services.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["POS-LX-002", "POS-LX-005"]);

        let open = catalog.search("open", None).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "POS-LX-004");

        let none = catalog.search("open", Some(Category::Accessory)).await.unwrap();
        assert!(none.is_empty());

        let by_id = catalog.search("LX-006", None).await.unwrap();
        assert_eq!(by_id[0].name, "Kit Conectores X10");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = seeded().await;

        assert!(db.products().search("%", None).await.unwrap().is_empty());
        assert!(db.products().search("_", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let db = seeded().await;
        let ids = vec![
            "POS-LX-003".to_string(),
            "MISSING".to_string(),
            "POS-LX-001".to_string(),
        ];

        let products = db.products().get_many(&ids).await.unwrap();
        let found: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(found, vec!["POS-LX-003", "POS-LX-001"]);
    }
}
