//! # lumina-db: Database Layer for Lumina Ops
//!
//! SQLite storage for the catalog, the raw material ledger and completed
//! checkouts, using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lumina Ops Data Flow                             │
//! │                                                                         │
//! │  Terminal command (add / checkout)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     lumina-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌──────────────┐  │    │
//! │  │   │   Database    │    │  Repositories    │   │  Migrations  │  │    │
//! │  │   │   (pool.rs)   │◄───│  Catalog         │   │  (embedded)  │  │    │
//! │  │   │               │    │  Material        │   │              │  │    │
//! │  │   │  SqlitePool   │    │  Checkout        │   │  001_init    │  │    │
//! │  │   └───────────────┘    └──────────────────┘   └──────────────┘  │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (lumina.db)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, material and checkout repositories
//! - [`seed`] - Static catalog loading
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lumina_db::{Database, DbConfig, SeedData};
//!
//! let db = Database::new(DbConfig::new("lumina.db")).await?;
//! db.seed_if_empty(&SeedData::embedded()?).await?;
//!
//! let neon = db.products().search("", Some(Category::Neon)).await?;
//! let low = db.materials().low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use seed::SeedData;

pub use repository::checkout::{
    generate_checkout_id, CheckoutRepository, NewCheckout, NewCheckoutLine,
};
pub use repository::material::MaterialRepository;
pub use repository::product::CatalogRepository;
