//! # Repository Module
//!
//! Database repositories, one per aggregate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CatalogRepository     get_by_id, get_many, list, search, count        │
//! │  MaterialRepository    get_by_id, list, ledger_for, ledger, low_stock  │
//! │  CheckoutRepository    commit (the only stock write), recent, lines    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Seeding writes through crate-private insert helpers and is not part of
//! any repository's public surface.

pub mod checkout;
pub mod material;
pub mod product;
