//! # State Module
//!
//! Everything a command needs, passed in explicitly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐               │
//! │  │   Database   │  │  CartState   │  │  TerminalConfig  │               │
//! │  │              │  │              │  │                  │               │
//! │  │  SQLite pool │  │  Arc<Mutex<  │  │  store_name      │               │
//! │  │  (shared by  │  │    Session   │  │  tax_rate_bps    │               │
//! │  │   sessions)  │  │  >>          │  │  timeout         │               │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘               │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • Database: internal connection pool, clone freely                     │
//! │  • CartState: one session per operator, Mutex held only briefly         │
//! │  • TerminalConfig: read-only after start-up                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;

pub use cart::{CartState, ProcessingGuard};

use lumina_db::Database;

use crate::checkout::{CheckoutFinalizer, InstantSettlement};
use crate::config::TerminalConfig;

/// The terminal's state, built once at start-up.
pub struct AppState {
    pub db: Database,
    pub cart: CartState,
    pub config: TerminalConfig,
    pub finalizer: CheckoutFinalizer<InstantSettlement>,
}

impl AppState {
    pub fn new(db: Database, config: TerminalConfig) -> Self {
        let cart = CartState::new(config.tax_rate());
        let finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement)
            .with_timeout(config.settlement_timeout());

        AppState {
            db,
            cart,
            config,
            finalizer,
        }
    }
}
