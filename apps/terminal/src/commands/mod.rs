//! # Terminal Commands
//!
//! Every command the operator can type.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (parsing, dispatch, response envelope)
//! ├── catalog.rs    ◄─── products, search
//! ├── inventory.rs  ◄─── materials, low-stock, replenishments
//! ├── cart.rs       ◄─── add, dec, rm, clear, cart
//! └── checkout.rs   ◄─── checkout, history, receipt
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin:   add POS-LX-001                                                │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  "add POS-LX-001".parse::<Command>()  → Command::Add("POS-LX-001")      │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  execute(&state, command)             → cart::add_to_cart(...)          │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  stdout:  {"ok":true,"data":{"lines":[...],"totals":{...}}}             │
//! │      or   {"ok":false,"error":{"code":"...","message":"..."}}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;

use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use lumina_core::Category;

// =============================================================================
// Command
// =============================================================================

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Products,
    Product(String),
    Search {
        query: String,
        category: Option<Category>,
    },
    Materials,
    LowStock,
    Replenishments(String),
    Add(String),
    Dec(String),
    Rm(String),
    Clear,
    Cart,
    Checkout,
    History(Option<u32>),
    Receipt(String),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ApiError;

    /// ```text
    /// search [--category <neon|accessory|service>] [text...]
    /// add | dec | rm | product <PRODUCT-ID>
    /// replenishments <MATERIAL-ID>
    /// history [limit]
    /// ```
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let rest: Vec<&str> = words.collect();

        let one_id = |rest: &[&str]| -> Result<String, ApiError> {
            match rest {
                [id] => Ok(id.to_string()),
                _ => Err(ApiError::bad_command(format!(
                    "'{}' takes exactly one id",
                    name
                ))),
            }
        };

        let command = match name.as_str() {
            "products" | "ls" => Command::Products,
            "product" | "show" => Command::Product(one_id(&rest)?),
            "search" | "find" => parse_search(&rest)?,
            "materials" | "insumos" => Command::Materials,
            "low-stock" | "low" => Command::LowStock,
            "replenishments" | "orders" => Command::Replenishments(one_id(&rest)?),
            "add" | "+" => Command::Add(one_id(&rest)?),
            "dec" | "-" => Command::Dec(one_id(&rest)?),
            "rm" | "remove" => Command::Rm(one_id(&rest)?),
            "clear" => Command::Clear,
            "cart" => Command::Cart,
            "checkout" | "pay" => Command::Checkout,
            "history" => match rest.as_slice() {
                [] => Command::History(None),
                [n] => Command::History(Some(n.parse().map_err(|_| {
                    ApiError::bad_command(format!("'{}' is not a valid limit", n))
                })?)),
                _ => return Err(ApiError::bad_command("history takes at most one limit")),
            },
            "receipt" => Command::Receipt(one_id(&rest)?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(ApiError::bad_command("Empty command")),
            other => {
                return Err(ApiError::bad_command(format!(
                    "Unknown command '{}'. Type 'help' for the list.",
                    other
                )))
            }
        };

        Ok(command)
    }
}

fn parse_search(words: &[&str]) -> Result<Command, ApiError> {
    let (category, text) = match words {
        ["--category" | "-c", category, text @ ..] => (Some(category.parse::<Category>()?), text),
        ["--category" | "-c"] => {
            return Err(ApiError::bad_command("--category needs a value"));
        }
        text => (None, text),
    };

    Ok(Command::Search {
        query: text.join(" "),
        category,
    })
}

const HELP: &[(&str, &str)] = &[
    ("products", "List the catalog"),
    ("product <ID>", "Show one product"),
    ("search [-c <category>] [text]", "Search by name or id"),
    ("materials", "Raw material ledger"),
    ("low-stock", "Materials below their reorder threshold"),
    ("replenishments <ID>", "Open supplier orders for a material"),
    ("add <ID>", "Add one unit to the cart"),
    ("dec <ID>", "Remove one unit (never below 1)"),
    ("rm <ID>", "Remove a line"),
    ("clear", "Empty the cart"),
    ("cart", "Show the cart"),
    ("checkout", "Settle and commit the cart (Ctrl-C aborts)"),
    ("history [n]", "Recent checkouts"),
    ("receipt <CHECKOUT-ID>", "Reprint a receipt"),
    ("quit", "Exit"),
];

// =============================================================================
// Response Envelope
// =============================================================================

/// One line of output.
#[derive(Debug, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Response {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// Compact JSON, one object per line.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"ok":false,"error":{{"code":"INTERNAL","message":"{}"}}}}"#,
                e
            )
        })
    }
}

impl<T: Serialize> From<Result<T, ApiError>> for Response {
    fn from(result: Result<T, ApiError>) -> Self {
        match result.and_then(|data| {
            serde_json::to_value(data).map_err(|e| ApiError::internal(e.to_string()))
        }) {
            Ok(value) => Response::success(value),
            Err(error) => {
                warn!(code = ?error.code, message = %error.message, "Command failed");
                Response::failure(error)
            }
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs one command against the terminal state.
///
/// `Quit` is handled by the caller and answers with an empty success here.
pub async fn execute(state: &AppState, command: Command) -> Response {
    let AppState {
        db,
        cart: session,
        config,
        finalizer,
    } = state;

    match command {
        Command::Products => catalog::list_products(db, config).await.into(),
        Command::Product(id) => catalog::get_product(db, config, &id).await.into(),
        Command::Search { query, category } => {
            catalog::search_products(db, config, &query, category)
                .await
                .into()
        }
        Command::Materials => inventory::list_materials(db).await.into(),
        Command::LowStock => inventory::low_stock(db).await.into(),
        Command::Replenishments(id) => inventory::replenishments(db, &id).await.into(),
        Command::Add(id) => cart_response(state, cart::add_to_cart(db, session, &id).await),
        Command::Dec(id) => cart_response(state, cart::decrement_item(session, &id)),
        Command::Rm(id) => cart_response(state, cart::remove_from_cart(session, &id)),
        Command::Clear => cart_response(state, cart::clear_cart(session)),
        Command::Cart => cart_response(state, Ok(cart::get_cart(session))),
        Command::Checkout => checkout::checkout(finalizer, session, config, ctrl_c())
            .await
            .into(),
        Command::History(limit) => {
            checkout::history(db, config, limit.unwrap_or(config.history_limit))
                .await
                .into()
        }
        Command::Receipt(id) => checkout::get_receipt(db, config, &id).await.into(),
        Command::Help => Response::success(
            HELP.iter()
                .map(|(usage, what)| serde_json::json!({ "usage": usage, "description": what }))
                .collect(),
        ),
        Command::Quit => Response::success(Value::Null),
    }
}

fn cart_response(
    state: &AppState,
    result: Result<lumina_core::CartSnapshot, ApiError>,
) -> Response {
    result
        .map(|snapshot| cart::CartResponse::new(snapshot, state.cart.phase(), &state.config))
        .into()
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
///
/// Each call registers a new listener, so a Ctrl-C consumed by a checkout
/// abort does not also end the command loop.
pub(crate) async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C; checkout cannot be aborted");
        std::future::pending::<()>().await;
    }
}
