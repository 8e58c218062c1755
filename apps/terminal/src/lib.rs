//! # lumina-terminal
//!
//! Point-of-sale host for Lumina Ops: a line-oriented command loop over
//! stdin that prints one JSON object per command on stdout. Logs go to
//! stderr.
//!
//! ```text
//! $ lumina-terminal
//! add POS-LX-001
//! {"ok":true,"data":{"lines":[...],"totals":{...},"phase":"idle",...}}
//! checkout
//! {"ok":true,"data":{"checkout_id":"...","total":145000,...}}
//! ```

pub mod checkout;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use std::future::Future;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::{Command, Response};
use config::TerminalConfig;
use lumina_db::{Database, DbConfig, SeedData};
use state::AppState;

/// Runs the terminal.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging      tracing-subscriber, RUST_LOG, to stderr     │
/// │  2. Load Configuration      defaults → lumina.toml → LUMINA_* env       │
/// │  3. Connect to Database     SQLite WAL, run pending migrations          │
/// │  4. Seed                    embedded catalog, only into an empty DB     │
/// │  5. Command Loop            until `quit`, end of input or idle Ctrl-C   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Lumina Ops terminal");

    let config_path = std::env::var_os("LUMINA_CONFIG").map(PathBuf::from);
    let config = TerminalConfig::load(config_path)?;

    let db_path = config.resolve_database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    if config.seed_on_start && db.seed_if_empty(&SeedData::embedded()?).await? {
        info!("Embedded catalog seeded");
    }

    let state = AppState::new(db, config);
    info!(store = %state.config.store_name, "Ready");

    serve(&state, tokio::io::stdin(), tokio::io::stdout(), commands::ctrl_c).await?;

    state.db.close().await;
    info!("Terminal stopped");
    Ok(())
}

/// Reads commands line by line from `input` and writes one JSON response
/// per line to `output`. Blank lines are skipped; `quit` ends the loop.
///
/// `shutdown` is called afresh each time the loop waits for input, and the
/// loop stops if that future resolves first. A running command is never
/// interrupted by it; `checkout` listens for its own abort.
pub async fn serve<R, W, S, F>(
    state: &AppState,
    input: R,
    mut output: W,
    shutdown: S,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Fn() -> F,
    F: Future<Output = ()>,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown() => {
                info!("Shutdown requested at the prompt");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(command = %line, "Received command");

        let response = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => commands::execute(state, command).await,
            Err(e) => Response::failure(e),
        };

        output.write_all(response.to_line().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=lumina=trace` - Show trace for lumina crates only
/// - Default: `info,lumina=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lumina=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
