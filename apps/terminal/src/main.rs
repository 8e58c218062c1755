//! # Lumina Terminal Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration
//! 3. Connect to database & run migrations
//! 4. Seed the catalog if the database is new
//! 5. Run the command loop until `quit` or end of input

#[tokio::main]
async fn main() {
    // The actual setup is in lib.rs so tests can drive the same pieces
    if let Err(e) = lumina_terminal::run().await {
        eprintln!("lumina-terminal: {}", e);
        std::process::exit(1);
    }
}
