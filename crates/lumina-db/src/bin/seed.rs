//! # Seed Loader
//!
//! Writes the shop catalog and raw material ledger into a database file.
//!
//! ## Usage
//! ```bash
//! # Embedded catalog into ./lumina_dev.db
//! cargo run -p lumina-db --bin seed
//!
//! # Custom catalog and path
//! cargo run -p lumina-db --bin seed -- --file catalog.json --db ./data/lumina.db
//! ```

use std::env;
use std::path::PathBuf;

use lumina_db::{Database, DbConfig, SeedData};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./lumina_dev.db");
    let mut seed_file: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    seed_file = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lumina Ops Seed Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./lumina_dev.db)");
                println!("  -f, --file <PATH>   Seed JSON (default: embedded catalog)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let data = match &seed_file {
        Some(path) => SeedData::from_path(path)?,
        None => SeedData::embedded()?,
    };

    println!("Lumina Ops Seed Loader");
    println!("======================");
    println!("Database:  {}", db_path);
    println!(
        "Catalog:   {}",
        seed_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "embedded".to_string())
    );
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    if !db.seed_if_empty(&data).await? {
        let existing = db.products().count().await?;
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed. Delete the database file to reload.");
        return Ok(());
    }

    println!(
        "✓ Seeded {} products, {} raw materials and {} supplier orders",
        data.products.len(),
        data.materials.len(),
        data.replenishments.len()
    );

    let low = db.materials().low_stock().await?;
    if !low.is_empty() {
        println!();
        println!("Below reorder threshold:");
        for material in low {
            println!(
                "  {} {}: {} {} (min {})",
                material.id, material.name, material.available, material.unit, material.minimum_threshold
            );
            for order in db.materials().open_orders(&material.id).await? {
                println!("    {} {} {:?}", order.id, order.quantity, order.status);
            }
        }
    }

    Ok(())
}
