//! # Catalog Seed Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 150 products (default)
//! cargo run -p basket-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p basket-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p basket-db --bin seed -- --db ./data/basket.db
//! ```
//!
//! ## Generated Products
//! Each product has:
//! - Name: `{base} {size}`
//! - Price: 1.99 - 9.99 plus a size addon
//! - Stock: 0 - 100
//! - VAT band cycling through 1%, 8% and 18%

use std::env;

use basket_core::{Money, Product, VatRate};
use basket_db::{Database, DbConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Base product names, grouped by the VAT band they usually fall in.
const CATALOG: &[(VatRate, &[&str])] = &[
    (
        VatRate::LOW,
        &["Bread", "Milk", "Eggs", "Rice", "Flour", "Sugar", "Butter", "Cheese", "Yogurt", "Pasta"],
    ),
    (
        VatRate::STANDARD,
        &["Coffee", "Tea", "Orange Juice", "Chocolate", "Cookies", "Cereal", "Honey", "Jam", "Olive Oil", "Chips"],
    ),
    (
        VatRate::HIGH,
        &["Shampoo", "Soap", "Toothpaste", "Detergent", "Batteries", "Light Bulb", "Notebook", "Pen", "Umbrella", "Candle"],
    ),
];

/// Size variants with a price addon in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 350),
    ("Twin Pack", 300),
    ("Multi Pack", 500),
];

const DEFAULT_COUNT: usize = 150;
const DEFAULT_DB_PATH: &str = "./basket_dev.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,basket_db=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut db_path = String::from(DEFAULT_DB_PATH);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    count = value.parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    db_path = value.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Basket Engine Catalog Seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Catalog already populated, skipping seed (delete the database file to regenerate)");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (vat_rate, names) in CATALOG {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated * 31 + name_idx * 7 + size_idx;
                let product = generate_product(name, size, *price_addon, *vat_rate, seed);

                if let Err(e) = db.products().insert(&product).await {
                    error!(name = %product.name, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(name: &str, size: &str, price_addon: i64, vat_rate: VatRate, seed: usize) -> Product {
    // 1.99 - 9.99 plus the size addon
    let base_cents = 199 + ((seed * 17) % 801) as i64;
    let stock = (seed % 101) as i64;

    Product::new(
        format!("{name} {size}"),
        Money::from_minor(base_cents + price_addon),
        vat_rate,
        stock,
    )
}
