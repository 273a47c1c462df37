//! # Demo Shop Seeder
//!
//! Creates a bike shop with a stocked catalog, one sale and one open
//! repair job, for local development.
//!
//! ## Usage
//! ```bash
//! # Database from VELO_DB_PATH (default ./velo.db)
//! cargo run -p velo-db --bin seed
//!
//! # Explicit path and shop name
//! cargo run -p velo-db --bin seed -- --db ./data/dev.db --shop "Spoke & Chain"
//! ```
//!
//! Each run creates a new shop; existing shops are left alone.

use std::env;

use tracing_subscriber::EnvFilter;
use velo_core::cart::{CartLine, Checkout};
use velo_core::repair::{EquipmentItem, JobCustomer, NewLabor, NewPart, NewRepairJob};
use velo_core::{ActorContext, Priority};
use velo_db::{Database, NewProduct, PosConfig};

/// (sku, name, price, cost, stock)
const CATALOG: &[(&str, &str, i64, i64, i64)] = &[
    ("TUB-700C", "Inner Tube 700x25c", 899, 320, 40),
    ("TUB-29", "Inner Tube 29x2.2", 1099, 410, 25),
    ("TYR-GP5K", "Road Tyre 700x28c", 6499, 3900, 12),
    ("BRK-PAD-R", "Rim Brake Pads (pair)", 1299, 450, 30),
    ("BRK-PAD-D", "Disc Brake Pads (resin)", 2199, 900, 20),
    ("CHN-11S", "Chain 11-speed", 3499, 1800, 15),
    ("CBL-SHF", "Shift Cable", 599, 150, 50),
    ("CBL-BRK", "Brake Cable", 699, 180, 50),
    ("TAP-BAR", "Bar Tape", 2499, 1100, 10),
    ("LUB-WET", "Wet Chain Lube 120ml", 1199, 500, 24),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PosConfig::from_env()?;
    init_tracing(&config.log_filter);

    let mut shop_name = String::from("Velo Works");
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.db_path = path.into();
                    i += 1;
                }
            }
            "--shop" | "-s" => {
                if let Some(name) = args.get(i + 1) {
                    shop_name = name.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Velo POS demo seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file (default: $VELO_DB_PATH or ./velo.db)");
                println!("  -s, --shop <NAME>   Shop name (default: Velo Works)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    println!("Velo POS demo seeder");
    println!("====================");
    println!("Database: {}", config.db_path.display());

    let db = Database::new(config.db_config()).await?;
    let shop = db.shops().create(&shop_name).await?;
    println!("Shop:     {} ({})", shop.name, shop.id);

    let mut product_ids = Vec::with_capacity(CATALOG.len());
    for (sku, name, price_cents, cost_cents, quantity) in CATALOG {
        let product = db
            .products()
            .create(
                &shop.id,
                NewProduct {
                    sku: Some(sku.to_string()),
                    name: name.to_string(),
                    price_cents: *price_cents,
                    cost_cents: *cost_cents,
                    quantity: *quantity,
                },
            )
            .await?;
        product_ids.push(product.id);
    }
    println!("Products: {}", db.products().count(&shop.id).await?);

    let actor = ActorContext::new(&shop.id, "seed");

    let checkout = Checkout::new("cash")
        .line(CartLine::product(&product_ids[0], 2, CATALOG[0].2))
        .line(CartLine::product(&product_ids[9], 1, CATALOG[9].2))
        .line(CartLine::manual("Valve adapter", 1, 250))
        .customer("Ana Ortiz", "555 0100");
    let sale = db.sales().create_sale(&actor, &checkout).await?.sale;
    println!("Sale:     {} total {}", sale.invoice_number, sale.total());

    let repairs = db.repairs();
    let job = repairs
        .create_job(
            &actor,
            NewRepairJob {
                customer: JobCustomer {
                    name: "Ben Narayan".into(),
                    phone: Some("555 0101".into()),
                    email: None,
                },
                item: EquipmentItem {
                    item_type: Some("Road bike".into()),
                    brand: Some("Bianchi".into()),
                    model: Some("Sprint".into()),
                    ..Default::default()
                },
                description: "Replace chain, adjust gears".into(),
                priority: Priority::High,
                deposit_cents: 2000,
                ..Default::default()
            },
        )
        .await?;
    repairs
        .add_part(
            &actor,
            &job.id,
            NewPart {
                product_id: Some(product_ids[5].clone()),
                quantity: 1,
                unit_price_cents: CATALOG[5].2,
                ..Default::default()
            },
        )
        .await?;
    let job = repairs
        .add_labor(
            &actor,
            &job.id,
            NewLabor {
                description: "Drivetrain service".into(),
                hours_hundredths: 75,
                hourly_rate_cents: 6000,
            },
        )
        .await?;
    println!(
        "Job:      {} total {} balance {}",
        job.job_number,
        job.total_cost(),
        velo_core::Money::from_cents(job.remaining_balance_cents)
    );

    db.close().await;
    println!();
    println!("Seed complete.");
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_filter},sqlx=warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
