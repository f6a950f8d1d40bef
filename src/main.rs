use anyhow::Result;
use carhunter::inventory::Facets;
use carhunter::migrate;
use carhunter::store::{DocumentStore, Firestore, FirestoreConfig};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carhunter", about = "Dealership back-office maintenance tools")]
struct Cli {
    /// Firebase project holding the listing collection
    #[arg(long, env = "CARHUNTER_PROJECT_ID")]
    project_id: String,

    /// Web API key for store access
    #[arg(long, env = "CARHUNTER_API_KEY")]
    api_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current inventory and save it to inventory.json
    Inventory,
    /// Give every slug-less listing a unique slug
    MigrateSlugs {
        /// Log what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Firestore::new(FirestoreConfig::new(cli.project_id, cli.api_key))?;

    match cli.command {
        Command::Inventory => print_inventory(&store).await?,
        Command::MigrateSlugs { dry_run } => {
            info!("Starting slug migration...");
            let report = migrate::backfill_slugs(&store, dry_run).await?;
            info!("Migration complete!");
            info!("Updated: {}", report.updated);
            info!("Skipped: {}", report.skipped);
        }
    }

    Ok(())
}

async fn print_inventory(store: &Firestore) -> Result<()> {
    info!("🚗 CarHunter — dealership inventory");
    let listings = store.list().await?;
    info!("✅ Fetched {} listings\n", listings.len());

    for (i, listing) in listings.iter().enumerate() {
        println!("{}. {} ({})", i + 1, listing.display_name(), listing.year);
        println!("   RM {}", listing.price_range);
        let mileage = if listing.mileage.is_empty() {
            "N/A"
        } else {
            listing.mileage.as_str()
        };
        println!("   {} • {} • {}", listing.body_type, listing.transmission, mileage);
        println!("   Status: {}", listing.status.as_str());
        if listing.featured {
            println!("   ★ Featured");
        }
        if let Some(slug) = &listing.slug {
            println!("   Slug: {slug}");
        }
        println!("   ID: {}", listing.id);
        println!();
    }

    let facets = Facets::collect(&listings);
    info!("Brands on the lot: {}", facets.brands.join(", "));

    // Save to JSON for offline inspection
    let json = serde_json::to_string_pretty(&listings)?;
    tokio::fs::write("inventory.json", json).await?;
    info!("💾 Saved {} listings to inventory.json", listings.len());

    Ok(())
}
