use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, prepare_database_url},
    format_eur, CatalogClient,
};
use storage::{DraftStore, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured database URL.
    #[arg(long)]
    database_url: Option<String>,
    /// Overrides the configured catalogue API URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or reset the local cart.
    Drafts {
        #[command(subcommand)]
        action: DraftsAction,
    },
    /// List the catalogue categories.
    Categories,
    /// Show the catalogue price bounds used by the filter.
    PriceRange,
    /// List every local record name.
    Records,
}

#[derive(Subcommand, Debug)]
enum DraftsAction {
    List {
        /// Print the raw JSON of each draft.
        #[arg(long)]
        json: bool,
    },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();
    let settings = load_settings();

    match cli.command {
        Command::Drafts { action } => {
            let database_url = cli.database_url.unwrap_or(settings.database_url);
            let storage = Storage::new(&prepare_database_url(&database_url))
                .await
                .context("failed to open local storage")?;
            let drafts = DraftStore::new(Arc::new(storage), settings.cart_record_name);

            match action {
                DraftsAction::List { json } => {
                    let entries = drafts.read_all().await?;
                    if entries.is_empty() {
                        println!("cart is empty");
                    }
                    for (index, draft) in entries.iter().enumerate() {
                        if json {
                            println!("{}", serde_json::to_string(draft)?);
                            continue;
                        }
                        println!(
                            "{:>3}. {} x{} = {}{}",
                            index + 1,
                            draft.item_name,
                            draft.quantity,
                            format_eur(draft.total_price),
                            draft
                                .committed_at
                                .map(|at| format!(" ({})", at.to_rfc3339()))
                                .unwrap_or_default()
                        );
                    }
                }
                DraftsAction::Clear => {
                    if drafts.clear().await? {
                        println!("cleared record '{}'", drafts.record_name());
                    } else {
                        println!("nothing to clear");
                    }
                }
            }
        }
        Command::Categories => {
            let catalog = CatalogClient::new(cli.api_url.unwrap_or(settings.api_url));
            for category in catalog.list_categories().await? {
                println!("{}\t{}", category.id, category.name);
            }
        }
        Command::PriceRange => {
            let catalog = CatalogClient::new(cli.api_url.unwrap_or(settings.api_url));
            match catalog.price_range().await? {
                Some(range) => println!("{} - {}", format_eur(range.min), format_eur(range.max)),
                None => println!("catalogue is empty"),
            }
        }
        Command::Records => {
            let database_url = cli.database_url.unwrap_or(settings.database_url);
            let storage = Storage::new(&prepare_database_url(&database_url))
                .await
                .context("failed to open local storage")?;
            storage.health_check().await?;
            for name in storage.list_record_names().await? {
                println!("{name}");
            }
        }
    }

    Ok(())
}
