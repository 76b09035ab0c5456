use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, prepare_database_url},
    format_eur, CapabilityProbe, CatalogClient, Configurator, ConfiguratorView,
};
use shared::domain::{AccessoryId, ItemId, ViewMode};
use storage::{DraftStore, Storage};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Drives one configuration session and prints its price breakdown.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    item_id: i64,
    /// Optional accessory to select; repeat for several.
    #[arg(long = "select")]
    selected: Vec<i64>,
    /// Raw quantity text, sanitized the same way as the quantity field.
    #[arg(long, default_value = "1")]
    quantity: String,
    /// Switch to the interactive 3D view when a model is available.
    #[arg(long)]
    interactive: bool,
    /// Append the configuration to the local cart.
    #[arg(long)]
    commit: bool,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url.clone() {
        settings.api_url = api_url.trim_end_matches('/').to_string();
    }
    settings.validate()?;

    let storage = Storage::new(&prepare_database_url(&settings.database_url))
        .await
        .context("failed to open local storage")?;
    storage.health_check().await?;
    let drafts = DraftStore::new(Arc::new(storage), settings.cart_record_name.clone());
    let catalog = CatalogClient::new(settings.api_url.clone());
    let probe = CapabilityProbe::with_client(catalog.http().clone(), settings.asset_base_url.clone());
    let configurator = Configurator::new(catalog, probe, drafts);

    configurator.select_item(ItemId(args.item_id)).await;
    let wait = Duration::from_secs(args.timeout_secs);
    tokio::time::timeout(wait, wait_for_sources(&configurator))
        .await
        .context("catalogue backend did not answer in time")?;

    for id in &args.selected {
        if !configurator.toggle_accessory(AccessoryId(*id)).await {
            warn!(accessory_id = id, "accessory is not offered for this item");
        }
    }
    configurator.set_quantity_input(&args.quantity).await;

    if args.interactive {
        let capability_ready = async {
            loop {
                if configurator.snapshot().await.capability.is_settled() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(wait, capability_ready).await.is_err()
            || !configurator.set_view_mode(ViewMode::Interactive3d).await
        {
            warn!("no 3D model available; staying on the flat image");
        }
    }

    let view = configurator.snapshot().await;
    if let Some(err) = &view.item.error {
        bail!("item {} could not be loaded: {err}", args.item_id);
    }
    print_view(&view);

    if args.commit {
        let draft = configurator.commit().await?;
        println!(
            "Committed: {}",
            serde_json::to_string(&draft).context("failed to encode draft")?
        );
    }

    configurator.close();
    Ok(())
}

async fn wait_for_sources(configurator: &Configurator) {
    let mut item = configurator.item_updates();
    let mut defaults = configurator.default_accessories_updates();
    let mut optionals = configurator.optional_accessories_updates();
    let _ = item.wait_for(|r| !r.loading).await;
    let _ = defaults.wait_for(|r| !r.loading).await;
    let _ = optionals.wait_for(|r| !r.loading).await;
}

fn print_view(view: &ConfiguratorView) {
    let Some(item) = &view.item.data else {
        println!("No item loaded.");
        return;
    };
    println!("{} ({})", item.name, item.image);

    for accessory in view.default_accessories.data.iter().flatten() {
        println!("  included  {:<32} {}", accessory.name, format_eur(accessory.unit_price));
    }
    if let Some(err) = &view.default_accessories.error {
        println!("  included accessories unavailable: {err}");
    }
    for accessory in view.optional_accessories.data.iter().flatten() {
        let mark = if view.is_selected(accessory.id) { "[x]" } else { "[ ]" };
        println!(
            "  {mark} #{:<4} {:<28} {}",
            accessory.id,
            accessory.name,
            format_eur(accessory.unit_price)
        );
    }
    if let Some(err) = &view.optional_accessories.error {
        println!("  optional accessories unavailable: {err}");
    }

    println!("View: {:?} (3D capability: {:?})", view.view_mode, view.capability);
    if let (Some(model_url), Some(ar_url)) = (&view.model_url, &view.ar_viewer_url) {
        println!("Model: {model_url}");
        println!("AR viewer: {ar_url}");
    }

    if let Some(breakdown) = &view.breakdown {
        println!("Quantity: {}", breakdown.quantity);
        println!("Item:        {}", format_eur(breakdown.item_line_total()));
        println!("Included:    {}", format_eur(breakdown.default_line_total()));
        println!("Options:     {}", format_eur(breakdown.optional_line_total()));
        println!("Total:       {}", format_eur(breakdown.total));
    }
}
