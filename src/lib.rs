//! Brick Enricher - store product enrichment and listing snapshots
//!
//! Resolves store-side product keys (`M12345`) to registry metadata through
//! a cached, quota-limited, deduplicating resolver, and keeps a searchable
//! snapshot of the paginated store listing enriched from a locally built
//! catalog.

pub mod application;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::state::AppState;
use crate::cli::{Cli, Commands};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::{init_logging_with_config, log_system_info};

/// Runs one CLI invocation to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config().await?;

    init_logging_with_config(&config.logging)?;
    log_system_info();
    info!("Configuration loaded from {}", config_manager.config_path().display());

    let state = Arc::new(AppState::open(config).await?);
    if let Some(api_key) = &cli.api_key {
        state.credentials.override_for_session(api_key);
    }

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    let shutdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; cancelling");
            ctrl_c_token.cancel();
            shutdown_state.shutdown();
        }
    });

    let outcome = execute(&state, cli.command, cli.json, &cancellation_token).await;
    state.shutdown();
    outcome
}

async fn execute(
    state: &AppState,
    command: Commands,
    json: bool,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::RefreshCatalog => {
            let entries = commands::run_refresh_catalog(state, cancellation_token)
                .await
                .map_err(|e| anyhow!(e))?;
            print_line(json, &entries, format!("Catalog refreshed: {entries} sets"))
        }
        Commands::Bootstrap => {
            let ran = commands::bootstrap(state, cancellation_token)
                .await
                .map_err(|e| anyhow!(e))?;
            let text = if ran {
                "Initial catalog built"
            } else {
                "Initial catalog already present"
            };
            print_line(json, &ran, text.to_string())
        }
        Commands::SyncCollection => {
            let snapshot = commands::run_sync_collection(state, cancellation_token)
                .await
                .map_err(|e| anyhow!(e))?;
            print_line(json, &snapshot.len(), format!("Synced {} products", snapshot.len()))
        }
        Commands::Lookup(args) => {
            let entry = commands::lookup(state, &args.catalog_id).await;
            let text = match &entry {
                Some(entry) => format!(
                    "{} - {} ({}) [{}]",
                    entry.catalog_id,
                    entry.name,
                    entry.year.map(|y| y.to_string()).unwrap_or_default(),
                    entry.theme_name
                ),
                None => format!("{}: not in catalog", args.catalog_id),
            };
            print_line(json, &entry, text)
        }
        Commands::Resolve(args) => {
            let results = commands::resolve_many(state, &args.keys, cancellation_token).await;
            if json {
                return print_json(&results);
            }
            for (key, result) in args.keys.iter().zip(&results) {
                match result {
                    Some(set) if set.is_parts_pack() => println!("{key}: parts pack ({})", set.name),
                    Some(set) => println!("{}", set.display_title(key)),
                    None => println!("{key}: unresolved"),
                }
            }
            Ok(())
        }
        Commands::Search(args) => {
            let items = commands::search_collection(state, &args.query).await;
            if json {
                return print_json(&items);
            }
            for item in &items {
                println!("{}\t{}\t{}\t{}", item.store_id, item.catalog_id, item.name, item.url);
            }
            println!("{} match(es)", items.len());
            Ok(())
        }
        Commands::SetCredential(args) => {
            commands::set_credential(state, &args.value)
                .await
                .map_err(|e| anyhow!(e))?;
            print_line(json, &true, "Credential stored".to_string())
        }
        Commands::ClearCredential => {
            commands::clear_credential(state).await.map_err(|e| anyhow!(e))?;
            print_line(json, &true, "Credential cleared".to_string())
        }
        Commands::Status => {
            let status = commands::storage_status(state).await.map_err(|e| anyhow!(e))?;
            if json {
                return print_json(&status);
            }
            let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
                t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
            };
            println!(
                "Catalog: {} sets (updated {})",
                status.catalog_entries,
                fmt_time(status.catalog_last_updated)
            );
            println!(
                "Collection: {} products (synced {})",
                status.collection_items,
                fmt_time(status.collection_last_sync)
            );
            println!("Credential configured: {}", status.credential_configured);
            Ok(())
        }
    }
}

fn print_line<T: Serialize>(json: bool, value: &T, text: String) -> Result<()> {
    if json {
        print_json(value)
    } else {
        println!("{text}");
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
