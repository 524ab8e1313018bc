//! Command-line interface definitions
//!
//! ```bash
//! brick-enricher refresh-catalog
//! brick-enricher sync-collection
//! brick-enricher resolve M50301 N1234
//! brick-enricher search castle
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Enrich store product keys with registry metadata and keep a searchable
/// snapshot of the store listing.
#[derive(Debug, Parser)]
#[command(name = "brick-enricher")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Registry credential for this run only (not persisted)
    #[arg(long, global = true, env = "REBRICKABLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download the catalog tables and rebuild the local catalog
    RefreshCatalog,
    /// Build the catalog once if it was never built
    Bootstrap,
    /// Walk the store listing and replace the collection snapshot
    SyncCollection,
    /// Look up a catalog id in the local catalog
    Lookup(LookupArgs),
    /// Resolve product keys against the registry (cache first)
    Resolve(ResolveArgs),
    /// Search the collection snapshot
    Search(SearchArgs),
    /// Store the registry credential
    SetCredential(SetCredentialArgs),
    /// Remove the stored registry credential
    ClearCredential,
    /// Show snapshot timestamps and sizes
    Status,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Catalog id, e.g. 10305
    pub catalog_id: String,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Product keys, e.g. M50301
    #[arg(required = true, num_args = 1..)]
    pub keys: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Args)]
pub struct SetCredentialArgs {
    pub value: String,
}
