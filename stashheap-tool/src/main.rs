mod commands;
mod config;
mod error;
mod fetch;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use stashheap_rocks::RocksStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{load_config, resolve_settings};
use crate::error::ToolError;
use crate::fetch::FeedCache;

#[derive(Parser)]
#[command(name = "stash")]
#[command(about = "Fetch the public stash feed and store it compacted", long_about = None)]
struct Cli {
    /// Path to the store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Path to the cached stash update
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get the latest stash update and cache it
    Fetch {
        /// Change id to continue from
        #[arg(long)]
        change_id: Option<String>,
    },
    /// Check that the cached stash update decodes
    Check,
    /// Add all property names in the cached stash update to the store
    AddNames,
    /// Look up the integer identifier of a property
    LookupProperty {
        /// Property name, e.g. "Quality"
        property: String,
    },
    /// Print the string behind a string heap id
    Resolve { id: u32 },
    /// Compact all stashes in the cached stash update
    TryCompact {
        /// Intern strings but don't write compact records
        #[arg(long)]
        dry_run: bool,
    },
}

fn open_store(path: &Path) -> Result<RocksStore, ToolError> {
    RocksStore::open(path).map_err(|source| ToolError::Store {
        path: path.to_path_buf(),
        source,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(load_config(), cli.store, cli.cache);
    let cache = FeedCache::new(settings.feed_url.clone(), settings.cache_path.clone())?;

    match cli.command {
        Command::Fetch { change_id } => {
            let feed = cache.fetch_and_update(change_id.as_deref()).await?;
            println!(
                "fetched stash update into {}, {} entries found, next change id {}",
                cache.path().display(),
                feed.stashes.len(),
                feed.next_change_id
            );
        }
        Command::Check => {
            let feed = cache.get_stored()?;
            println!(
                "read cached stash update, {} entries found",
                feed.stashes.len()
            );
        }
        Command::AddNames => {
            let feed = cache.get_stored()?;
            let store = open_store(&settings.store_path)?;
            let count = commands::add_names(&store, &feed).context("failed to add property names")?;
            println!("added property names, {} properties exist", count);
        }
        Command::LookupProperty { property } => {
            let store = open_store(&settings.store_path)?;
            let id = commands::lookup_property(&store, &property)?;
            println!("{} = {}", property, id);
        }
        Command::Resolve { id } => {
            let store = open_store(&settings.store_path)?;
            println!("{}", commands::resolve(&store, id)?);
        }
        Command::TryCompact { dry_run } => {
            let feed = cache.get_stored()?;
            let store = open_store(&settings.store_path)?;
            let report = commands::try_compact(&store, &feed, !dry_run)
                .context("failed to convert fat stashes to compact")?;
            println!(
                "compact done, {} stashes, {} items, item size is {} bytes, {} strings on heap",
                report.stashes, report.items, report.item_bytes, report.heap_strings
            );
        }
    }

    Ok(())
}
