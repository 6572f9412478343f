//! Collection management commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use std::io::Write;

use crate::models::Config;
use crate::services::VectorStore;

#[derive(Debug, Subcommand)]
pub enum CollectionsCommand {
    /// List all collections
    List,

    /// Show statistics for a collection
    Stats {
        /// Collection name
        name: String,
    },

    /// Delete a collection and all its records
    Delete {
        /// Collection name
        name: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },
}

pub async fn handle_collections(cmd: CollectionsCommand, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let store = VectorStore::open(&config.embedder.vector_db_path)
        .context("failed to open vector store")?;

    match cmd {
        CollectionsCommand::List => {
            let collections = store.list_collections()?;
            if collections.is_empty() {
                println!("No collections.");
                return Ok(());
            }
            for name in collections {
                let stats = store.collection_stats(&name).await?;
                println!(
                    "{}  {} records, dimension {}",
                    style(&stats.name).cyan(),
                    stats.record_count,
                    stats.dimension
                );
            }
        }
        CollectionsCommand::Stats { name } => {
            let stats = store.collection_stats(&name).await?;
            println!("Collection: {}", style(&stats.name).cyan());
            println!("Records:    {}", stats.record_count);
            println!("Dimension:  {}", stats.dimension);
        }
        CollectionsCommand::Delete { name, force } => {
            if !force && !confirm(&format!("Delete collection '{}'?", name))? {
                println!("Aborted.");
                return Ok(());
            }
            store.delete_collection(&name).await?;
            println!("Deleted collection '{}'.", name);
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
