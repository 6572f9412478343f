//! Search command implementation: retrieval without generation.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use crate::models::{Config, DEFAULT_COLLECTION};
use crate::services::{EmbedPurpose, Embedder, VectorStore, build_embedder};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Collection to search in
    #[arg(long, short = 'c', default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Maximum number of results
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

pub async fn handle_search(args: SearchArgs, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let limit = args.limit.unwrap_or(config.searchbot.result_limit as usize);

    let embedder = build_embedder(&config.embedding).context("failed to build embedder")?;
    let store = VectorStore::open(&config.embedder.vector_db_path)
        .context("failed to open vector store")?;

    let query = vec![args.query.clone()];
    let vectors = embedder
        .embed(&query, EmbedPurpose::Query)
        .await
        .context("failed to embed query")?;
    let query_vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty embedding response"))?;

    let results = match store.query(&args.collection, &query_vector, limit).await {
        Ok(results) => results,
        Err(crate::error::VectorStoreError::CollectionNotFound(name)) => {
            println!("Collection '{}' does not exist.", name);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if results.is_empty() {
        println!("No results in '{}'.", args.collection);
        return Ok(());
    }

    if verbose {
        println!("{} results from '{}':\n", results.len(), args.collection);
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {} (chunk {}, score: {:.3})",
            i + 1,
            style(&result.metadata.source_path).cyan(),
            result.metadata.chunk_index,
            result.score
        );
        let preview: String = result.text.chars().take(200).collect();
        let suffix = if result.text.chars().count() > 200 {
            "..."
        } else {
            ""
        };
        println!("   {}{}\n", preview, suffix);
    }

    Ok(())
}
