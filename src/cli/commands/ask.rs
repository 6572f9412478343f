//! Ask command implementation.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::sync::Arc;

use crate::models::{Config, DEFAULT_COLLECTION};
use crate::services::{MistralClient, QueryPipeline, Retriever, VectorStore, build_embedder};

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Question to ask
    pub question: String,

    /// Collection to search in
    #[arg(long, short = 'c', default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Maximum number of chunks to retrieve
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,

    /// Character budget for the assembled context
    #[arg(long)]
    pub max_context: Option<usize>,

    /// Show source chunks used for the answer
    #[arg(long, short = 's')]
    pub sources: bool,
}

pub async fn handle_ask(args: AskArgs, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let limit = args.limit.unwrap_or(config.searchbot.result_limit as usize);
    let max_context = args
        .max_context
        .unwrap_or(config.searchbot.max_context_length as usize);

    let embedder = build_embedder(&config.embedding).context("failed to build embedder")?;
    let store = Arc::new(
        VectorStore::open(&config.embedder.vector_db_path)
            .context("failed to open vector store")?,
    );
    let generator =
        Arc::new(MistralClient::new(&config.searchbot).context("failed to build generator")?);
    let pipeline = QueryPipeline::new(Retriever::new(embedder, store), generator);

    if verbose {
        println!(
            "Searching '{}' (limit {}, context budget {} chars)...",
            args.collection, limit, max_context
        );
    }

    let answer = pipeline
        .answer_question(&args.question, &args.collection, limit, max_context)
        .await?;

    if answer.answered {
        println!("{}", style("Answer").blue().bold());
        println!("{}", answer.text);
    } else {
        println!("{}", style(&answer.text).yellow());
    }

    if args.sources && !answer.attributions.is_empty() {
        println!("\n{}", style("Sources").bold());
        for (i, attribution) in answer.attributions.iter().enumerate() {
            println!(
                "{}. {} (chunk {}, relevance: {:.1}%)",
                i + 1,
                style(&attribution.source_path).cyan(),
                attribution.chunk_index,
                attribution.score * 100.0
            );
        }
    }

    Ok(())
}
