//! CLI surface for the document QA pipeline.

pub mod commands;

use clap::{Parser, Subcommand};

/// Retrieval-augmented question answering over local document collections.
#[derive(Debug, Parser)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index documents into a collection
    Index(commands::IndexArgs),

    /// Ask a question answered from indexed documents
    Ask(commands::AskArgs),

    /// Retrieve matching chunks without generating an answer
    Search(commands::SearchArgs),

    /// Manage vector collections
    #[command(subcommand)]
    Collections(commands::CollectionsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
