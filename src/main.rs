use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use docqa::cli::commands::{
    handle_ask, handle_collections, handle_config, handle_index, handle_search,
};
use docqa::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbose = cli.verbose;

    tokio::select! {
        result = run_command(cli.command, verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, cleaning up...");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "docqa=debug" } else { "docqa=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Index(args) => {
            handle_index(args, verbose).await?;
        }
        Commands::Ask(args) => {
            handle_ask(args, verbose).await?;
        }
        Commands::Search(args) => {
            handle_search(args, verbose).await?;
        }
        Commands::Collections(cmd) => {
            handle_collections(cmd, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
