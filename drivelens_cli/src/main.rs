use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "drivelens_cli=info",
        1 => "drivelens_cli=info,drivelens_core=info",
        _ => "drivelens_cli=debug,drivelens_core=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::List { offset, limit } => commands::list::run(&cli, *offset, *limit).await,
        Commands::Search { query, max } => commands::search::run(&cli, query, *max).await,
        Commands::Read { id, name } => {
            commands::read::run(&cli, id.as_deref(), name.as_deref()).await
        }
        Commands::Auth { action } => commands::auth::run(&cli, action).await,
    };

    match result {
        Ok(()) => {}
        // already phrased as "Error: ..."
        Err(commands::CommandError::Tool(text)) => {
            eprintln!("{}", text.red());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            process::exit(1);
        }
    }
}
