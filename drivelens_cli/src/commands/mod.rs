pub mod auth;
pub mod list;
pub mod read;
pub mod search;

use crate::cli::Cli;
use drivelens_core::auth::AuthDetails;
use drivelens_core::config::{ConfigError, DriveConfig};
use drivelens_core::drive::{DriveError, DriveTools};
use drivelens_core::token::StoredTokenProvider;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Drive(#[from] DriveError),

    #[error("{0}")]
    Tool(String),

    #[error("Core library error: {0}")]
    Core(#[from] drivelens_core::error::ConnectorError),

    #[error("Credential store error: {0}")]
    Store(#[from] drivelens_core::auth_store::StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// `--config` file when given, otherwise `DriveConfig::load`; env overrides
/// apply either way.
pub fn load_config(cli: &Cli) -> Result<DriveConfig> {
    let config = match &cli.config {
        Some(path) => DriveConfig::load_from_path(path)?
            .with_env_overrides(|key| std::env::var(key).ok())?,
        None => DriveConfig::load()?,
    };
    debug!(
        api_base = %config.api_base,
        similar_limit = config.similar_limit,
        auto_read = config.auto_read_single_match,
        "loaded drive config"
    );
    Ok(config)
}

pub fn build_tools(cli: &Cli) -> Result<DriveTools> {
    let config = load_config(cli)?;
    let tokens = Arc::new(StoredTokenProvider::with_default_store(AuthDetails::new()));
    Ok(DriveTools::from_config(config, tokens)?)
}

pub fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Tool text beginning with `Error:` is a failure described for the caller.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with("Error:")
}
