//! Command implementations and the shared context they run in.

pub mod account;
pub mod orders;
pub mod shipping;
pub mod shop;

use std::path::PathBuf;

use marketplace_storefront::config::ConfigError;
use marketplace_storefront::{ApiClient, ApiError, StorefrontConfig};
use thiserror::Error;

/// Session file used when `MARKETPLACE_SESSION_FILE` is not set.
const DEFAULT_SESSION_FILE: &str = ".mkt-session.json";

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Bad command-line input that clap cannot catch.
    #[error("{0}")]
    Usage(String),
}

/// Client plus the file its session is kept in.
pub struct Context {
    pub client: ApiClient,
    session_file: PathBuf,
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(PathBuf::new, PathBuf::from)
        .join(DEFAULT_SESSION_FILE)
}

impl Context {
    /// Load configuration and any saved session.
    ///
    /// # Errors
    ///
    /// Returns an error for bad configuration or an unreadable session file.
    pub async fn open() -> Result<Self, CliError> {
        let config = StorefrontConfig::from_env()?;
        let session_file = config
            .session_file
            .clone()
            .unwrap_or_else(default_session_file);
        let client = ApiClient::new(config)?;
        if client.session().load_from(&session_file).await? {
            tracing::debug!(path = %session_file.display(), "Loaded saved session");
        }
        Ok(Self {
            client,
            session_file,
        })
    }

    /// Write the session back, or delete the file after logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self) -> Result<(), CliError> {
        self.client
            .session()
            .persist_to(&self.session_file)
            .await?;
        Ok(())
    }
}

/// Write one line of command output to stdout. Logs go to stderr.
#[allow(clippy::print_stdout)]
pub fn out(line: impl std::fmt::Display) {
    println!("{line}");
}
