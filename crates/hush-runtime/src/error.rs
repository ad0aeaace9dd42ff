use hush_core::ConfigError;
use thiserror::Error;

/// Why a [`Hush`](crate::Hush) runtime could not be initialized.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid hush configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to parse stored settings JSON: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result of fallible runtime setup.
pub type Result<T> = std::result::Result<T, InitError>;
