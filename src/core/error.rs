use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TidepoolError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The ingestion channel could not be opened. Fatal.
    #[error("Failed to bind event socket {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Terminal error: {0}")]
    Terminal(String),

    /// The tick found its own state inconsistent. Fatal.
    #[error("Simulation invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, TidepoolError>;
