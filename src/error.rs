use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced to whoever starts or configures a session.
///
/// Per-frame estimation failures never show up here; the loop contains them and
/// reports them through the session state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("pose source unavailable: {0:#}")]
    AdapterUnavailable(anyhow::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn { name: &'static str, source: io::Error },

    #[error("session is not initialized")]
    NotInitialized,
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
