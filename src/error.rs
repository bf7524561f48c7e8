//! Errors for the host-side surfaces (config, traces, line protocol).
//!
//! The decision core itself never fails.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShutterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid sample on line {line}: {reason}")]
    InvalidSample { line: usize, reason: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unknown validation mode: {0}")]
    UnknownMode(String),
}

impl ShutterError {
    /// Attach a line number to a sample error (parser reports line 0)
    pub fn at_line(self, line: usize) -> Self {
        match self {
            ShutterError::InvalidSample { reason, .. } => ShutterError::InvalidSample { line, reason },
            ShutterError::Json(e) => ShutterError::InvalidSample {
                line,
                reason: e.to_string(),
            },
            other => other,
        }
    }
}
