//! Error kinds surfaced by the extraction, codec, and query pipelines.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompanionError {
    /// A source file could not be read or did not parse.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A header line carried a known prefix but an unusable value.
    ///
    /// The decoder never returns this to callers; it degrades the line to
    /// body text instead.
    #[error("malformed header line {line:?}: {reason}")]
    EncodingInconsistency { line: String, reason: String },

    /// The external store rejected an `add` or `search` call.
    #[error("storage {operation} failed for {target}: {source}")]
    Storage {
        operation: &'static str,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation} timed out after {}s", after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl CompanionError {
    pub fn parse(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(
        operation: &'static str,
        target: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Storage {
            operation,
            target: target.into(),
            source,
        }
    }
}
