//! Error types for contextual enrichment.
//!
//! Library crates use [`ContextualError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every variant is terminal for the enrichment invocation that raised it:
//! nothing is retried, and no mutation is produced.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for all enrichment operations.
#[derive(Debug, thiserror::Error)]
pub enum ContextualError {
    /// Malformed or incomplete account/global configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// The bid request lacks what enrichment needs (site object, page URL).
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// Transport failure reaching the classification service.
    #[error("network error: {0}")]
    Network(String),

    /// Non-200 status, unreadable body, or a body that is not a classification record.
    #[error("decode error: {kind} ({detail})")]
    Decode { kind: DecodeFailure, detail: String },

    /// Filesystem I/O error (harness config files, request files).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which decoding step rejected the classification response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// The service answered with something other than HTTP 200.
    UnexpectedStatus(u16),
    /// The body could not be read to the end.
    ReadFailure,
    /// The body (after unframing) is not a classification record.
    MalformedBody,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedStatus(status) => write!(f, "unexpected status {status}"),
            Self::ReadFailure => f.write_str("read failure"),
            Self::MalformedBody => f.write_str("malformed body"),
        }
    }
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContextualError>;

impl ContextualError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a precondition error from any displayable message.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create a decode error of the given kind.
    pub fn decode(kind: DecodeFailure, detail: impl Into<String>) -> Self {
        Self::Decode {
            kind,
            detail: detail.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The decode sub-kind, if this is a decode error.
    pub fn decode_failure(&self) -> Option<DecodeFailure> {
        match self {
            Self::Decode { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
