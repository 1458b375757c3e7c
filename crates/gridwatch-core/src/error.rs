//! GridWatch error types.

use thiserror::Error;

use crate::types::PlatformId;

/// Result alias used across GridWatch crates.
pub type Result<T> = std::result::Result<T, GridWatchError>;

/// Failure while invoking a platform's external status source.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    /// Tool binary absent, or present without execute permission.
    #[error("not installed: {0}")]
    NotInstalled(String),

    #[error("command timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("command exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("network error: {0}")]
    NetworkError(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into())
}

/// Failure to turn raw output into a `PlatformStatus`.
///
/// Only the running/stopped indicator is mandatory; every other field
/// degrades to `FieldValue::Unavailable` instead of raising this.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{platform}: running state indicator missing from output")]
    MissingRunningState { platform: PlatformId },

    #[error("{platform}: unrecognised running state '{value}'")]
    UnrecognisedRunningState { platform: PlatformId, value: String },

    #[error("{platform}: expected {expected} output")]
    WrongFormat {
        platform: PlatformId,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum GridWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Adapter error ({platform}): {source}")]
    Adapter {
        platform: PlatformId,
        #[source]
        source: AdapterError,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Platform disabled: {0}")]
    PlatformDisabled(PlatformId),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl GridWatchError {
    pub fn adapter(platform: PlatformId, source: AdapterError) -> Self {
        Self::Adapter { platform, source }
    }

    /// True for failures that should be shown to users as "status unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Adapter { .. } | Self::Parse(_))
    }
}
