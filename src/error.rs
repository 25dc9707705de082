use std::path::PathBuf;
use thiserror::Error;

/// Ways a progress stream can end without reaching `DONE`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("invalid job id {0:?}: expected a non-empty identifier")]
    InvalidJobId(String),

    /// No message within the heartbeat deadline, with the retry budget spent.
    #[error("server connection timed out after {retries} reconnect attempts")]
    Timeout { retries: u32 },

    /// Connection failure with the retry budget spent.
    #[error("conversion progress interrupted: {0}")]
    Transport(String),

    #[error("{0}")]
    ServerReported(String),

    #[error("malformed progress payload: {0}")]
    MalformedPayload(String),
}

impl ProgressError {
    /// Retryable failures are transport errors and heartbeat timeouts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{path}: expected a {expected} file")]
    UnsupportedFile { path: PathBuf, expected: &'static str },

    #[error("{path}: {size} bytes exceeds the {limit} byte upload limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Http(String),

    #[error("server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl ConvertError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
