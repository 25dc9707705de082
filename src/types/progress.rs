use crate::error::ProgressError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HEARTBEAT_STATUS: &str = "heartbeat";
pub const DONE_STATUS: &str = "DONE";

/// Opaque handle the conversion service assigns to a queued conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ProgressError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ProgressError::InvalidJobId(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One decoded message from the progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Status(String),
    Heartbeat,
    Done,
    Error(String),
    /// A well-formed object carrying neither status nor error.
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ProgressEvent {
    /// Decodes the `data` of an SSE message. Anything that is not a JSON
    /// object with string `status`/`error` fields is an error.
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        let raw: RawProgress = serde_json::from_str(data)?;

        if let Some(error) = raw.error.filter(|error| !error.is_empty()) {
            return Ok(Self::Error(error));
        }

        Ok(match raw.status.as_deref() {
            Some(HEARTBEAT_STATUS) => Self::Heartbeat,
            Some(DONE_STATUS) => Self::Done,
            Some(status) if !status.is_empty() => Self::Status(status.to_string()),
            _ => Self::Empty,
        })
    }

    /// Text a status display should show; heartbeats and empty payloads show nothing.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Self::Status(status) => Some(status),
            Self::Done => Some(DONE_STATUS),
            Self::Heartbeat | Self::Error(_) | Self::Empty => None,
        }
    }
}
