pub mod machine;
pub mod session;
pub mod tracker;

use crate::api::client::ByteStream;
use crate::config::{DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use anyhow::Result;
use futures::future::BoxFuture;
use std::time::Duration;

pub use machine::{Phase, ProgressMachine, Signal, Transition};
pub use session::{ProgressSession, SessionInput};
pub use tracker::ProgressTracker;

/// Opens one server-push byte stream per connection attempt.
pub trait ProgressSource: Send + Sync {
    fn open<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<ByteStream>>;
}

impl<T: ProgressSource + ?Sized> ProgressSource for &T {
    fn open<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<ByteStream>> {
        (**self).open(job_id)
    }
}

impl<T: ProgressSource + ?Sized> ProgressSource for std::sync::Arc<T> {
    fn open<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<ByteStream>> {
        (**self).open(job_id)
    }
}

/// Receives display-only status text in arrival order.
pub trait StatusSink {
    fn on_status(&mut self, status: &str);
}

impl<F: FnMut(&str)> StatusSink for F {
    fn on_status(&mut self, status: &str) {
        self(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub heartbeat_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}
