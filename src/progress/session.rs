use super::ProgressSource;
use crate::api::client::ByteStream;
use crate::api::stream::{SseFrame, SseParser, MAX_PENDING_BYTES};
use futures::StreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};
use tracing::{debug, trace};

/// What an open session produced next.
#[derive(Debug)]
pub enum SessionInput {
    Frame(SseFrame),
    DeadlineElapsed,
    TransportFailed(String),
}

/// One connection attempt: the byte stream plus its heartbeat deadline.
/// Closing (or dropping) the session releases both together.
pub struct ProgressSession {
    job_id: String,
    attempt: u32,
    stream: Option<ByteStream>,
    parser: SseParser,
    pending: VecDeque<SseFrame>,
    deadline: Option<Pin<Box<Sleep>>>,
    heartbeat_timeout: Duration,
}

impl ProgressSession {
    pub async fn open<S>(
        source: &S,
        job_id: &str,
        attempt: u32,
        heartbeat_timeout: Duration,
    ) -> anyhow::Result<Self>
    where
        S: ProgressSource + ?Sized,
    {
        debug!(job_id, attempt, "opening progress stream");
        let stream = source.open(job_id).await?;
        Ok(Self {
            job_id: job_id.to_string(),
            attempt,
            stream: Some(stream),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            deadline: None,
            heartbeat_timeout,
        })
    }

    /// Arms the heartbeat deadline, or pushes it out if already armed.
    pub fn reset_deadline(&mut self) {
        let next = Instant::now() + self.heartbeat_timeout;
        match self.deadline.as_mut() {
            Some(sleep) => sleep.as_mut().reset(next),
            None => self.deadline = Some(Box::pin(tokio::time::sleep_until(next))),
        }
    }

    pub async fn next_input(&mut self) -> SessionInput {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return SessionInput::Frame(frame);
            }

            let Some(stream) = self.stream.as_mut() else {
                return SessionInput::TransportFailed("progress stream already closed".to_string());
            };

            let step = tokio::select! {
                chunk = stream.next() => Step::Chunk(chunk),
                _ = wait_for_deadline(self.deadline.as_mut()) => Step::Deadline,
            };

            match step {
                Step::Chunk(Some(Ok(bytes))) => {
                    trace!(job_id = %self.job_id, bytes = bytes.len(), "progress chunk");
                    self.pending.extend(self.parser.process(&bytes));
                    if self.parser.exceeds_limit() {
                        self.parser.flush();
                        self.pending.clear();
                        return SessionInput::TransportFailed(format!(
                            "progress frame exceeds {MAX_PENDING_BYTES} bytes without a terminator"
                        ));
                    }
                }
                Step::Chunk(Some(Err(error))) => {
                    return SessionInput::TransportFailed(error.to_string());
                }
                Step::Chunk(None) => {
                    return SessionInput::TransportFailed(
                        "progress stream closed by server".to_string(),
                    );
                }
                Step::Deadline => return SessionInput::DeadlineElapsed,
            }
        }
    }

    /// Drops the connection and cancels the deadline. Idempotent.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            let leftover = self.parser.flush();
            if !leftover.trim().is_empty() {
                debug!(job_id = %self.job_id, leftover = %leftover, "discarding partial frame");
            }
            debug!(job_id = %self.job_id, attempt = self.attempt, "progress stream closed");
        }
        self.deadline = None;
        self.pending.clear();
    }
}

impl Drop for ProgressSession {
    fn drop(&mut self) {
        self.close();
    }
}

enum Step {
    Chunk(Option<anyhow::Result<bytes::Bytes>>),
    Deadline,
}

async fn wait_for_deadline(deadline: Option<&mut Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}
