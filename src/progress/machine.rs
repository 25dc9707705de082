use crate::error::ProgressError;
use crate::types::{ProgressEvent, DONE_STATUS};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Open,
    Retrying,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Inputs observed by one tracking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Opened,
    Event(ProgressEvent),
    Malformed(String),
    DeadlineElapsed,
    TransportFailed(String),
}

/// What the driver must do in response to a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    ArmDeadline,
    ResetDeadline,
    /// Show the status and reset the deadline.
    Display(String),
    /// Show the final status, tear the session down, resolve `Ok`.
    Complete(String),
    /// Tear the session down and open a new one after `delay`.
    Reconnect { attempt: u32, delay: Duration },
    /// Tear the session down and resolve with the error.
    Fail(ProgressError),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ProgressMachine {
    phase: Phase,
    retries: u32,
    max_retries: u32,
    retry_delay: Duration,
}

impl ProgressMachine {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            phase: Phase::Connecting,
            retries: 0,
            max_retries,
            retry_delay,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Reconnects used so far; never reset while the job is tracked.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Leaves `Retrying` once the backoff delay has elapsed.
    pub fn begin_attempt(&mut self) {
        if self.phase == Phase::Retrying {
            self.phase = Phase::Connecting;
        }
    }

    pub fn apply(&mut self, signal: Signal) -> Transition {
        if self.phase.is_terminal() || self.phase == Phase::Retrying {
            return Transition::Ignored;
        }

        match signal {
            Signal::Opened => {
                if self.phase != Phase::Connecting {
                    return Transition::Ignored;
                }
                self.phase = Phase::Open;
                Transition::ArmDeadline
            }
            Signal::Event(event) => {
                if self.phase != Phase::Open {
                    return Transition::Ignored;
                }
                match event {
                    ProgressEvent::Done => {
                        self.phase = Phase::Succeeded;
                        Transition::Complete(DONE_STATUS.to_string())
                    }
                    ProgressEvent::Error(message) => {
                        self.settle(ProgressError::ServerReported(message))
                    }
                    other => match other.display_text() {
                        Some(status) => Transition::Display(status.to_string()),
                        None => Transition::ResetDeadline,
                    },
                }
            }
            Signal::Malformed(detail) => {
                if self.phase != Phase::Open {
                    return Transition::Ignored;
                }
                self.settle(ProgressError::MalformedPayload(detail))
            }
            // Also fires while connecting: a server that never answers the
            // request spends the same budget as one that goes quiet.
            Signal::DeadlineElapsed => self.settle(ProgressError::Timeout {
                retries: self.retries,
            }),
            Signal::TransportFailed(detail) => self.settle(ProgressError::Transport(detail)),
        }
    }

    /// Reconnects on a retryable failure while budget remains, otherwise fails.
    fn settle(&mut self, failure: ProgressError) -> Transition {
        if failure.is_retryable() && self.retries < self.max_retries {
            self.retries += 1;
            self.phase = Phase::Retrying;
            return Transition::Reconnect {
                attempt: self.retries,
                delay: self.retry_delay,
            };
        }
        self.fail(failure)
    }

    fn fail(&mut self, error: ProgressError) -> Transition {
        self.phase = Phase::Failed;
        Transition::Fail(error)
    }
}
