use super::machine::{ProgressMachine, Signal, Transition};
use super::session::{ProgressSession, SessionInput};
use super::{ProgressSettings, ProgressSource, StatusSink};
use crate::error::ProgressError;
use crate::types::{JobId, ProgressEvent};
use tracing::{debug, error, info, warn};

/// Follows a job's progress stream until it resolves.
#[derive(Clone)]
pub struct ProgressTracker<S> {
    source: S,
    settings: ProgressSettings,
}

impl<S: ProgressSource> ProgressTracker<S> {
    pub fn new(source: S, settings: ProgressSettings) -> Self {
        Self { source, settings }
    }

    /// Resolves `Ok` once the stream reports `DONE`. Heartbeats never reach
    /// `sink`; nothing reaches it after this returns.
    pub async fn track<K>(&self, job_id: &str, sink: &mut K) -> Result<(), ProgressError>
    where
        K: StatusSink + ?Sized,
    {
        let job_id = JobId::new(job_id)?;
        let mut machine =
            ProgressMachine::new(self.settings.max_retries, self.settings.retry_delay);
        let mut session: Option<ProgressSession> = None;

        loop {
            if let Some(mut previous) = session.take() {
                previous.close();
            }

            let opening = ProgressSession::open(
                &self.source,
                job_id.as_str(),
                machine.retries(),
                self.settings.heartbeat_timeout,
            );
            let mut next_signal =
                match tokio::time::timeout(self.settings.heartbeat_timeout, opening).await {
                    Ok(Ok(opened)) => {
                        info!(job_id = %job_id, attempt = machine.retries(), "progress stream open");
                        session = Some(opened);
                        Some(Signal::Opened)
                    }
                    Ok(Err(open_error)) => {
                        warn!(job_id = %job_id, error = %open_error, "progress stream failed to open");
                        Some(Signal::TransportFailed(open_error.to_string()))
                    }
                    Err(_) => {
                        warn!(job_id = %job_id, "no response to progress request before the deadline");
                        Some(Signal::DeadlineElapsed)
                    }
                };

            loop {
                let signal = match next_signal.take() {
                    Some(signal) => signal,
                    None => match session.as_mut() {
                        Some(open) => read_signal(open, &job_id).await,
                        None => Signal::TransportFailed("no open progress stream".to_string()),
                    },
                };

                match machine.apply(signal) {
                    Transition::ArmDeadline | Transition::ResetDeadline => {
                        if let Some(open) = session.as_mut() {
                            open.reset_deadline();
                        }
                    }
                    Transition::Display(status) => {
                        if let Some(open) = session.as_mut() {
                            open.reset_deadline();
                        }
                        sink.on_status(&status);
                    }
                    Transition::Complete(status) => {
                        sink.on_status(&status);
                        if let Some(mut open) = session.take() {
                            open.close();
                        }
                        info!(job_id = %job_id, "conversion finished");
                        return Ok(());
                    }
                    Transition::Fail(failure) => {
                        if let Some(mut open) = session.take() {
                            open.close();
                        }
                        error!(job_id = %job_id, error = %failure, "progress tracking failed");
                        return Err(failure);
                    }
                    Transition::Reconnect { attempt, delay } => {
                        if let Some(mut open) = session.take() {
                            open.close();
                        }
                        warn!(
                            job_id = %job_id,
                            attempt,
                            max_retries = self.settings.max_retries,
                            "reconnecting progress stream"
                        );
                        tokio::time::sleep(delay).await;
                        machine.begin_attempt();
                        break;
                    }
                    Transition::Ignored => {}
                }
            }
        }
    }
}

async fn read_signal(session: &mut ProgressSession, job_id: &JobId) -> Signal {
    loop {
        match session.next_input().await {
            SessionInput::Frame(frame) => {
                if !frame.is_message() {
                    debug!(job_id = %job_id, event = ?frame.event, "skipping named event");
                    continue;
                }
                return match ProgressEvent::parse(&frame.data) {
                    Ok(event) => {
                        if event == ProgressEvent::Heartbeat {
                            debug!(job_id = %job_id, "heartbeat");
                        }
                        Signal::Event(event)
                    }
                    Err(parse_error) => {
                        warn!(job_id = %job_id, data = %frame.data, "unreadable progress payload");
                        Signal::Malformed(format!("{parse_error}: {}", frame.data))
                    }
                };
            }
            SessionInput::DeadlineElapsed => {
                warn!(job_id = %job_id, "heartbeat deadline elapsed");
                return Signal::DeadlineElapsed;
            }
            SessionInput::TransportFailed(detail) => {
                warn!(job_id = %job_id, error = %detail, "progress stream error");
                return Signal::TransportFailed(detail);
            }
        }
    }
}
