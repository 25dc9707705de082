use crate::api::client::ByteStream;
use crate::progress::ProgressSource;
use anyhow::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How one scripted connection attempt behaves.
pub enum ScriptedConnection {
    Refuse(String),
    /// Accepts the request but never answers it.
    Unresponsive,
    Stream {
        chunks: Vec<Result<Bytes>>,
        hold_open: bool,
    },
}

impl ScriptedConnection {
    /// Sends each payload as one SSE message, then the server hangs up.
    pub fn messages(payloads: &[&str]) -> Self {
        Self::Stream {
            chunks: payloads.iter().map(|payload| Ok(frame(payload))).collect(),
            hold_open: false,
        }
    }

    /// Sends each payload, then keeps the connection open without traffic.
    pub fn messages_then_silence(payloads: &[&str]) -> Self {
        Self::Stream {
            chunks: payloads.iter().map(|payload| Ok(frame(payload))).collect(),
            hold_open: true,
        }
    }

    pub fn silent() -> Self {
        Self::messages_then_silence(&[])
    }

    pub fn raw(chunks: Vec<&'static [u8]>, hold_open: bool) -> Self {
        Self::Stream {
            chunks: chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk)))
                .collect(),
            hold_open,
        }
    }

    /// Sends the payloads, then the read fails.
    pub fn messages_then_error(payloads: &[&str], error: &str) -> Self {
        let mut chunks: Vec<Result<Bytes>> =
            payloads.iter().map(|payload| Ok(frame(payload))).collect();
        chunks.push(Err(anyhow::anyhow!(error.to_string())));
        Self::Stream {
            chunks,
            hold_open: false,
        }
    }

    pub fn refuse(error: &str) -> Self {
        Self::Refuse(error.to_string())
    }
}

fn frame(payload: &str) -> Bytes {
    Bytes::from(format!("data: {payload}\n\n"))
}

struct CloseGuard(Arc<AtomicUsize>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Progress source that replays one scripted connection per `open` call and
/// counts how many streams were opened and dropped.
#[derive(Clone)]
pub struct MockProgressSource {
    connections: Arc<Mutex<VecDeque<ScriptedConnection>>>,
    opened_job_ids: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockProgressSource {
    pub fn new(connections: Vec<ScriptedConnection>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(connections.into())),
            opened_job_ids: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn opened_job_ids(&self) -> Vec<String> {
        self.opened_job_ids.lock().unwrap().clone()
    }

    /// `None` when the scripted server never answers the request.
    fn next_stream(&self, job_id: &str) -> Option<Result<ByteStream>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.opened_job_ids.lock().unwrap().push(job_id.to_string());

        let next = self.connections.lock().unwrap().pop_front();
        let Some(connection) = next else {
            return Some(Err(anyhow::anyhow!(
                "MockProgressSource: No more connections configured"
            )));
        };

        match connection {
            ScriptedConnection::Refuse(error) => Some(Err(anyhow::anyhow!(error))),
            ScriptedConnection::Unresponsive => None,
            ScriptedConnection::Stream { chunks, hold_open } => {
                let guard = CloseGuard(self.closes.clone());
                let scripted = stream::iter(chunks);
                let body: ByteStream = if hold_open {
                    Box::pin(scripted.chain(stream::pending()))
                } else {
                    Box::pin(scripted)
                };
                Some(Ok(Box::pin(body.map(move |item| {
                    let _ = &guard;
                    item
                }))))
            }
        }
    }
}

impl ProgressSource for MockProgressSource {
    fn open<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<ByteStream>> {
        match self.next_stream(job_id) {
            Some(result) => async move { result }.boxed(),
            None => futures::future::pending().boxed(),
        }
    }
}
