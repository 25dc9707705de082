use crate::config::Config;
use crate::error::ConvertError;
use crate::progress::ProgressSource;
use crate::types::{source_mime, ConversionKind, ConversionMode, JobId};
use crate::util::is_local_endpoint_url;
use anyhow::anyhow;
use anyhow::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const FALLBACK_ERROR_MESSAGE: &str = "conversion failed";

/// What the service did with a submitted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Converted synchronously; the body is the converted file.
    Converted { bytes: Bytes },
    /// Accepted for background conversion; follow the job's progress stream.
    Queued { job_id: JobId },
}

#[derive(Debug, Deserialize)]
struct QueuedResponse {
    #[serde(alias = "job_id", alias = "jobId")]
    queue_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ConvertClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl ConvertClient {
    pub fn new(config: &Config) -> Result<Self, ConvertError> {
        let base_url = Url::parse(config.server_url.trim()).map_err(|error| {
            ConvertError::Http(format!(
                "invalid server url '{}': {error}",
                config.server_url
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ConvertError::Http(format!(
                "invalid server url '{}': expected an http:// or https:// base URL",
                config.server_url
            )));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|error| ConvertError::Http(format!("cannot build HTTP client: {error}")))?;

        Ok(Self {
            http,
            base_url,
            request_timeout: config.request_timeout,
        })
    }

    /// `{base}/{segments...}` with every segment percent-encoded. `new` only
    /// accepts http(s) base URLs, so the path is always extendable.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn submit(
        &self,
        kind: ConversionKind,
        source: &Path,
        mode: ConversionMode,
    ) -> Result<Submission, ConvertError> {
        let request_url = self.endpoint(&["convert", kind.route()]);
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let contents = tokio::fs::read(source)
            .await
            .map_err(|error| ConvertError::io(format!("cannot read {}", source.display()), error))?;

        let part = Part::bytes(contents)
            .file_name(file_name.clone())
            .mime_str(source_mime(source))
            .map_err(|error| map_request_error(error, request_url.as_str()))?;
        let mut form = Form::new().part("file", part);
        if kind == ConversionKind::WordToPdf {
            if let Some(mode) = mode.form_value() {
                form = form.text("mode", mode);
            }
        }

        info!(url = %request_url, file = %file_name, "submitting document");
        let response = self
            .http
            .post(request_url.clone())
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|error| map_request_error(error, request_url.as_str()))?;

        let response = ensure_success(response).await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().starts_with("application/json"));

        if is_json {
            let body = response
                .bytes()
                .await
                .map_err(|error| map_request_error(error, request_url.as_str()))?;
            let queued: QueuedResponse =
                serde_json::from_slice(&body).map_err(|error| ConvertError::InvalidResponse {
                    url: request_url.to_string(),
                    message: format!("expected a job handle: {error}"),
                })?;
            let job_id =
                JobId::new(queued.queue_id).map_err(|error| ConvertError::InvalidResponse {
                    url: request_url.to_string(),
                    message: error.to_string(),
                })?;
            info!(job_id = %job_id, "conversion queued");
            return Ok(Submission::Queued { job_id });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| map_request_error(error, request_url.as_str()))?;
        debug!(bytes = bytes.len(), "conversion returned inline");
        Ok(Submission::Converted { bytes })
    }

    pub async fn download(&self, job_id: &JobId) -> Result<Bytes, ConvertError> {
        let request_url = self.endpoint(&["download", job_id.as_str()]);
        let response = self
            .http
            .get(request_url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_request_error(error, request_url.as_str()))?;

        ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(|error| map_request_error(error, request_url.as_str()))
    }

    /// Opens the job's event stream. No total timeout applies; the caller
    /// owns liveness through the heartbeat deadline.
    pub async fn open_progress_stream(&self, job_id: &str) -> Result<ByteStream> {
        let request_url = self.endpoint(&["progress", job_id]);
        let response = self
            .http
            .get(request_url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|error| anyhow!(map_request_error(error, request_url.as_str())))?
            .error_for_status()
            .map_err(|error| anyhow!(map_request_error(error, request_url.as_str())))?;

        let request_url_for_stream = request_url.to_string();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| anyhow!(map_request_error(error, &request_url_for_stream)))
        });
        Ok(Box::pin(stream))
    }
}

impl ProgressSource for ConvertClient {
    fn open<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<ByteStream>> {
        self.open_progress_stream(job_id).boxed()
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ConvertError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(ConvertError::Server {
        status: status.as_u16(),
        message: error_message_from_body(status, &body),
    })
}

fn error_message_from_body(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(|reason| format!("{FALLBACK_ERROR_MESSAGE} ({reason})"))
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
        })
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> ConvertError {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return ConvertError::Http(format!(
            "cannot reach local conversion server '{request_url}': {error}. Start the server or update DOCBRIDGE_SERVER_URL."
        ));
    }
    if error.is_connect() {
        return ConvertError::Http(format!(
            "cannot reach conversion server '{request_url}': {error}"
        ));
    }
    if error.is_timeout() {
        return ConvertError::Http(format!("request to '{request_url}' timed out: {error}"));
    }
    if let Some(status) = error.status() {
        return ConvertError::Http(format!(
            "'{request_url}' returned HTTP {status}: {error}"
        ));
    }
    ConvertError::Http(format!("request to '{request_url}' failed: {error}"))
}
