use anyhow::{bail, Result};
use std::time::Duration;

use crate::progress::ProgressSettings;
use crate::util::{env_number, is_local_endpoint_url};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(35);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
/// Upload ceiling enforced by the conversion service.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub heartbeat_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let server_url = std::env::var("DOCBRIDGE_SERVER_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.server_url);
        let heartbeat_timeout = env_number::<u64>("DOCBRIDGE_HEARTBEAT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_timeout);
        let max_retries =
            env_number::<u32>("DOCBRIDGE_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let retry_delay = env_number::<u64>("DOCBRIDGE_RETRY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);
        let connect_timeout = env_number::<u64>("DOCBRIDGE_CONNECT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout);
        let request_timeout = env_number::<u64>("DOCBRIDGE_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let max_upload_bytes =
            env_number::<u64>("DOCBRIDGE_MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);

        Ok(Self {
            server_url,
            heartbeat_timeout,
            max_retries,
            retry_delay,
            connect_timeout,
            request_timeout,
            max_upload_bytes,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            bail!(
                "Invalid DOCBRIDGE_SERVER_URL '{}': expected http:// or https:// URL",
                self.server_url
            );
        }

        if reqwest::Url::parse(&self.server_url).is_err() {
            bail!("Invalid DOCBRIDGE_SERVER_URL '{}'", self.server_url);
        }

        if self.heartbeat_timeout.is_zero() {
            bail!("DOCBRIDGE_HEARTBEAT_TIMEOUT_SECS must be greater than zero");
        }

        if self.connect_timeout.is_zero() {
            bail!("DOCBRIDGE_CONNECT_TIMEOUT_SECS must be greater than zero");
        }

        if self.request_timeout.is_zero() {
            bail!("DOCBRIDGE_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        if self.max_upload_bytes == 0 {
            bail!("DOCBRIDGE_MAX_UPLOAD_BYTES must be greater than zero");
        }

        Ok(())
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn is_local_server(&self) -> bool {
        is_local_endpoint_url(&self.server_url)
    }

    pub fn progress_settings(&self) -> ProgressSettings {
        ProgressSettings {
            heartbeat_timeout: self.heartbeat_timeout,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }
}
