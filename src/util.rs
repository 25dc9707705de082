use anyhow::{bail, Result};
use reqwest::Url;
use std::str::FromStr;

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "[::1]"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}

/// Reads a numeric environment variable. Unset or blank yields `None`,
/// anything unparseable is an error naming the variable.
pub fn env_number<T: FromStr>(name: &str) -> Result<Option<T>> {
    let Some(raw) = std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };

    match raw.parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => bail!("Invalid {name} '{raw}': expected a non-negative integer"),
    }
}

/// Lowercased extension of a path-like string, without the dot.
pub fn lowercase_extension(path: &std::path::Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
