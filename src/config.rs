//! Runtime configuration read from `ORINOTES_*` environment variables.

use rand::Rng;
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/api/";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Url,
    pub bind: String,
    pub session_secret: Vec<u8>,
    pub search_debounce: Duration,
    pub request_timeout: Duration,
    pub secure_cookies: bool,
}

impl Config {
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `load` passes the process
    /// environment; tests pass a closure over a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: String = try_load(&lookup, "ORINOTES_BACKEND_URL", DEFAULT_BACKEND_URL)?;
        let backend_url = parse_backend_url(&backend)?;

        let session_secret = match lookup("ORINOTES_SESSION_SECRET") {
            Some(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                warn!("ORINOTES_SESSION_SECRET not set, sessions will not survive a restart");
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill(&mut bytes[..]);
                bytes
            }
        };

        let debounce_ms: u64 = try_load(&lookup, "ORINOTES_SEARCH_DEBOUNCE_MS", "500")?;
        let timeout_secs: u64 = try_load(&lookup, "ORINOTES_REQUEST_TIMEOUT_SECS", "15")?;

        Ok(Self {
            backend_url,
            bind: try_load(&lookup, "ORINOTES_BIND", DEFAULT_BIND)?,
            session_secret,
            search_debounce: Duration::from_millis(debounce_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            secure_cookies: try_load(&lookup, "ORINOTES_SECURE_COOKIES", "false")?,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e| format!("Invalid {key} value {raw:?}: {e}"))
}

/// Endpoint paths are joined onto the base, so it must end with a slash or
/// `join` would replace its last segment.
fn parse_backend_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| format!("Invalid ORINOTES_BACKEND_URL: {e}"))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!(
            "ORINOTES_BACKEND_URL must be http or https, got {}",
            url.scheme()
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
