//!
//! Portal configuration
//! --------------------
//! Resolved once at startup from environment variables, then optionally overridden by
//! command-line flags. Nothing here talks to the network.
//!
//! Environment:
//! - `SIMS_API_BASE`        REST backend base URL, path prefix included (default `http://localhost:8000/api`)
//! - `SIMS_SESSION_FILE`    where the token/user pair is persisted (default `$HOME/.sims/session.json`)
//! - `SIMS_HTTP_TIMEOUT_MS` per-request timeout in milliseconds (default 30000)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub api_base: Url,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
}

impl PortalConfig {
    pub fn new(api_base: &str, session_file: impl Into<PathBuf>, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            api_base: parse_base(api_base)?,
            session_file: session_file.into(),
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("SIMS_API_BASE").filter(|s| !s.trim().is_empty()).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let session_file = match lookup("SIMS_SESSION_FILE").filter(|s| !s.trim().is_empty()) {
            Some(p) => PathBuf::from(p),
            None => default_session_file(lookup("HOME").or_else(|| lookup("USERPROFILE")).as_deref()),
        };
        let timeout_ms = match lookup("SIMS_HTTP_TIMEOUT_MS").filter(|s| !s.trim().is_empty()) {
            Some(v) => parse_timeout(&v).context("SIMS_HTTP_TIMEOUT_MS")?,
            None => DEFAULT_TIMEOUT_MS,
        };
        Self::new(&base, session_file, timeout_ms)
    }

    pub fn with_api_base(mut self, base: &str) -> Result<Self> {
        self.api_base = parse_base(base)?;
        Ok(self)
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms);
        self
    }

    /// Absolute endpoint URL for `path`. The base path prefix (e.g. `/api`) is preserved,
    /// unlike `Url::join` with a leading slash.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.api_base.as_str().trim_end_matches('/');
        let path = if path.starts_with('/') { path.to_string() } else { format!("/{}", path) };
        Url::parse(&format!("{}{}", base, path)).with_context(|| format!("invalid endpoint path '{}'", path))
    }
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(base.trim()).with_context(|| format!("invalid API base URL '{}'", base))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("unsupported API base scheme '{}' (expected http or https)", other)),
    }
}

pub fn parse_timeout(v: &str) -> Result<u64> {
    let ms: u64 = v.trim().parse().with_context(|| format!("timeout must be a whole number of milliseconds, got '{}'", v))?;
    if ms == 0 { return Err(anyhow!("timeout must be greater than zero")); }
    Ok(ms)
}

fn default_session_file(home: Option<&str>) -> PathBuf {
    let root = home.map(Path::new).unwrap_or_else(|| Path::new("."));
    root.join(".sims").join("session.json")
}
