use std::{env, path::PathBuf, time::Duration};

use crate::web::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server-relative routes of the platform backend.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login/";
    pub const REGISTER: &str = "/auth/register/";
    pub const REFRESH: &str = "/token/refresh/";
    pub const VERIFY: &str = "/token/verify/";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub credentials_path: Option<PathBuf>
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            credentials_path: None
        }
    }

    /// Build the config from environment variables.
    ///
    /// - `SAIL_API_URL`: backend base URL, default `http://localhost:8000/api`
    /// - `SAIL_API_TIMEOUT_SECS`: per-request timeout, default 30
    /// - `SAIL_CREDENTIALS_PATH`: JSON file for persisted credentials; in-memory when unset
    pub fn from_env() -> Result<Self, Error> {
        let base_url = env::var("SAIL_API_URL").ok().filter(|value| !value.trim().is_empty());
        let timeout = parse_timeout(env::var("SAIL_API_TIMEOUT_SECS").ok().as_deref())?;
        let credentials_path = env::var("SAIL_CREDENTIALS_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            base_url: normalize_base_url(base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string())),
            timeout,
            credentials_path
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Joins a server-relative route onto the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub(crate) fn parse_timeout(raw: Option<&str>) -> Result<Duration, Error> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };

    match raw.parse::<u64>() {
        Ok(0) => Err(Error::Config("SAIL_API_TIMEOUT_SECS must be greater than zero".to_string())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(error) => Err(Error::Config(format!("Unable to parse SAIL_API_TIMEOUT_SECS '{}' => {}", raw, error)))
    }
}
