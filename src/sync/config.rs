use std::{env, path::PathBuf, time::Duration};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_STORAGE_DIR: &str = "data/client";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    /// Looked up from the index page when absent.
    pub csrf_token: Option<String>,
    pub storage_dir: PathBuf,
    pub request_timeout: Duration,
    pub flush_interval: Duration,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: None,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Reads `HABITS_BASE_URL`, `HABITS_CSRF_TOKEN`, `HABITS_CLIENT_DIR`,
    /// `HABITS_REQUEST_TIMEOUT_SECS` and `HABITS_FLUSH_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url =
            lookup("HABITS_BASE_URL").unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
        let mut config = Self::new(base_url);
        config.csrf_token = lookup("HABITS_CSRF_TOKEN").filter(|token| !token.trim().is_empty());
        if let Some(dir) = lookup("HABITS_CLIENT_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("HABITS_REQUEST_TIMEOUT_SECS").as_deref().and_then(parse_secs) {
            config.request_timeout = secs;
        }
        if let Some(secs) = lookup("HABITS_FLUSH_INTERVAL_SECS").as_deref().and_then(parse_secs) {
            config.flush_interval = secs;
        }
        config
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Whole positive seconds; zero and garbage are ignored.
fn parse_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
