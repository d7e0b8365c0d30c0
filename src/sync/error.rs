use thiserror::Error;

/// Failures inside the client sync core. None of them is fatal: transport,
/// malformed and application errors send the toggle to the pending queue,
/// storage errors are logged and the in-memory state carries on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("server reported an error: {0}")]
    Application(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
