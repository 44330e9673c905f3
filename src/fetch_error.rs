#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Station page not found (404): {0}")]
    NotFound(String),
    #[error("Server error (5xx): {0}")]
    ServerError(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl FetchError {
    /// Whether another attempt might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::ServerError(_) => true,
            FetchError::Request(e) => e.is_connect() || e.is_timeout(),
            FetchError::NotFound(_) => false,
        }
    }
}
