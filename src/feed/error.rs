#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Feed returned unexpected status {status}.")]
    UnexpectedStatus { status: u16 },

    #[error("Failed to parse API response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),

    #[error("Invalid data from API: missing field `{field}`.")]
    MissingField { field: String },
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::RequestFailed(Box::new(e))
    }
}
