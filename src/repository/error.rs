#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RepositoryError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid record `{name}`: {message}")]
    InvalidRecord { name: String, message: String },
}
