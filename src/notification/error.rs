use crate::feed::error::FeedError;
use crate::repository::error::RepositoryError;

/// Errors that abort a whole tick. Subscriber-scoped failures never surface here.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CycleError {
    #[error("Failed to fetch outages: {0}")]
    SourceFetch(#[from] FeedError),

    #[error("Failed to list subscribers: {0}")]
    SubscriberList(#[from] RepositoryError),
}
