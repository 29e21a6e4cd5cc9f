//! Outage feed sources.

use async_trait::async_trait;

use crate::entity::OutageRecord;
use crate::feed::error::FeedError;

pub mod error;
pub mod loe_feed;

/// Static description of a feed source.
#[derive(Clone, Debug, Default)]
pub struct FeedInfo {
    /// Human readable name used in logs, e.g. "LOE".
    pub name: String,
    /// Full URL of the outage listing endpoint.
    pub api_url: String,
}

/// A source of the current outage snapshot.
///
/// Implementations return either the complete list or an error. Partial
/// results are never returned.
#[async_trait]
pub trait OutageSource: Send + Sync {
    async fn list_current_outages(&self) -> Result<Vec<OutageRecord>, FeedError>;

    fn info(&self) -> &FeedInfo;
}
