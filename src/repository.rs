//! Subscriber storage.
//!
//! The store is a single capability trait with interchangeable adapters. Both
//! writers (the notification cycle and the subscription service) serialize on
//! a chat through [`SubscriberLocks`] before they read-then-write. Writers in
//! other processes are not covered by those locks, so the cycle records
//! watermarks with [`SubscriberStore::update_watermark`], which never
//! overwrites an address edit.

use async_trait::async_trait;

use crate::entity::ChatId;
use crate::entity::Subscriber;
use crate::entity::Watermark;
use crate::repository::error::RepositoryError;

pub mod dir_lock;
pub mod error;
pub mod file_store;
pub mod lock;
pub mod memory_store;

pub use lock::SubscriberLocks;

/// Capability interface over a subscriber directory.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Returns the subscriber for `chat_id`, if any.
    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscriber>, RepositoryError>;

    /// Returns all subscribers ordered by chat id.
    async fn all(&self) -> Result<Vec<Subscriber>, RepositoryError>;

    /// Inserts or replaces the record for `subscriber.chat_id`.
    async fn save(&self, subscriber: &Subscriber) -> Result<(), RepositoryError>;

    /// Deletes the record. Returns `false` if there was nothing to delete.
    async fn remove(&self, chat_id: ChatId) -> Result<bool, RepositoryError>;

    /// Atomically sets the watermark of `expected.chat_id`, provided the stored
    /// record still has the street and building of `expected`.
    ///
    /// Returns `false` and writes nothing if the record is gone or its address
    /// changed. Other fields of the stored record are kept as they are.
    async fn update_watermark(
        &self,
        expected: &Subscriber,
        watermark: Watermark,
    ) -> Result<bool, RepositoryError>;
}
