use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::entity::ChatId;
use crate::entity::Subscriber;
use crate::entity::Watermark;
use crate::repository::SubscriberStore;
use crate::repository::error::RepositoryError;

/// Key-value subscriber store kept in process memory.
#[derive(Default)]
pub struct MemorySubscriberStore {
    subscribers: RwLock<BTreeMap<ChatId, Subscriber>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        Self {
            subscribers: RwLock::new(subscribers.into_iter().map(|s| (s.chat_id, s)).collect()),
        }
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscriber>, RepositoryError> {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(subscribers.get(&chat_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(subscribers.values().cloned().collect())
    }

    async fn save(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscriber.chat_id, subscriber.clone());
        Ok(())
    }

    async fn remove(&self, chat_id: ChatId) -> Result<bool, RepositoryError> {
        Ok(self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chat_id)
            .is_some())
    }

    async fn update_watermark(
        &self,
        expected: &Subscriber,
        watermark: Watermark,
    ) -> Result<bool, RepositoryError> {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        match subscribers.get_mut(&expected.chat_id) {
            Some(current) if current.same_address(expected) => {
                current.watermark = Some(watermark);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
