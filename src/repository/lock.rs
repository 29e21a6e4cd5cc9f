use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedMutexGuard;

use crate::entity::ChatId;

/// Registry of per-chat locks.
///
/// Holding the guard for a chat grants exclusive read-then-write access to
/// that subscriber's record. Different chats never block each other.
#[derive(Default)]
pub struct SubscriberLocks {
    locks: Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>,
}

impl SubscriberLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the lock for `chat_id` is free and takes it.
    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(chat_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drops entries nobody currently holds or waits on.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
