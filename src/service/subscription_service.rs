//! Subscription management: the writer of the subscriber store that runs
//! alongside the notification cycle.

use std::sync::Arc;
use std::sync::LazyLock;

use log::info;
use regex::Regex;

use crate::entity::ChatId;
use crate::entity::Subscriber;
use crate::repository::SubscriberLocks;
use crate::repository::SubscriberStore;
use crate::service::error::ServiceError;

static BUILDING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(-[A-ZА-ЯІЇЄҐ])?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeResult {
    Created(Subscriber),
    /// Address changed; the watermark was cleared.
    Updated(Subscriber),
    /// Same address as before; the watermark was kept.
    Unchanged(Subscriber),
}

impl SubscribeResult {
    pub fn subscriber(&self) -> &Subscriber {
        match self {
            Self::Created(s) | Self::Updated(s) | Self::Unchanged(s) => s,
        }
    }
}

pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
    locks: Arc<SubscriberLocks>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriberStore>, locks: Arc<SubscriberLocks>) -> Self {
        Self { store, locks }
    }

    /// Normalizes a building number, e.g. `" 13-а "` to `"13-А"`.
    pub fn normalize_building(raw: &str) -> Result<String, ServiceError> {
        let building = raw.trim().to_uppercase();
        if BUILDING_PATTERN.is_match(&building) {
            Ok(building)
        } else {
            Err(ServiceError::InvalidBuilding {
                building: raw.to_string(),
            })
        }
    }

    /// Creates or replaces the subscription of `chat_id`.
    pub async fn subscribe(
        &self,
        chat_id: ChatId,
        street_id: i64,
        street_name: &str,
        building: &str,
    ) -> Result<SubscribeResult, ServiceError> {
        if street_id <= 0 {
            return Err(ServiceError::InvalidStreetId { street_id });
        }
        let street_name = street_name.trim();
        if street_name.is_empty() {
            return Err(ServiceError::EmptyStreetName);
        }
        let building = Self::normalize_building(building)?;
        let requested = Subscriber::new(chat_id, street_id, street_name, building);

        let _guard = self.locks.lock(chat_id).await;
        let result = match self.store.get(chat_id).await? {
            None => SubscribeResult::Created(requested),
            Some(existing) if existing.same_address(&requested) => {
                SubscribeResult::Unchanged(Subscriber {
                    street_name: requested.street_name,
                    ..existing
                })
            }
            Some(_) => SubscribeResult::Updated(requested),
        };
        self.store.save(result.subscriber()).await?;

        info!(
            "Subscriber {chat_id} subscribed to street {street_id} building {}.",
            result.subscriber().building
        );
        Ok(result)
    }

    /// Removes the subscription. Returns `false` if there was none.
    pub async fn unsubscribe(&self, chat_id: ChatId) -> Result<bool, ServiceError> {
        let _guard = self.locks.lock(chat_id).await;
        let removed = self.store.remove(chat_id).await?;
        if removed {
            info!("Subscriber {chat_id} unsubscribed.");
        }
        Ok(removed)
    }

    pub async fn show(&self, chat_id: ChatId) -> Result<Option<Subscriber>, ServiceError> {
        Ok(self.store.get(chat_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>, ServiceError> {
        Ok(self.store.all().await?)
    }
}
