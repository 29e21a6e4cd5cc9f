//! Business logic services.

use std::sync::Arc;

use crate::repository::SubscriberLocks;
use crate::repository::SubscriberStore;
use crate::service::subscription_service::SubscriptionService;

pub mod error;
pub mod subscription_service;

/// Container for all application services.
pub struct Services {
    pub subscription: Arc<SubscriptionService>,
}

impl Services {
    /// Creates all services on top of the shared store and lock registry.
    pub fn new(store: Arc<dyn SubscriberStore>, locks: Arc<SubscriberLocks>) -> Self {
        Self {
            subscription: Arc::new(SubscriptionService::new(store, locks)),
        }
    }
}
