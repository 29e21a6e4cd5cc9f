//! Sends a notification and applies its consequences to the subscriber store.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::entity::OutageRecord;
use crate::entity::Subscriber;
use crate::notification::formatter;
use crate::notification::idempotency;
use crate::repository::SubscriberStore;
use crate::sender::SendError;
use crate::sender::Transport;

/// Result of one delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivered; the watermark now records the outage.
    Sent,
    /// The recipient is gone; the subscriber was removed.
    PermanentlyBlocked,
    /// Nothing changed. The subscriber is retried next tick.
    TransientFailure,
}

pub struct DeliveryCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SubscriberStore>,
    send_timeout: Duration,
}

impl DeliveryCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SubscriberStore>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            send_timeout,
        }
    }

    /// Delivers `outage` to `subscriber`.
    ///
    /// The caller must hold the subscriber's lock. The watermark is written
    /// only if the stored address still matches `subscriber`, so an edit made
    /// during the send, even by another process, is never overwritten.
    pub async fn deliver(&self, subscriber: &Subscriber, outage: &OutageRecord) -> DeliveryOutcome {
        let chat_id = subscriber.chat_id;
        let text = formatter::format(outage);

        debug!("Delivering outage {} to subscriber {chat_id}.", outage.id);
        let result = tokio::time::timeout(self.send_timeout, self.transport.send(chat_id, &text)).await;

        match result {
            Ok(Ok(())) => {
                let watermark = idempotency::next_watermark(outage);
                match self.store.update_watermark(subscriber, watermark).await {
                    Ok(true) => {}
                    Ok(false) => info!(
                        "Subscriber {chat_id} changed or removed the subscription during delivery. \
                         Watermark not recorded."
                    ),
                    // The message is out. Worst case the next tick sends it again.
                    Err(e) => error!(
                        "Sent outage {} to {chat_id} but failed to save watermark: {e}",
                        outage.id
                    ),
                }
                DeliveryOutcome::Sent
            }
            Ok(Err(SendError::Blocked { message, .. })) => {
                info!("Subscriber {chat_id} is unreachable ({message}). Removing subscription.");
                if let Err(e) = self.store.remove(chat_id).await {
                    error!("Failed to remove unreachable subscriber {chat_id}: {e}");
                }
                DeliveryOutcome::PermanentlyBlocked
            }
            Ok(Err(e)) => {
                warn!("Transient delivery failure for subscriber {chat_id}: {e}");
                DeliveryOutcome::TransientFailure
            }
            Err(_) => {
                warn!(
                    "Delivery to subscriber {chat_id} timed out after {:?}.",
                    self.send_timeout
                );
                DeliveryOutcome::TransientFailure
            }
        }
    }
}
