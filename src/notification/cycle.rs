//! One poll tick over the whole subscriber set.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use derive_builder::Builder;
use futures::StreamExt;
use futures::stream;
use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::entity::OutageRecord;
use crate::entity::Subscriber;
use crate::feed::OutageSource;
use crate::notification::delivery::DeliveryCoordinator;
use crate::notification::delivery::DeliveryOutcome;
use crate::notification::error::CycleError;
use crate::notification::idempotency;
use crate::notification::matcher::Matcher;
use crate::notification::matcher::TieBreak;
use crate::repository::SubscriberLocks;
use crate::repository::SubscriberStore;
use crate::sender::Transport;

#[derive(Builder, Clone, Debug)]
#[builder(pattern = "immutable")]
pub struct CycleOptions {
    /// Upper bound on subscribers processed at the same time.
    #[builder(default = "4")]
    pub max_concurrent_deliveries: usize,
    /// Bound on a single transport call.
    #[builder(default = "Duration::from_secs(30)")]
    pub send_timeout: Duration,
    #[builder(default)]
    pub tie_break: TieBreak,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: 4,
            send_timeout: Duration::from_secs(30),
            tie_break: TieBreak::default(),
        }
    }
}

/// Cooperative cancellation checked before each subscriber is started, both
/// before and after waiting for its lock.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one subscriber during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberResult {
    NoOutage,
    AlreadyNotified,
    Delivered(DeliveryOutcome),
    /// The subscriber vanished or could not be read.
    Skipped,
    Cancelled,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outages: usize,
    pub dropped_outages: usize,
    pub subscribers: usize,
    pub no_outage: usize,
    pub already_notified: usize,
    pub sent: usize,
    pub blocked: usize,
    pub transient_failures: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl CycleReport {
    fn record(&mut self, result: SubscriberResult) {
        match result {
            SubscriberResult::NoOutage => self.no_outage += 1,
            SubscriberResult::AlreadyNotified => self.already_notified += 1,
            SubscriberResult::Delivered(DeliveryOutcome::Sent) => self.sent += 1,
            SubscriberResult::Delivered(DeliveryOutcome::PermanentlyBlocked) => self.blocked += 1,
            SubscriberResult::Delivered(DeliveryOutcome::TransientFailure) => {
                self.transient_failures += 1
            }
            SubscriberResult::Skipped => self.skipped += 1,
            SubscriberResult::Cancelled => self.cancelled += 1,
        }
    }
}

/// Everything a per-subscriber task needs. Cheap to clone.
#[derive(Clone)]
struct SubscriberWorker {
    store: Arc<dyn SubscriberStore>,
    locks: Arc<SubscriberLocks>,
    matcher: Matcher,
    delivery: Arc<DeliveryCoordinator>,
}

impl SubscriberWorker {
    async fn process(
        &self,
        snapshot: Subscriber,
        outages: &[OutageRecord],
        cancel: &CancellationFlag,
    ) -> SubscriberResult {
        let chat_id = snapshot.chat_id;
        if cancel.is_cancelled() {
            return SubscriberResult::Cancelled;
        }

        let _guard = self.locks.lock(chat_id).await;
        // The lock may have been held by the subscription flow for a while.
        if cancel.is_cancelled() {
            return SubscriberResult::Cancelled;
        }

        // Re-read under the lock: the subscription flow may have changed or
        // removed the record since the snapshot was taken.
        let subscriber = match self.store.get(chat_id).await {
            Ok(Some(sub)) => sub,
            Ok(None) => {
                debug!("Subscriber {chat_id} unsubscribed during the cycle. Skipping.");
                return SubscriberResult::Skipped;
            }
            Err(e) => {
                error!("Failed to read subscriber {chat_id}: {e}");
                return SubscriberResult::Skipped;
            }
        };

        let Some(outage) = self.matcher.find(&subscriber, outages) else {
            debug!("No relevant outage for subscriber {chat_id}.");
            return SubscriberResult::NoOutage;
        };

        if idempotency::already_sent(&subscriber, outage) {
            debug!("Subscriber {chat_id} already notified about outage {}.", outage.id);
            return SubscriberResult::AlreadyNotified;
        }

        let outcome = self.delivery.deliver(&subscriber, outage).await;
        if outcome == DeliveryOutcome::Sent {
            info!("Notified subscriber {chat_id} about outage {}.", outage.id);
        }
        SubscriberResult::Delivered(outcome)
    }
}

/// Fetch, match and notify over all subscribers for one poll tick.
pub struct NotificationCycle {
    source: Arc<dyn OutageSource>,
    worker: SubscriberWorker,
    max_concurrent: usize,
}

impl NotificationCycle {
    pub fn new(
        source: Arc<dyn OutageSource>,
        store: Arc<dyn SubscriberStore>,
        transport: Arc<dyn Transport>,
        locks: Arc<SubscriberLocks>,
        options: CycleOptions,
    ) -> Self {
        info!(
            "Initializing NotificationCycle with {} workers, send timeout {:?}, tie-break {:?}",
            options.max_concurrent_deliveries, options.send_timeout, options.tie_break
        );
        let delivery = Arc::new(DeliveryCoordinator::new(
            transport,
            store.clone(),
            options.send_timeout,
        ));

        Self {
            source,
            worker: SubscriberWorker {
                store,
                locks,
                matcher: Matcher::new(options.tie_break),
                delivery,
            },
            max_concurrent: options.max_concurrent_deliveries.max(1),
        }
    }

    /// Runs one tick to completion.
    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        self.run_once_until(&CancellationFlag::new()).await
    }

    /// Runs one tick, starting no new subscriber once `cancel` is set.
    /// Deliveries already in flight always finish.
    pub async fn run_once_until(&self, cancel: &CancellationFlag) -> Result<CycleReport, CycleError> {
        let outages = self.source.list_current_outages().await?;
        let fetched = outages.len();
        let outages: Arc<[OutageRecord]> = Self::drop_malformed(outages).into();

        let subscribers = self.worker.store.all().await?;

        let mut report = CycleReport {
            outages: outages.len(),
            dropped_outages: fetched - outages.len(),
            subscribers: subscribers.len(),
            ..Default::default()
        };
        debug!(
            "Processing {} subscribers against {} outages.",
            report.subscribers, report.outages
        );

        let results: Vec<SubscriberResult> = stream::iter(subscribers)
            .map(|sub| {
                let worker = self.worker.clone();
                let outages = outages.clone();
                let cancel = cancel.clone();
                let chat_id = sub.chat_id;
                async move {
                    let task =
                        tokio::spawn(async move { worker.process(sub, &outages, &cancel).await });
                    match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!("Task for subscriber {chat_id} failed: {e}");
                            SubscriberResult::Skipped
                        }
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for result in results {
            report.record(result);
        }
        self.worker.locks.prune();

        Ok(report)
    }

    fn drop_malformed(outages: Vec<OutageRecord>) -> Vec<OutageRecord> {
        outages
            .into_iter()
            .filter(|o| match o.missing_field() {
                Some(field) => {
                    warn!("Dropping outage {} with missing `{field}`.", o.id);
                    false
                }
                None => true,
            })
            .collect()
    }
}
