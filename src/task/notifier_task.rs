//! Background task running the notification cycle on an interval.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Local;
use chrono::Timelike;
use log::debug;
use log::error;
use log::info;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::notification::CancellationFlag;
use crate::notification::CycleReport;
use crate::notification::NotificationCycle;
use crate::task::quiet_hours::QuietHours;

/// Handle on a spawned check loop.
struct CheckLoop {
    handle: JoinHandle<()>,
    wake: Arc<Notify>,
}

/// Task that periodically fetches outages and notifies subscribers.
pub struct NotifierTask {
    cycle: Arc<NotificationCycle>,
    poll_interval: Duration,
    quiet_hours: Option<QuietHours>,
    running: AtomicBool,
    cancel: CancellationFlag,
    check_loop: Mutex<Option<CheckLoop>>,
}

impl NotifierTask {
    pub fn new(
        cycle: Arc<NotificationCycle>,
        poll_interval: Duration,
        quiet_hours: Option<QuietHours>,
    ) -> Arc<Self> {
        info!(
            "Initializing NotifierTask with poll interval {:?}, quiet hours {}",
            poll_interval,
            quiet_hours.map_or("disabled".to_string(), |q| q.to_string())
        );
        Arc::new(Self {
            cycle,
            poll_interval,
            quiet_hours,
            running: AtomicBool::new(false),
            cancel: CancellationFlag::new(),
            check_loop: Mutex::new(None),
        })
    }

    /// Starts the polling loop. Calling it on a running task does nothing.
    ///
    /// Fails if a previous loop was stopped but is still finishing its tick;
    /// await [`NotifierTask::shutdown`] before starting again.
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        let mut check_loop = self.check_loop.lock().unwrap_or_else(PoisonError::into_inner);
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if check_loop.as_ref().is_some_and(|l| !l.handle.is_finished()) {
            anyhow::bail!("The previous check loop is still finishing its tick.");
        }

        self.running.store(true, Ordering::SeqCst);
        self.cancel.reset();
        info!("Starting NotifierTask check loop.");
        *check_loop = Some(self.clone().spawn_check_loop());
        Ok(())
    }

    /// Stops the loop without waiting for it. A tick in progress stops before
    /// its next subscriber; deliveries already started still finish.
    pub fn stop(&self) -> anyhow::Result<()> {
        info!("Stopping NotifierTask check loop.");
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        if let Some(check_loop) = self
            .check_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            check_loop.wake.notify_one();
        }
        Ok(())
    }

    /// Stops the loop and waits until the tick in progress, including its
    /// in-flight deliveries and store updates, has finished.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.stop()?;
        let check_loop = self
            .check_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(check_loop) = check_loop {
            check_loop.handle.await?;
            info!("NotifierTask check loop finished.");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_check_loop(self: Arc<Self>) -> CheckLoop {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let wake = Arc::new(Notify::new());
        let stopped = wake.clone();
        let handle = tokio::spawn(async move {
            let mut tick: u64 = 0;
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stopped.notified() => {}
                }
                if !self.running.load(Ordering::SeqCst) {
                    info!("Stopping check loop.");
                    break;
                }
                tick += 1;
                if self.is_quiet(Local::now().hour()) {
                    debug!("Within quiet hours. Skipping tick {tick}.");
                    continue;
                }
                let span = tracing::info_span!("notification_cycle", tick);
                if let Err(e) = self.run_tick().instrument(span).await {
                    error!("Error running notification cycle: {e}");
                }
            }
        });
        CheckLoop { handle, wake }
    }

    fn is_quiet(&self, hour: u32) -> bool {
        self.quiet_hours.is_some_and(|q| q.contains(hour))
    }

    /// Runs one cycle outside of the loop.
    pub async fn run_tick(&self) -> anyhow::Result<CycleReport> {
        debug!("Running notification cycle.");
        let report = self.cycle.run_once_until(&self.cancel).await?;
        info!(
            "Cycle done: {} subscribers, {} outages ({} dropped), {} sent, {} already notified, \
             {} without outage, {} blocked, {} transient failures, {} skipped, {} cancelled.",
            report.subscribers,
            report.outages,
            report.dropped_outages,
            report.sent,
            report.already_notified,
            report.no_outage,
            report.blocked,
            report.transient_failures,
            report.skipped,
            report.cancelled,
        );
        Ok(report)
    }
}
