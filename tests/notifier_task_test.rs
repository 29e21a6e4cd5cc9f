use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use outage_bot::notification::CycleOptions;
use outage_bot::notification::NotificationCycle;
use outage_bot::repository::SubscriberLocks;
use outage_bot::repository::SubscriberStore;
use outage_bot::repository::memory_store::MemorySubscriberStore;
use outage_bot::task::notifier_task::NotifierTask;
use outage_bot::task::quiet_hours::QuietHours;

mod common;

use common::MockOutageSource;
use common::MockTransport;

fn setup(
    poll_interval: Duration,
    quiet_hours: Option<QuietHours>,
) -> (Arc<NotifierTask>, Arc<MockOutageSource>, Arc<MockTransport>) {
    let (task, source, transport, _store) = setup_with_store(poll_interval, quiet_hours);
    (task, source, transport)
}

fn setup_with_store(
    poll_interval: Duration,
    quiet_hours: Option<QuietHours>,
) -> (
    Arc<NotifierTask>,
    Arc<MockOutageSource>,
    Arc<MockTransport>,
    Arc<MemorySubscriberStore>,
) {
    let source = Arc::new(MockOutageSource::new(vec![common::outage(
        1,
        12783,
        "271, 273",
        "ГПВ",
    )]));
    let store = Arc::new(MemorySubscriberStore::with_subscribers(vec![
        common::subscriber(1, 12783, "271"),
    ]));
    let transport = Arc::new(MockTransport::new());
    let cycle = Arc::new(NotificationCycle::new(
        source.clone(),
        store.clone(),
        transport.clone(),
        Arc::new(SubscriberLocks::new()),
        CycleOptions::default(),
    ));
    let task = NotifierTask::new(cycle, poll_interval, quiet_hours);
    (task, source, transport, store)
}

#[tokio::test]
async fn test_run_tick_reports_cycle() {
    let (task, _source, transport) = setup(Duration::from_secs(60), None);

    let report = task.run_tick().await.expect("Tick failed");
    assert_eq!(report.subscribers, 1);
    assert_eq!(report.sent, 1);

    let report = task.run_tick().await.unwrap();
    assert_eq!(report.already_notified, 1);
    assert_eq!(transport.sent_to(1), 1);
}

#[tokio::test]
async fn test_run_tick_propagates_source_failure() {
    let (task, source, transport) = setup(Duration::from_secs(60), None);
    source.set_failing();

    assert!(task.run_tick().await.is_err());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_start_and_stop_loop() {
    let (task, source, transport) = setup(Duration::from_millis(20), None);

    task.clone().start().unwrap();
    assert!(task.is_running());
    tokio::time::sleep(Duration::from_millis(150)).await;
    task.stop().unwrap();
    assert!(!task.is_running());

    assert!(source.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(transport.sent_to(1), 1);

    // Let the loop observe the stop, then make sure it stays idle.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let calls = source.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_quiet_hours_covering_whole_day_skip_ticks() {
    // 0-23 and 23-0 together cover the whole day exactly once.
    let (task, source, _transport) = setup(
        Duration::from_millis(20),
        Some(QuietHours::new(0, 23).unwrap()),
    );
    let (late_task, late_source, _late_transport) = setup(
        Duration::from_millis(20),
        Some(QuietHours::new(23, 0).unwrap()),
    );

    task.clone().start().unwrap();
    late_task.clone().start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    task.stop().unwrap();
    late_task.stop().unwrap();

    let calls = source.calls.load(Ordering::SeqCst);
    let late_calls = late_source.calls.load(Ordering::SeqCst);
    assert!(calls == 0 || late_calls == 0);
    assert!(calls + late_calls >= 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_inflight_delivery() {
    let (task, _source, transport, store) = setup_with_store(Duration::from_secs(60), None);
    transport.set_latency(Duration::from_millis(300));

    task.clone().start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent().is_empty());

    task.shutdown().await.expect("Shutdown failed");

    assert_eq!(transport.sent_to(1), 1);
    let saved = store.get(1).await.unwrap().unwrap();
    assert_eq!(saved.watermark.unwrap().comment, "ГПВ");
}

#[tokio::test]
async fn test_shutdown_wakes_idle_loop() {
    let (task, source, _transport) = setup(Duration::from_secs(3600), None);

    task.clone().start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(1), task.shutdown())
        .await
        .expect("Shutdown waited for the next tick")
        .unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_restart_before_previous_loop_finished_is_rejected() {
    let (task, source, transport) = setup(Duration::from_millis(20), None);
    transport.set_latency(Duration::from_millis(300));

    task.clone().start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.stop().unwrap();

    assert!(task.clone().start().is_err());
    assert!(!task.is_running());

    task.shutdown().await.unwrap();
    let calls = source.calls.load(Ordering::SeqCst);
    assert_eq!(calls, 1);

    // Once the old loop is gone a fresh one starts normally.
    task.clone().start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.shutdown().await.unwrap();
    assert!(source.calls.load(Ordering::SeqCst) > calls);
    assert_eq!(transport.sent_to(1), 1);
}
