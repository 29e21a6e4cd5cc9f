use std::sync::Arc;

use outage_bot::entity::Watermark;
use outage_bot::repository::SubscriberLocks;
use outage_bot::repository::SubscriberStore;
use outage_bot::repository::file_store::FileSubscriberStore;
use outage_bot::repository::memory_store::MemorySubscriberStore;
use outage_bot::service::Services;
use outage_bot::service::error::ServiceError;
use outage_bot::service::subscription_service::SubscribeResult;

mod common;

fn setup_services() -> (Services, Arc<MemorySubscriberStore>) {
    let store = Arc::new(MemorySubscriberStore::new());
    let services = Services::new(store.clone(), Arc::new(SubscriberLocks::new()));
    (services, store)
}

fn watermark() -> Watermark {
    Watermark {
        start: "2024-11-28T06:47:00+00:00".to_string(),
        end: "2024-11-28T10:00:00+00:00".to_string(),
        comment: "ГПВ".to_string(),
    }
}

#[tokio::test]
async fn test_subscribe_creates_subscriber() {
    let (services, store) = setup_services();

    let result = services
        .subscription
        .subscribe(1, 12783, " Городоцька ", "271-а")
        .await
        .expect("Failed to subscribe");

    assert!(matches!(result, SubscribeResult::Created(_)));
    let saved = store.get(1).await.unwrap().unwrap();
    assert_eq!(saved.street_name, "Городоцька");
    assert_eq!(saved.building, "271-А");
    assert!(saved.watermark.is_none());
}

#[tokio::test]
async fn test_subscribe_same_address_keeps_watermark() {
    let (services, store) = setup_services();
    store
        .save(&common::subscriber(1, 12783, "271").with_watermark(watermark()))
        .await
        .unwrap();

    let result = services
        .subscription
        .subscribe(1, 12783, "вул. Городоцька", "271")
        .await
        .unwrap();

    assert!(matches!(result, SubscribeResult::Unchanged(_)));
    let saved = store.get(1).await.unwrap().unwrap();
    assert_eq!(saved.watermark, Some(watermark()));
    assert_eq!(saved.street_name, "вул. Городоцька");
}

#[tokio::test]
async fn test_subscribe_new_address_clears_watermark() {
    let (services, store) = setup_services();
    store
        .save(&common::subscriber(1, 12783, "271").with_watermark(watermark()))
        .await
        .unwrap();

    let result = services
        .subscription
        .subscribe(1, 12783, "Городоцька", "273")
        .await
        .unwrap();

    assert!(matches!(result, SubscribeResult::Updated(_)));
    let saved = store.get(1).await.unwrap().unwrap();
    assert_eq!(saved.building, "273");
    assert!(saved.watermark.is_none());
}

#[tokio::test]
async fn test_subscribe_validation() {
    let (services, store) = setup_services();
    let service = &services.subscription;

    assert!(matches!(
        service.subscribe(1, 0, "Городоцька", "1").await,
        Err(ServiceError::InvalidStreetId { street_id: 0 })
    ));
    assert!(matches!(
        service.subscribe(1, 5, "   ", "1").await,
        Err(ServiceError::EmptyStreetName)
    ));
    assert!(matches!(
        service.subscribe(1, 5, "Городоцька", "1, 2").await,
        Err(ServiceError::InvalidBuilding { .. })
    ));
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_and_show() {
    let (services, _store) = setup_services();
    let service = &services.subscription;

    service.subscribe(1, 5, "Шевченка", "12").await.unwrap();
    service.subscribe(2, 5, "Шевченка", "14").await.unwrap();

    assert!(service.show(1).await.unwrap().is_some());
    assert_eq!(service.list().await.unwrap().len(), 2);

    assert!(service.unsubscribe(1).await.unwrap());
    assert!(!service.unsubscribe(1).await.unwrap());
    assert!(service.show(1).await.unwrap().is_none());
    assert_eq!(service.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_services_on_file_store() {
    let dir = common::temp_dir();
    let store = Arc::new(FileSubscriberStore::new(&dir).await.unwrap());
    let services = Services::new(store.clone(), Arc::new(SubscriberLocks::new()));

    services
        .subscription
        .subscribe(100, 12783, "Городоцька", "279")
        .await
        .unwrap();

    assert!(dir.join("100.json").exists());
    let saved = store.get(100).await.unwrap().unwrap();
    assert_eq!(saved.building, "279");

    common::teardown_dir(dir);
}
