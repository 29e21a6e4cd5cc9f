use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use outage_bot::entity::ChatId;
use outage_bot::entity::OutageRecord;
use outage_bot::entity::Subscriber;
use outage_bot::feed::FeedInfo;
use outage_bot::feed::OutageSource;
use outage_bot::feed::error::FeedError;
use outage_bot::sender::SendError;
use outage_bot::sender::Transport;
use uuid::Uuid;

#[allow(dead_code)]
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("outage-bot-test-{}", Uuid::new_v4()))
}

#[allow(dead_code)]
pub fn teardown_dir(path: PathBuf) {
    if path.exists() {
        let _ = std::fs::remove_dir_all(path);
    }
}

#[allow(dead_code)]
pub fn outage(id: i64, street_id: i64, buildings: &str, comment: &str) -> OutageRecord {
    OutageRecord {
        id,
        start_timestamp: "2024-11-28T06:47:00+00:00".to_string(),
        end_timestamp: "2024-11-28T10:00:00+00:00".to_string(),
        city_name: "Львів".to_string(),
        street_id,
        street_name: "Городоцька".to_string(),
        affected_buildings: buildings.to_string(),
        comment: comment.to_string(),
    }
}

#[allow(dead_code)]
pub fn subscriber(chat_id: ChatId, street_id: i64, building: &str) -> Subscriber {
    Subscriber::new(chat_id, street_id, "Городоцька", building)
}

// MOCK OUTAGE SOURCE

#[allow(dead_code)]
pub struct MockOutageSource {
    info: FeedInfo,
    outages: RwLock<Option<Vec<OutageRecord>>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockOutageSource {
    pub fn new(outages: Vec<OutageRecord>) -> Self {
        Self {
            info: FeedInfo {
                name: "MockFeed".to_string(),
                api_url: "http://mock.invalid".to_string(),
            },
            outages: RwLock::new(Some(outages)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_outages(&self, outages: Vec<OutageRecord>) {
        *self.outages.write().unwrap() = Some(outages);
    }

    /// Makes the next fetches fail until outages are set again.
    pub fn set_failing(&self) {
        *self.outages.write().unwrap() = None;
    }
}

#[async_trait]
impl OutageSource for MockOutageSource {
    async fn list_current_outages(&self) -> Result<Vec<OutageRecord>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outages
            .read()
            .unwrap()
            .clone()
            .ok_or(FeedError::UnexpectedStatus { status: 503 })
    }

    fn info(&self) -> &FeedInfo {
        &self.info
    }
}

// MOCK TRANSPORT

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum Behavior {
    Blocked,
    Fail,
    Delay(Duration),
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockTransport {
    pub sent: Mutex<Vec<(ChatId, String)>>,
    behaviors: Mutex<HashMap<ChatId, Behavior>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Artificial latency added to every send.
    latency: Mutex<Duration>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behavior(&self, chat_id: ChatId, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(chat_id, behavior);
    }

    pub fn clear_behavior(&self, chat_id: ChatId) {
        self.behaviors.lock().unwrap().remove(&chat_id);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> usize {
        self.sent().iter().filter(|(id, _)| *id == chat_id).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        let behavior = self.behaviors.lock().unwrap().get(&chat_id).copied();

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let result = match behavior {
            Some(Behavior::Blocked) => Err(SendError::Blocked {
                chat_id,
                message: "403: Forbidden: bot was blocked by the user".to_string(),
            }),
            Some(Behavior::Fail) => Err(SendError::Other {
                chat_id,
                message: "502: Bad Gateway".to_string(),
            }),
            Some(Behavior::Delay(d)) => {
                tokio::time::sleep(d).await;
                self.sent.lock().unwrap().push((chat_id, text.to_string()));
                Ok(())
            }
            None => {
                self.sent.lock().unwrap().push((chat_id, text.to_string()));
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
