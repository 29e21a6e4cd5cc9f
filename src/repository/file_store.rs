//! Flat-file subscriber store: one JSON document per chat.
//!
//! Every write holds an exclusive lock on the directory, so several processes
//! can share one store.

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use log::info;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;

use crate::entity::ChatId;
use crate::entity::Subscriber;
use crate::entity::Watermark;
use crate::repository::SubscriberStore;
use crate::repository::dir_lock::DirLock;
use crate::repository::error::RepositoryError;

const EXTENSION: &str = "json";

/// On-disk shape of a subscriber. The watermark is flattened into three
/// optional fields so a hand-edited file can carry any subset of them.
#[derive(Serialize, Deserialize, Default, Debug)]
struct SubscriberFile {
    street_id: i64,
    street_name: String,
    building: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notified_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notified_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notified_comment: Option<String>,
}

impl SubscriberFile {
    fn from_subscriber(sub: &Subscriber) -> Self {
        let watermark = sub.watermark.clone();
        let (start, end, comment) = match watermark {
            Some(w) => (Some(w.start), Some(w.end), Some(w.comment)),
            None => (None, None, None),
        };
        Self {
            street_id: sub.street_id,
            street_name: sub.street_name.clone(),
            building: sub.building.clone(),
            last_notified_start: start,
            last_notified_end: end,
            last_notified_comment: comment,
        }
    }

    fn into_subscriber(self, chat_id: ChatId) -> Subscriber {
        let watermark = match (
            self.last_notified_start,
            self.last_notified_end,
            self.last_notified_comment,
        ) {
            (Some(start), Some(end), Some(comment)) => Some(Watermark {
                start,
                end,
                comment,
            }),
            (None, None, None) => None,
            _ => {
                warn!("Subscriber {chat_id} has a partial watermark. Treating it as unset.");
                None
            }
        };
        Subscriber {
            chat_id,
            street_id: self.street_id,
            street_name: self.street_name,
            building: self.building,
            watermark,
        }
    }
}

/// Stores each subscriber as `<chat_id>.json` under a directory.
pub struct FileSubscriberStore {
    dir: PathBuf,
}

impl FileSubscriberStore {
    /// Opens the store, creating `dir` if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        if !fs::try_exists(&dir).await? {
            debug!("Subscriber directory {} does not exist. Creating...", dir.display());
            fs::create_dir_all(&dir).await?;
            info!("Created {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, chat_id: ChatId) -> PathBuf {
        self.dir.join(format!("{chat_id}.{EXTENSION}"))
    }

    fn chat_id_of(path: &Path) -> Result<ChatId, RepositoryError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        stem.parse::<ChatId>()
            .map_err(|e| RepositoryError::InvalidRecord {
                name: path.display().to_string(),
                message: format!("file name is not a chat id: {e}"),
            })
    }

    async fn lock_dir(&self) -> Result<DirLock, RepositoryError> {
        let dir = self.dir.clone();
        let lock = tokio::task::spawn_blocking(move || DirLock::acquire(&dir))
            .await
            .map_err(std::io::Error::other)??;
        Ok(lock)
    }

    async fn write(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        let content = serde_json::to_string_pretty(&SubscriberFile::from_subscriber(subscriber))?;

        let path = self.file_path(subscriber.chat_id);
        let tmp_path = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp_path, content).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<Subscriber, RepositoryError> {
        let chat_id = Self::chat_id_of(path)?;
        let content = fs::read_to_string(path).await?;
        let file: SubscriberFile = serde_json::from_str(&content)?;
        Ok(file.into_subscriber(chat_id))
    }
}

#[async_trait]
impl SubscriberStore for FileSubscriberStore {
    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscriber>, RepositoryError> {
        let path = self.file_path(chat_id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        self.load(&path).await.map(Some)
    }

    async fn all(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut subscribers = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match self.load(&path).await {
                Ok(sub) => subscribers.push(sub),
                Err(e) => warn!("Skipping malformed subscriber file {}: {e}", path.display()),
            }
        }

        subscribers.sort_by_key(|s| s.chat_id);
        Ok(subscribers)
    }

    async fn save(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        let _lock = self.lock_dir().await?;
        self.write(subscriber).await
    }

    async fn remove(&self, chat_id: ChatId) -> Result<bool, RepositoryError> {
        let _lock = self.lock_dir().await?;
        match fs::remove_file(self.file_path(chat_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_watermark(
        &self,
        expected: &Subscriber,
        watermark: Watermark,
    ) -> Result<bool, RepositoryError> {
        let _lock = self.lock_dir().await?;
        let Some(current) = self.get(expected.chat_id).await? else {
            return Ok(false);
        };
        if !current.same_address(expected) {
            return Ok(false);
        }
        self.write(&current.with_watermark(watermark)).await?;
        Ok(true)
    }
}
