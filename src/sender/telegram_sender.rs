//! Telegram Bot API transport.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use serde_json::Value;
use reqwest::header::CONTENT_TYPE;

use crate::entity::ChatId;
use crate::sender::SendError;
use crate::sender::Transport;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

// See https://core.telegram.org/bots/faq#my-bot-is-hitting-limits-how-do-i-avoid-this
const MESSAGES_PER_SECOND: NonZeroU32 = NonZeroU32::new(30).unwrap();

/// Sends HTML formatted messages through `sendMessage`.
pub struct TelegramSender {
    api_url: String,
    token: String,
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl TelegramSender {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        let limiter = RateLimiter::direct(Quota::per_second(MESSAGES_PER_SECOND));

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.token)
    }

    /// Maps a failed Bot API response to a [`SendError`].
    ///
    /// 403 means the user blocked the bot, left the chat or deleted the
    /// account.
    fn classify(chat_id: ChatId, code: u16, description: &str) -> SendError {
        let lower = description.to_lowercase();
        let blocked = code == 403
            || lower.contains("forbidden")
            || lower.contains("bot was blocked")
            || lower.contains("user is deactivated");

        let message = if description.is_empty() {
            format!("status {code}")
        } else {
            format!("{code}: {description}")
        };

        if blocked {
            SendError::Blocked { chat_id, message }
        } else {
            SendError::Other { chat_id, message }
        }
    }

    async fn wait_ratelimit(&self) {
        if self.limiter.check().is_err() {
            info!("Telegram transport is ratelimited. Waiting...");
        }
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl Transport for TelegramSender {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        let other = |message: String| SendError::Other { chat_id, message };

        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        self.wait_ratelimit().await;
        debug!("Sending message to chat {chat_id}.");

        let response = self
            .client
            .post(self.endpoint())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| other(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| other(e.to_string()))?;
        let resp: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        let ok = resp.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
        if status.is_success() && ok {
            return Ok(());
        }

        let code = resp
            .get("error_code")
            .and_then(|v| v.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or_else(|| status.as_u16());
        let description = resp
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        Err(Self::classify(chat_id, code, description))
    }
}
