//! Message delivery transports.

use async_trait::async_trait;

use crate::entity::ChatId;

pub mod telegram_sender;

/// Why a message could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SendError {
    /// The recipient blocked the bot or no longer exists. Retrying is pointless.
    #[error("Recipient {chat_id} is unreachable: {message}")]
    Blocked { chat_id: ChatId, message: String },

    #[error("Failed to send message to {chat_id}: {message}")]
    Other { chat_id: ChatId, message: String },
}

/// A chat transport able to deliver a text message to a chat.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError>;
}
