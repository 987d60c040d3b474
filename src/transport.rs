//! Chat transport interface.
//!
//! The three primitives the bot needs from a chat network: send text,
//! delete a message, restrict a member. [`crate::telegram::TelegramTransport`]
//! is the production implementation; tests substitute recording fakes.

use std::time::Duration;

use async_trait::async_trait;

/// A transport action failed for one chat.
///
/// Callers log these and carry on; one failing chat never stops the rest.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Sending a text message failed.
    #[error("send to chat {chat_id} failed: {reason}")]
    Send {
        /// Destination chat.
        chat_id: i64,
        /// Transport error description.
        reason: String,
    },
    /// Deleting a message failed.
    #[error("delete of message {message_id} in chat {chat_id} failed: {reason}")]
    Delete {
        /// Chat holding the message.
        chat_id: i64,
        /// Message to delete.
        message_id: i32,
        /// Transport error description.
        reason: String,
    },
    /// Restricting a member failed.
    #[error("restrict of user {user_id} in chat {chat_id} failed: {reason}")]
    Restrict {
        /// Chat in which to restrict.
        chat_id: i64,
        /// Member to restrict.
        user_id: u64,
        /// Transport error description.
        reason: String,
    },
}

/// Outbound chat operations.
///
/// Implementations must be `Send + Sync` so the scheduler and the inbound
/// dispatcher can share one instance.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send HTML-formatted `text` to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Send`] on failure.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;

    /// Delete message `message_id` in `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Delete`] on failure.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), DeliveryError>;

    /// Stop `user_id` from writing in `chat_id` for `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Restrict`] on failure.
    async fn restrict_sender(
        &self,
        chat_id: i64,
        user_id: u64,
        duration: Duration,
    ) -> Result<(), DeliveryError>;
}
