//! Telegram adapter: outbound transport, HTML helpers and the inbound dispatcher.
//!
//! [`TelegramTransport`] implements [`ChatTransport`] on the Bot API with a
//! bounded request timeout. [`run_moderation`] runs the teloxide dispatcher
//! that feeds inbound text messages to the moderation filter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{ChatPermissions, MessageId, ParseMode, UserId};
use tracing::{debug, info};

use crate::moderation::{self, InboundMessage, ModerationFilter};
use crate::transport::{ChatTransport, DeliveryError};

pub mod ui;

// ---------------------------------------------------------------------------
// Outbound transport
// ---------------------------------------------------------------------------

/// Bot API transport with a per-request timeout.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Create a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .context("failed to build Telegram HTTP client")?;
        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Send {
                chat_id,
                reason: e.to_string(),
            })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), DeliveryError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Delete {
                chat_id,
                message_id,
                reason: e.to_string(),
            })
    }

    async fn restrict_sender(
        &self,
        chat_id: i64,
        user_id: u64,
        duration: Duration,
    ) -> Result<(), DeliveryError> {
        let until = restriction_until(Utc::now(), duration).ok_or_else(|| {
            DeliveryError::Restrict {
                chat_id,
                user_id,
                reason: format!(
                    "restriction of {}s is outside the temporary range",
                    duration.as_secs()
                ),
            }
        })?;

        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id), ChatPermissions::empty())
            .until_date(until)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Restrict {
                chat_id,
                user_id,
                reason: e.to_string(),
            })
    }
}

/// Shortest restriction the Bot API treats as temporary.
pub const MIN_RESTRICTION: Duration = Duration::from_secs(30);

/// Longest restriction the Bot API treats as temporary (366 days).
pub const MAX_RESTRICTION: Duration = Duration::from_secs(31_622_400);

/// End of a restriction of `duration` starting at `now`.
///
/// Returns `None` outside [`MIN_RESTRICTION`]..=[`MAX_RESTRICTION`]: the
/// Bot API turns such restrictions into permanent ones.
pub fn restriction_until(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    if !(MIN_RESTRICTION..=MAX_RESTRICTION).contains(&duration) {
        return None;
    }
    let delta = chrono::Duration::from_std(duration).ok()?;
    now.checked_add_signed(delta)
}

// ---------------------------------------------------------------------------
// Inbound dispatcher
// ---------------------------------------------------------------------------

/// Shared dependencies injected into teloxide handlers via `dptree::deps!`.
#[derive(Clone)]
struct SharedState {
    filter: Arc<ModerationFilter>,
    transport: Arc<dyn ChatTransport>,
}

/// Run the inbound moderation dispatcher on `bot` (long polling).
///
/// Blocks until Ctrl+C.
pub async fn run_moderation(
    bot: Bot,
    filter: Arc<ModerationFilter>,
    transport: Arc<dyn ChatTransport>,
) {
    let shared = SharedState { filter, transport };
    let handler = Update::filter_message().endpoint(handle_message);

    info!("telegram dispatcher starting");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![shared])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("telegram dispatcher stopped");
}

/// Handle an incoming Telegram message.
async fn handle_message(msg: Message, state: SharedState) -> ResponseResult<()> {
    let Some(inbound) = inbound_from(&msg) else {
        return Ok(());
    };
    debug!(
        chat_id = inbound.chat_id,
        sender_id = inbound.sender_id,
        "telegram message received"
    );
    moderation::moderate(&state.filter, state.transport.as_ref(), &inbound).await;
    Ok(())
}

/// Text messages from a user, excluding bot commands.
fn inbound_from(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from.as_ref()?;
    let text = msg.text()?;
    if text.starts_with('/') {
        return None;
    }
    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_id: user.id.0,
        sender_name: user.first_name.clone(),
        text: text.to_owned(),
    })
}
