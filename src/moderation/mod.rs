//! Inbound message moderation.
//!
//! [`ModerationFilter::evaluate`] is the per-sender state machine: every
//! match bumps the sender's counter; below the threshold the sender is
//! warned, at the threshold the configured [`EscalationPolicy`] applies.
//! [`moderate`] turns the verdict into transport actions.

pub mod tracker;
pub mod word_list;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{EscalationMode, ModerationConfig};
use crate::telegram::ui;
use crate::transport::ChatTransport;

pub use tracker::ViolationTracker;
pub use word_list::WordFilter;

/// Decision for one evaluated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No listed word; nothing happens.
    Clean,
    /// Message removed, sender warned; carries the sender's current count.
    Warn(u32),
    /// Message removed, threshold reached.
    Escalate,
}

/// What escalation does. The two policies are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationPolicy {
    /// Post an escalation notice and reset the counter to zero.
    Reset,
    /// Restrict the sender for `duration`; the counter is kept, so every
    /// further offense escalates again.
    Mute {
        /// Restriction length.
        duration: Duration,
    },
}

impl EscalationPolicy {
    /// Policy selected by configuration.
    pub fn from_config(config: &ModerationConfig) -> Self {
        match config.escalation {
            EscalationMode::Reset => Self::Reset,
            EscalationMode::Mute => Self::Mute {
                duration: Duration::from_secs(config.mute_minutes.saturating_mul(60)),
            },
        }
    }
}

/// Word matcher plus per-sender violation state.
#[derive(Debug)]
pub struct ModerationFilter {
    words: WordFilter,
    tracker: ViolationTracker,
    threshold: u32,
    policy: EscalationPolicy,
}

impl ModerationFilter {
    /// Build a filter. A zero `threshold` is treated as 1.
    pub fn new(words: WordFilter, threshold: u32, policy: EscalationPolicy) -> Self {
        Self {
            words,
            tracker: ViolationTracker::new(),
            threshold: threshold.max(1),
            policy,
        }
    }

    /// Build a filter from configuration, loading the word list from disk.
    pub fn from_config(config: &ModerationConfig) -> Self {
        Self::new(
            WordFilter::load(&config.word_list),
            config.warn_threshold,
            EscalationPolicy::from_config(config),
        )
    }

    /// Evaluate one message from `sender`, updating their counter.
    pub fn evaluate(&self, text: &str, sender: u64) -> Verdict {
        if !self.words.is_match(text) {
            return Verdict::Clean;
        }

        let count = match self.policy {
            EscalationPolicy::Reset => self.tracker.record_offense_with_reset(sender, self.threshold),
            EscalationPolicy::Mute { .. } => self.tracker.record_offense(sender),
        };

        if count < self.threshold {
            Verdict::Warn(count)
        } else {
            Verdict::Escalate
        }
    }

    /// Offense count that triggers escalation.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Active escalation policy.
    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    /// Violation state, for inspection.
    pub fn tracker(&self) -> &ViolationTracker {
        &self.tracker
    }

    /// True when the word list produced at least one pattern.
    pub fn is_active(&self) -> bool {
        self.words.is_active()
    }
}

/// A text message received in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the message arrived in.
    pub chat_id: i64,
    /// Message id within the chat.
    pub message_id: i32,
    /// Sender's user id.
    pub sender_id: u64,
    /// Sender's display name, used in notices.
    pub sender_name: String,
    /// Message text.
    pub text: String,
}

/// Evaluate `message` and carry out the verdict through `transport`.
///
/// Transport failures are logged and do not change the verdict.
pub async fn moderate(
    filter: &ModerationFilter,
    transport: &dyn ChatTransport,
    message: &InboundMessage,
) -> Verdict {
    let verdict = filter.evaluate(&message.text, message.sender_id);
    if verdict == Verdict::Clean {
        debug!(chat_id = message.chat_id, sender_id = message.sender_id, "message clean");
        return verdict;
    }

    if let Err(e) = transport
        .delete_message(message.chat_id, message.message_id)
        .await
    {
        warn!(error = %e, "failed to delete offending message");
    }

    let notice = match (verdict, filter.policy()) {
        (Verdict::Warn(count), _) => {
            info!(
                chat_id = message.chat_id,
                sender_id = message.sender_id,
                count,
                threshold = filter.threshold(),
                "offending message removed, sender warned"
            );
            ui::warning_notice(&message.sender_name, count, filter.threshold())
        }
        (_, EscalationPolicy::Reset) => {
            info!(
                chat_id = message.chat_id,
                sender_id = message.sender_id,
                "threshold reached, counter reset"
            );
            ui::escalation_notice(&message.sender_name, filter.threshold())
        }
        (_, EscalationPolicy::Mute { duration }) => {
            info!(
                chat_id = message.chat_id,
                sender_id = message.sender_id,
                duration_secs = duration.as_secs(),
                "threshold reached, restricting sender"
            );
            if let Err(e) = transport
                .restrict_sender(message.chat_id, message.sender_id, duration)
                .await
            {
                warn!(error = %e, "failed to restrict sender");
            }
            ui::mute_notice(&message.sender_name, duration.as_secs() / 60)
        }
    };

    if let Err(e) = transport.send_text(message.chat_id, &notice).await {
        warn!(error = %e, "failed to post moderation notice");
    }

    verdict
}
