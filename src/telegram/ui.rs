//! HTML formatting for bot-authored Telegram messages.
//!
//! All output uses HTML parse mode (never MarkdownV2).

/// Escape special HTML characters in user-provided text.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Warning posted after an offending message is removed.
pub fn warning_notice(name: &str, count: u32, threshold: u32) -> String {
    format!(
        "⚠️ {}, без мата! Предупреждение {count}/{threshold}.",
        escape_html(name)
    )
}

/// Notice posted when a sender hits the threshold and the counter resets.
pub fn escalation_notice(name: &str, threshold: u32) -> String {
    format!(
        "⛔ {}, исчерпан лимит предупреждений ({threshold}/{threshold}). Счётчик сброшен.",
        escape_html(name)
    )
}

/// Notice posted when a sender is muted.
pub fn mute_notice(name: &str, minutes: u64) -> String {
    format!("⚠️ {}, без мата! (мут {minutes} мин)", escape_html(name))
}
