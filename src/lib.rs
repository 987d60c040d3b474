//! Meteobot: scheduled weather reports for Telegram chats.
//!
//! At fixed local times the bot fetches current conditions and the 3-hour
//! forecast for one city, composes a Russian-language report and pushes it
//! to every configured chat. Optionally, inbound chat messages are scanned
//! against a word list and repeat offenders are escalated.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod report;
pub mod weather;

pub mod moderation;
pub mod transport;

pub mod delivery;
pub mod scheduler;
pub mod telegram;
