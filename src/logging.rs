//! Log sinks for the bot.
//!
//! `start` runs for days, so it gets a rotated JSON file under the logs
//! directory as well as stderr. `once` and `preview` print to stderr only.
//! The level filter comes from `RUST_LOG`, then `[logging] filter`, then
//! [`DEFAULT_FILTER`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// File name prefix of the rotated log; the date is appended per day.
pub const LOG_FILE_PREFIX: &str = "meteobot.log";

/// Filter used when neither `RUST_LOG` nor `[logging] filter` is set.
///
/// Keeps our own events at `info` and mutes per-request chatter from the
/// HTTP and Telegram stacks.
pub const DEFAULT_FILTER: &str = "info,teloxide=warn,reqwest=warn,hyper=warn,hyper_util=warn";

/// Keeps the background file writer running.
///
/// Pending lines are flushed when this is dropped, so `start` holds it
/// until shutdown completes.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Pick the level filter for this run.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` is unset and the configured filter does
/// not parse.
pub fn resolve_filter(settings: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = settings.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|e| anyhow::anyhow!("invalid [logging] filter {directives:?}: {e}"))
}

/// Install the `start` sinks: `{logs_dir}/meteobot.log.YYYY-MM-DD` as
/// JSON lines plus human-readable stderr.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created, the filter
/// is invalid, or a subscriber is already installed.
pub fn init_production(logs_dir: &Path, settings: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(resolve_filter(settings)?)
        .with(tracing_subscriber::fmt::layer().json().with_writer(file_writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Install the stderr sink for `once` and `preview`.
///
/// Stdout stays clean so `preview` output can be piped.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already
/// installed.
pub fn init_cli(settings: &LoggingConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(settings)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
