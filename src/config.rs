//! Configuration loading and validation.
//!
//! Loads `./config.toml` (or `$METEOBOT_CONFIG_PATH`, or an explicit path
//! from the CLI). Environment variables override file values; file values
//! override defaults. Credentials are read from the environment only,
//! after an optional `.env` file has been merged into it.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;

/// Env var holding the OpenWeatherMap API key.
pub const OWM_API_KEY_ENV: &str = "OWM_API_KEY";
/// Env var holding the Telegram bot token.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Longest mute accepted by validation: 366 days.
pub const MAX_MUTE_MINUTES: u64 = 527_040;

/// Fatal configuration problems detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is absent or empty.
    #[error("missing required credential: set {0} in the environment or .env")]
    MissingCredential(&'static str),

    /// No chat is configured to receive reports.
    #[error("no destination chats configured: set TELEGRAM_CHAT_IDS or [telegram].chat_ids")]
    NoDestinations,

    /// The display timezone is not a known IANA name.
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    /// A send time is not in `HH:MM` form.
    #[error("invalid send time '{0}', expected HH:MM")]
    InvalidSendTime(String),

    /// No send times are configured.
    #[error("no send times configured")]
    NoSendTimes,

    /// An hour setting is outside 0..=23.
    #[error("invalid hour {value} for {field}, expected 0-23")]
    InvalidHour {
        /// Name of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: u32,
    },

    /// The next-day trigger window ends before it starts.
    #[error("next-day window is inverted: {from}..={to}")]
    InvertedWindow {
        /// Window start hour.
        from: u32,
        /// Window end hour.
        to: u32,
    },

    /// The moderation warning threshold is zero.
    #[error("moderation warn_threshold must be at least 1")]
    ZeroThreshold,

    /// The mute length is outside what the Bot API keeps temporary.
    #[error("moderation mute_minutes must be 1-{MAX_MUTE_MINUTES}, got {0}")]
    InvalidMuteMinutes(u64),
}

// ── Top-level config ────────────────────────────────────────────

/// Complete runtime configuration, built once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weather provider settings.
    pub weather: WeatherConfig,
    /// Telegram destinations.
    pub telegram: TelegramConfig,
    /// Send times and display timezone.
    pub schedule: ScheduleConfig,
    /// Report composition cutoffs.
    pub report: ReportConfig,
    /// Inbound message moderation.
    pub moderation: ModerationConfig,
    /// Log output location.
    pub logging: LoggingConfig,
    /// Secrets, never read from the TOML file.
    #[serde(skip)]
    pub credentials: Credentials,
    /// Files the configuration was read from.
    #[serde(skip)]
    pub origin: ConfigOrigin,
}

/// Files that contributed to a loaded [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOrigin {
    /// The TOML file, if one was read.
    pub file: Option<PathBuf>,
    /// The `.env` file, if one was read, or why reading it failed.
    pub dotenv: Result<Option<PathBuf>, String>,
}

impl Default for ConfigOrigin {
    fn default() -> Self {
        Self {
            file: None,
            dotenv: Ok(None),
        }
    }
}

impl Config {
    /// Load configuration: `.env`, then the TOML file, then env overrides.
    ///
    /// `explicit_path` wins over `$METEOBOT_CONFIG_PATH` and `./config.toml`.
    /// A missing implicit config file yields defaults; a missing explicit
    /// one is an error. Loading runs before logging is installed, so the
    /// sources are kept in [`Config::origin`] for [`Config::log_origin`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// `explicit_path` does not exist.
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let dotenv = match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e.to_string()),
        };

        let (path, required) = match explicit_path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path_with(|key| std::env::var(key).ok()), false),
        };
        let mut config = Self::load_from_file(&path, required)?;
        config.origin.dotenv = dotenv;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file(path: &Path, required: bool) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let mut config = Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))?;
                config.origin.file = Some(path.to_path_buf());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Log where the configuration came from. Call once logging is up.
    pub fn log_origin(&self) {
        match &self.origin.file {
            Some(path) => tracing::info!(path = %path.display(), "config loaded from file"),
            None => tracing::info!("no config file found, using defaults"),
        }
        match &self.origin.dotenv {
            Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded .env"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env, continuing"),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("METEOBOT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = non_empty(env(OWM_API_KEY_ENV)) {
            self.credentials.owm_api_key = Some(v);
        }
        if let Some(v) = non_empty(env(TELEGRAM_TOKEN_ENV)) {
            self.credentials.telegram_bot_token = Some(v);
        }

        if let Some(v) = non_empty(env("CITY_NAME")) {
            self.weather.city = v;
        }
        if let Some(v) = non_empty(env("TZ")) {
            self.schedule.timezone = v;
        }

        let chat_ids =
            non_empty(env("TELEGRAM_CHAT_IDS")).or_else(|| non_empty(env("TELEGRAM_CHAT_ID")));
        if let Some(v) = chat_ids {
            let mut ids = Vec::new();
            for part in v.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match part.parse::<i64>() {
                    Ok(id) => ids.push(id),
                    Err(_) => tracing::warn!(
                        var = "TELEGRAM_CHAT_IDS",
                        value = %part,
                        "ignoring invalid chat id"
                    ),
                }
            }
            self.telegram.chat_ids = ids;
        }

        if let Some(v) = non_empty(env("SEND_TIMES")) {
            self.schedule.send_times = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect();
        }

        if let Some(v) = non_empty(env("ENABLE_PROFANITY_FILTER")) {
            match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => self.moderation.enabled = true,
                "false" | "0" | "no" => self.moderation.enabled = false,
                _ => tracing::warn!(
                    var = "ENABLE_PROFANITY_FILTER",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = non_empty(env("BAD_WORDS_FILE")) {
            self.moderation.word_list = PathBuf::from(v);
        }
    }

    /// Validate everything a delivering process needs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weather_api_key()?;
        self.telegram_bot_token()?;
        if self.telegram.chat_ids.is_empty() {
            return Err(ConfigError::NoDestinations);
        }
        self.timezone()?;
        if self.schedule.send_times.is_empty() {
            return Err(ConfigError::NoSendTimes);
        }
        for time in &self.schedule.send_times {
            parse_send_time(time)?;
        }
        self.report.validate()?;
        if self.moderation.warn_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.moderation.escalation == EscalationMode::Mute
            && !(1..=MAX_MUTE_MINUTES).contains(&self.moderation.mute_minutes)
        {
            return Err(ConfigError::InvalidMuteMinutes(self.moderation.mute_minutes));
        }
        Ok(())
    }

    /// The weather provider credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when unset.
    pub fn weather_api_key(&self) -> Result<&str, ConfigError> {
        self.credentials
            .owm_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(OWM_API_KEY_ENV))
    }

    /// The Telegram bot token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when unset.
    pub fn telegram_bot_token(&self) -> Result<&str, ConfigError> {
        self.credentials
            .telegram_bot_token
            .as_deref()
            .ok_or(ConfigError::MissingCredential(TELEGRAM_TOKEN_ENV))
    }

    /// Parse the display timezone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimezone`] for unknown names.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.schedule
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.schedule.timezone.clone()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Parse an `HH:MM` send time into `(hour, minute)`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSendTime`] for anything else.
pub fn parse_send_time(raw: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidSendTime(raw.to_owned());
    let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

// ── Credentials ─────────────────────────────────────────────────

/// Secrets taken from the environment.
#[derive(Clone, Default)]
pub struct Credentials {
    /// OpenWeatherMap API key.
    pub owm_api_key: Option<String>,
    /// Telegram bot token.
    pub telegram_bot_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("owm_api_key", &self.owm_api_key.as_ref().map(|_| "__REDACTED__"))
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "__REDACTED__"),
            )
            .finish()
    }
}

// ── Weather ─────────────────────────────────────────────────────

/// Weather provider settings (`[weather]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// City name passed to the provider.
    pub city: String,
    /// Response language for condition descriptions.
    pub lang: String,
    /// Provider base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl WeatherConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: "Nizhny Novgorod".to_owned(),
            lang: "ru".to_owned(),
            base_url: crate::weather::openweather::DEFAULT_OWM_URL.to_owned(),
            timeout_secs: 10,
        }
    }
}

// ── Telegram ────────────────────────────────────────────────────

/// Telegram delivery settings (`[telegram]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Chats that receive every scheduled report.
    pub chat_ids: Vec<i64>,
    /// Timeout for outbound Bot API calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            chat_ids: Vec::new(),
            timeout_secs: 10,
        }
    }
}

// ── Schedule ────────────────────────────────────────────────────

/// Send times and display timezone (`[schedule]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone name used for scheduling and display.
    pub timezone: String,
    /// Daily local send times, `HH:MM`.
    pub send_times: Vec<String>,
    /// Scheduler tick interval in seconds.
    pub tick_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Moscow".to_owned(),
            send_times: vec!["07:00".to_owned(), "17:00".to_owned(), "21:00".to_owned()],
            tick_secs: 30,
        }
    }
}

// ── Report ──────────────────────────────────────────────────────

/// Report composition cutoffs (`[report]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// The daytime maximum line is shown only before this hour.
    pub max_temp_cutoff_hour: u32,
    /// First hour (inclusive) that carries the next-day block.
    pub next_day_from_hour: u32,
    /// Last hour (inclusive) that carries the next-day block.
    pub next_day_to_hour: u32,
}

impl ReportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_temp_cutoff_hour", self.max_temp_cutoff_hour),
            ("next_day_from_hour", self.next_day_from_hour),
            ("next_day_to_hour", self.next_day_to_hour),
        ] {
            if value > 23 {
                return Err(ConfigError::InvalidHour { field, value });
            }
        }
        if self.next_day_from_hour > self.next_day_to_hour {
            return Err(ConfigError::InvertedWindow {
                from: self.next_day_from_hour,
                to: self.next_day_to_hour,
            });
        }
        Ok(())
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_temp_cutoff_hour: 14,
            next_day_from_hour: 20,
            next_day_to_hour: 22,
        }
    }
}

// ── Moderation ──────────────────────────────────────────────────

/// What happens when a sender reaches the warning threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationMode {
    /// Post an escalation notice and reset the sender's counter.
    Reset,
    /// Restrict the sender temporarily; the counter is kept.
    Mute,
}

/// Inbound moderation settings (`[moderation]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Whether inbound messages are scanned at all.
    pub enabled: bool,
    /// Path to the word list, one pattern per line.
    pub word_list: PathBuf,
    /// Offense count that triggers escalation.
    pub warn_threshold: u32,
    /// Escalation policy.
    pub escalation: EscalationMode,
    /// Restriction length for [`EscalationMode::Mute`], in minutes.
    pub mute_minutes: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            word_list: PathBuf::from("bad_words.txt"),
            warn_threshold: 3,
            escalation: EscalationMode::Reset,
            mute_minutes: 60,
        }
    }
}

// ── Logging ─────────────────────────────────────────────────────

/// Log output settings (`[logging]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated JSON logs; defaults to `~/.meteobot/logs`.
    pub dir: Option<PathBuf>,
    /// `tracing` filter directives, e.g. `"debug,teloxide=info"`.
    /// `RUST_LOG` wins when set.
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Resolve the logs directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the home
    /// directory cannot be determined.
    pub fn resolve_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        let home = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.home_dir().join(".meteobot").join("logs"))
    }
}

// ── Tests ───────────────────────────────────────────────────────
