//! Report job: fetch, compose, fall back, fan out.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::report::{self, ReportSettings, FALLBACK_REPORT};
use crate::transport::ChatTransport;
use crate::weather::{WeatherError, WeatherProvider};

/// Result of sending one text to every destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Destinations that accepted the message.
    pub delivered: usize,
    /// Destinations that failed.
    pub failed: usize,
}

/// Send `text` to each destination in order.
///
/// A failing destination is logged and skipped; the rest still receive
/// the message.
pub async fn broadcast(
    transport: &dyn ChatTransport,
    destinations: &[i64],
    text: &str,
) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome::default();
    for &chat_id in destinations {
        match transport.send_text(chat_id, text).await {
            Ok(()) => outcome.delivered = outcome.delivered.saturating_add(1),
            Err(e) => {
                warn!(chat_id, error = %e, "report delivery failed");
                outcome.failed = outcome.failed.saturating_add(1);
            }
        }
    }
    outcome
}

/// Everything needed to produce one report.
pub struct ReportJob {
    provider: Arc<dyn WeatherProvider>,
    city: String,
    settings: ReportSettings,
    tz: Tz,
}

impl ReportJob {
    /// Create a job for `city`, reporting in timezone `tz`.
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        city: &str,
        settings: ReportSettings,
        tz: Tz,
    ) -> Self {
        Self {
            provider,
            city: city.to_owned(),
            settings,
            tz,
        }
    }

    /// Create a job from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimezone`] for an unknown timezone.
    pub fn from_config(config: &Config, provider: Arc<dyn WeatherProvider>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            provider,
            &config.weather.city,
            ReportSettings::from(&config.report),
            config.timezone()?,
        ))
    }

    /// Current wall-clock time in the display timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }

    /// Fetch data and compose the report as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] when data is unavailable or unusable.
    pub async fn try_build(&self, now: NaiveDateTime) -> Result<String, WeatherError> {
        let (snapshot, forecast) = tokio::try_join!(
            self.provider.current(&self.city),
            self.provider.forecast(&self.city)
        )?;
        report::compose(&snapshot, &forecast, now, &self.city, &self.settings)
    }

    /// Compose the report as of `now`, substituting the fallback text when
    /// weather data is unavailable.
    pub async fn build(&self, now: NaiveDateTime) -> String {
        match self.try_build(now).await {
            Ok(text) => text,
            Err(e) => {
                warn!(city = %self.city, error = %e, "weather data unavailable, sending fallback");
                FALLBACK_REPORT.to_owned()
            }
        }
    }

    /// Build the report for the current time and send it to every destination.
    pub async fn run(&self, transport: &dyn ChatTransport, destinations: &[i64]) -> DeliveryOutcome {
        let text = self.build(self.local_now()).await;
        let outcome = broadcast(transport, destinations, &text).await;
        info!(
            delivered = outcome.delivered,
            failed = outcome.failed,
            "weather report dispatched"
        );
        outcome
    }
}
