//! Weather data model and provider interface.
//!
//! The provider converts raw API responses into [`WeatherSnapshot`] and
//! [`ForecastSet`] values expressed in the display timezone, so the report
//! composer only ever deals with local wall-clock times.

pub mod openweather;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub use openweather::OpenWeatherClient;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Current conditions from a single provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Air temperature, °C.
    pub temperature: f64,
    /// Feels-like temperature, °C.
    pub feels_like: f64,
    /// Condition description in the provider's locale.
    pub description: String,
    /// Relative humidity, percent.
    pub humidity: u8,
    /// Wind speed, m/s.
    pub wind_speed: f64,
    /// Wind direction in degrees, if reported.
    pub wind_deg: Option<f64>,
    /// Wind gust speed, m/s, if reported.
    pub wind_gust: Option<f64>,
    /// Local sunrise time.
    pub sunrise: NaiveTime,
    /// Local sunset time.
    pub sunset: NaiveTime,
}

/// One 3-hour forecast bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    /// Local start of the bucket.
    pub at: NaiveDateTime,
    /// Point temperature, °C.
    pub temperature: f64,
    /// Maximum temperature within the bucket, °C.
    pub temp_max: f64,
    /// Condition description in the provider's locale.
    pub description: String,
    /// Gust speed, m/s, if reported.
    pub gust: Option<f64>,
}

/// Time-ordered forecast points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSet {
    points: Vec<ForecastPoint>,
}

impl ForecastSet {
    /// Build a set, sorting points by time.
    pub fn new(mut points: Vec<ForecastPoint>) -> Self {
        points.sort_by_key(|p| p.at);
        Self { points }
    }

    /// All points in time order.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// True when the provider returned no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points whose local date equals `date`.
    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.at.date() == date)
    }

    /// The point starting exactly at `at`, if any.
    pub fn at(&self, at: NaiveDateTime) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.at == at)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Weather data could not be obtained or is unusable.
///
/// Every variant means "data unavailable": callers substitute the fallback
/// report and never show these details to chat members.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// HTTP transport failure, including timeouts.
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("weather provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Body did not match the expected schema.
    #[error("weather response parse error: {0}")]
    Parse(String),
    /// Body parsed but required values are missing or not finite.
    #[error("weather data incomplete: {0}")]
    Incomplete(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of current conditions and forecasts for a named city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions for `city`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] when data is unavailable.
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Multi-day 3-hour forecast for `city`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] when data is unavailable.
    async fn forecast(&self, city: &str) -> Result<ForecastSet, WeatherError>;
}
