//! OpenWeatherMap client for the `/data/2.5/weather` and `/data/2.5/forecast` APIs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use super::{ForecastPoint, ForecastSet, WeatherError, WeatherProvider, WeatherSnapshot};

/// Default OpenWeatherMap API base URL.
pub const DEFAULT_OWM_URL: &str = "https://api.openweathermap.org";

/// Unit system requested from the provider; the report assumes °C and m/s.
const UNITS: &str = "metric";

const MAX_ERROR_BODY_CHARS: usize = 256;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `/weather` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    /// Temperature and humidity block.
    pub main: CurrentMain,
    /// Condition entries; the first one is used.
    pub weather: Vec<Condition>,
    /// Wind block.
    pub wind: CurrentWind,
    /// Sunrise/sunset block.
    pub sys: Sys,
}

/// `main` block of the `/weather` response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct CurrentMain {
    /// Temperature, °C.
    pub temp: f64,
    /// Feels-like temperature, °C.
    pub feels_like: f64,
    /// Humidity, percent.
    pub humidity: u8,
}

/// A condition entry.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct Condition {
    /// Localized description.
    pub description: String,
}

/// `wind` block of the `/weather` response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct CurrentWind {
    /// Speed, m/s.
    pub speed: f64,
    /// Direction, degrees.
    pub deg: Option<f64>,
    /// Gust, m/s.
    pub gust: Option<f64>,
}

/// `sys` block of the `/weather` response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct Sys {
    /// Sunrise, unix seconds.
    pub sunrise: i64,
    /// Sunset, unix seconds.
    pub sunset: i64,
}

/// `/forecast` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    /// 3-hour buckets.
    pub list: Vec<ForecastEntry>,
}

/// One `/forecast` list entry.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    /// Bucket start, unix seconds.
    pub dt: i64,
    /// Temperature block.
    pub main: ForecastMain,
    /// Condition entries.
    pub weather: Vec<Condition>,
    /// Wind block; gusts may be absent.
    #[serde(default)]
    pub wind: Option<ForecastWind>,
}

/// `main` block of a forecast entry.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ForecastMain {
    /// Temperature, °C.
    pub temp: f64,
    /// Bucket maximum, °C.
    pub temp_max: f64,
}

/// `wind` block of a forecast entry.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ForecastWind {
    /// Gust, m/s.
    pub gust: Option<f64>,
}

// ---------------------------------------------------------------------------
// Parsing (pub for integration testing)
// ---------------------------------------------------------------------------

fn local_datetime(unix: i64, tz: Tz) -> Result<NaiveDateTime, WeatherError> {
    DateTime::from_timestamp(unix, 0)
        .map(|utc| utc.with_timezone(&tz).naive_local())
        .ok_or_else(|| WeatherError::Incomplete(format!("timestamp out of range: {unix}")))
}

/// Parse a `/weather` body into a snapshot in timezone `tz`.
///
/// # Errors
///
/// Returns [`WeatherError::Parse`] for malformed JSON and
/// [`WeatherError::Incomplete`] when no condition entry is present.
#[doc(hidden)]
pub fn parse_current(body: &str, tz: Tz) -> Result<WeatherSnapshot, WeatherError> {
    let resp: CurrentResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let description = resp
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| WeatherError::Incomplete("no condition in current weather".to_owned()))?;

    Ok(WeatherSnapshot {
        temperature: resp.main.temp,
        feels_like: resp.main.feels_like,
        description,
        humidity: resp.main.humidity,
        wind_speed: resp.wind.speed,
        wind_deg: resp.wind.deg,
        wind_gust: resp.wind.gust,
        sunrise: local_datetime(resp.sys.sunrise, tz)?.time(),
        sunset: local_datetime(resp.sys.sunset, tz)?.time(),
    })
}

/// Parse a `/forecast` body into a time-ordered set in timezone `tz`.
///
/// # Errors
///
/// Returns [`WeatherError::Parse`] for malformed JSON and
/// [`WeatherError::Incomplete`] when an entry has no condition.
#[doc(hidden)]
pub fn parse_forecast(body: &str, tz: Tz) -> Result<ForecastSet, WeatherError> {
    let resp: ForecastResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let points = resp
        .list
        .into_iter()
        .map(|entry| {
            let description = entry
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .ok_or_else(|| {
                    WeatherError::Incomplete(format!("no condition in forecast at {}", entry.dt))
                })?;
            Ok(ForecastPoint {
                at: local_datetime(entry.dt, tz)?,
                temperature: entry.main.temp,
                temp_max: entry.main.temp_max,
                description,
                gust: entry.wind.and_then(|w| w.gust),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    Ok(ForecastSet::new(points))
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check the HTTP status and return the body, or a sanitized status error.
///
/// `secret` is scrubbed from any error body before it is kept.
///
/// # Errors
///
/// Returns [`WeatherError::Request`] on transport failure and
/// [`WeatherError::HttpStatus`] on non-2xx.
pub async fn check_http_response(
    response: reqwest::Response,
    secret: &str,
) -> Result<String, WeatherError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(WeatherError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_error_body(&body, secret),
        });
    }
    Ok(body)
}

fn sanitize_error_body(raw: &str, secret: &str) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !secret.is_empty() {
        sanitized = sanitized.replace(secret, "[REDACTED]");
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenWeatherMap provider.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    lang: String,
    tz: Tz,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"__REDACTED__")
            .field("lang", &self.lang)
            .field("tz", &self.tz)
            .finish()
    }
}

impl OpenWeatherClient {
    /// Create a client; every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Request`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, lang: &str, tz: Tz, timeout: Duration) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_OWM_URL.to_owned(),
            api_key: api_key.to_owned(),
            lang: lang.to_owned(),
            tz,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    async fn fetch(&self, endpoint: &str, city: &str) -> Result<String, WeatherError> {
        let url = format!("{}/data/2.5/{endpoint}", self.base_url);
        debug!(endpoint, city, "requesting weather data");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", UNITS),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        check_http_response(response, &self.api_key).await
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let body = self.fetch("weather", city).await?;
        parse_current(&body, self.tz)
    }

    async fn forecast(&self, city: &str) -> Result<ForecastSet, WeatherError> {
        let body = self.fetch("forecast", city).await?;
        parse_forecast(&body, self.tz)
    }
}
