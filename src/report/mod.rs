//! Weather report composition.
//!
//! [`compose`] is a pure function of its inputs: the same snapshot,
//! forecast, reference time and city always give the same text. The output
//! is Telegram HTML.

pub mod format;

use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::ReportConfig;
use crate::telegram::ui::escape_html;
use crate::weather::{ForecastSet, WeatherError, WeatherSnapshot};

use format::{capitalize, compass_direction, condition_icon, round_half_up};

/// Sent instead of a report when weather data is unavailable.
pub const FALLBACK_REPORT: &str =
    "⚠️ Данные о погоде временно недоступны. Попробуем прислать прогноз позже.";

/// Next-day slots: label and local hour of the forecast bucket.
const NEXT_DAY_SLOTS: [(&str, u32); 4] = [
    ("🌅 Утро", 6),
    ("🌞 День", 12),
    ("🌆 Вечер", 18),
    ("🌙 Ночь", 21),
];

/// Time-of-day rules for the optional report sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    /// The daytime maximum line appears only while the hour is below this.
    pub max_temp_cutoff_hour: u32,
    /// Hours (inclusive) during which the next-day block is appended.
    pub next_day_window: RangeInclusive<u32>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ReportSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            max_temp_cutoff_hour: config.max_temp_cutoff_hour,
            next_day_window: config.next_day_from_hour..=config.next_day_to_hour,
        }
    }
}

/// Compose the report for `city` as of local time `now`.
///
/// # Errors
///
/// Returns [`WeatherError::Incomplete`] when the forecast is empty or a
/// required numeric field is not finite.
pub fn compose(
    snapshot: &WeatherSnapshot,
    forecast: &ForecastSet,
    now: NaiveDateTime,
    city: &str,
    settings: &ReportSettings,
) -> Result<String, WeatherError> {
    check_inputs(snapshot, forecast)?;

    let today = now.date();
    let mut lines = Vec::with_capacity(9);

    lines.push(format!(
        "🌤 <b>Погода в {} на {}:</b>",
        escape_html(city),
        now.format("%d.%m.%Y")
    ));
    lines.push(format!(
        "🌡 Температура: {}°C <i>(ощущается {}°C)</i>",
        round_half_up(snapshot.temperature),
        round_half_up(snapshot.feels_like)
    ));

    if now.hour() < settings.max_temp_cutoff_hour {
        if let Some(max) = max_of(forecast.on_date(today).map(|p| p.temp_max)) {
            lines.push(format!("🌡 Максимум днём: {}°C", round_half_up(max)));
        }
    }

    lines.push(condition_text(&snapshot.description));
    lines.push(format!("💧 Влажность: {}%", snapshot.humidity));
    lines.push(wind_line(snapshot));

    let gusts = forecast
        .on_date(today)
        .filter_map(|p| p.gust)
        .filter(|g| *g > 0.0);
    if let Some(max_gust) = max_of(gusts) {
        lines.push(format!(
            "💨 Максимальные порывы сегодня: до {} м/с",
            round_half_up(max_gust)
        ));
    }

    lines.push(format!(
        "🌅 Рассвет: {} | 🌇 Закат: {}",
        snapshot.sunrise.format("%H:%M"),
        snapshot.sunset.format("%H:%M")
    ));

    let mut report = lines.join("\n");

    if settings.next_day_window.contains(&now.hour()) {
        if let Some(block) = next_day_block(forecast, today) {
            report.push_str("\n\n");
            report.push_str(&block);
        }
    }

    Ok(report)
}

fn check_inputs(snapshot: &WeatherSnapshot, forecast: &ForecastSet) -> Result<(), WeatherError> {
    for (field, value) in [
        ("temperature", snapshot.temperature),
        ("feels_like", snapshot.feels_like),
        ("wind_speed", snapshot.wind_speed),
    ] {
        if !value.is_finite() {
            return Err(WeatherError::Incomplete(format!("{field} is not finite")));
        }
    }
    if forecast.is_empty() {
        return Err(WeatherError::Incomplete("forecast is empty".to_owned()));
    }
    if forecast
        .points()
        .iter()
        .any(|p| !p.temperature.is_finite() || !p.temp_max.is_finite())
    {
        return Err(WeatherError::Incomplete(
            "forecast temperature is not finite".to_owned(),
        ));
    }
    Ok(())
}

/// Maximum of a float sequence; `None` when it is empty.
fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

fn condition_text(description: &str) -> String {
    format!(
        "{} {}",
        condition_icon(description),
        escape_html(&capitalize(description))
    )
}

fn wind_line(snapshot: &WeatherSnapshot) -> String {
    let mut line = format!("🌬️ Ветер: {} м/с", round_half_up(snapshot.wind_speed));
    if let Some(deg) = snapshot.wind_deg {
        line.push(' ');
        line.push_str(compass_direction(deg));
    }
    if let Some(gust) = snapshot.wind_gust.filter(|g| *g > 0.0) {
        line.push_str(&format!(", порывы до {} м/с", round_half_up(gust)));
    }
    line
}

fn next_day_block(forecast: &ForecastSet, today: NaiveDate) -> Option<String> {
    let tomorrow = today.succ_opt()?;
    let lines: Vec<String> = NEXT_DAY_SLOTS
        .iter()
        .filter_map(|(label, hour)| {
            let at = tomorrow.and_hms_opt(*hour, 0, 0)?;
            let point = forecast.at(at)?;
            Some(format!(
                "{label}: {}°C, {}",
                round_half_up(point.temperature),
                condition_text(&point.description)
            ))
        })
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!("📅 <b>Прогноз на завтра:</b>\n{}", lines.join("\n")))
}
