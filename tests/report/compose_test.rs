//! Tests for `report::compose`: section presence, rounding and the
//! time-of-day rules.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use meteobot::report::{compose, ReportSettings, FALLBACK_REPORT};
use meteobot::weather::{ForecastPoint, ForecastSet, WeatherError, WeatherSnapshot};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).expect("test date should be valid")
}

fn at(d: u32, hour: u32) -> NaiveDateTime {
    day(d).and_hms_opt(hour, 0, 0).expect("test time should be valid")
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("test time should be valid")
}

fn snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: 20.4,
        feels_like: 19.6,
        description: "облачно".to_owned(),
        humidity: 55,
        wind_speed: 3.2,
        wind_deg: Some(90.0),
        wind_gust: Some(0.0),
        sunrise: hm(3, 55),
        sunset: hm(21, 14),
    }
}

fn point(d: u32, hour: u32, temp: f64, temp_max: f64, desc: &str, gust: Option<f64>) -> ForecastPoint {
    ForecastPoint {
        at: at(d, hour),
        temperature: temp,
        temp_max,
        description: desc.to_owned(),
        gust,
    }
}

/// Same-day points for June 10 plus the four next-day slots.
fn forecast() -> ForecastSet {
    ForecastSet::new(vec![
        point(10, 12, 21.0, 22.1, "облачно", None),
        point(10, 15, 20.0, 21.3, "небольшой дождь", None),
        point(10, 21, 16.0, 16.2, "ясно", None),
        point(11, 6, 12.4, 12.9, "туман", None),
        point(11, 12, 23.5, 24.0, "ясно", None),
        point(11, 18, 19.2, 19.8, "пасмурно", None),
        point(11, 21, 15.6, 15.9, "ясно", None),
    ])
}

fn render(snapshot: &WeatherSnapshot, forecast: &ForecastSet, now: NaiveDateTime) -> String {
    compose(snapshot, forecast, now, "Nizhny Novgorod", &ReportSettings::default())
        .expect("report should compose")
}

#[test]
fn morning_report_matches_reference_example() {
    let text = render(&snapshot(), &forecast(), at(10, 10));

    assert!(text.starts_with("🌤 <b>Погода в Nizhny Novgorod на 10.06.2024:</b>"));
    assert!(text.contains("🌡 Температура: 20°C <i>(ощущается 20°C)</i>"));
    assert!(text.contains("🌡 Максимум днём: 22°C"));
    assert!(text.contains("⛅ Облачно"));
    assert!(text.contains("💧 Влажность: 55%"));
    assert!(text.contains("🌬️ Ветер: 3 м/с В"));
    assert!(!text.contains("порывы"));
    assert!(text.contains("🌅 Рассвет: 03:55 | 🌇 Закат: 21:14"));
    assert!(!text.contains("Прогноз на завтра"));
}

#[test]
fn max_temperature_line_disappears_at_cutoff() {
    let before = render(&snapshot(), &forecast(), at(10, 13));
    assert!(before.contains("Максимум днём"));

    let at_cutoff = render(&snapshot(), &forecast(), at(10, 14));
    assert!(!at_cutoff.contains("Максимум днём"));
}

#[test]
fn max_temperature_line_needs_same_day_points() {
    // Only next-day points: the subset for "today" is empty.
    let forecast = ForecastSet::new(vec![point(11, 12, 23.5, 24.0, "ясно", None)]);
    let text = render(&snapshot(), &forecast, at(10, 9));
    assert!(!text.contains("Максимум днём"));
}

#[test]
fn custom_cutoff_is_honoured() {
    let settings = ReportSettings {
        max_temp_cutoff_hour: 9,
        ..ReportSettings::default()
    };
    let text = compose(&snapshot(), &forecast(), at(10, 10), "Город", &settings)
        .expect("report should compose");
    assert!(!text.contains("Максимум днём"));
}

#[test]
fn evening_report_appends_next_day_block() {
    let text = render(&snapshot(), &forecast(), at(10, 21));

    let block_start = text
        .find("\n\n📅 <b>Прогноз на завтра:</b>")
        .expect("next-day block should be present");
    let block = &text[block_start..];
    assert!(block.contains("🌅 Утро: 12°C, 🌫️ Туман"));
    assert!(block.contains("🌞 День: 24°C, ☀️ Ясно"));
    assert!(block.contains("🌆 Вечер: 19°C, ☁️ Пасмурно"));
    assert!(block.contains("🌙 Ночь: 16°C, ☀️ Ясно"));

    let morning = block.find("Утро").unwrap_or(usize::MAX);
    let night = block.find("Ночь").unwrap_or(0);
    assert!(morning < night, "slots should keep morning..night order");
}

#[test]
fn next_day_block_respects_window_bounds() {
    assert!(!render(&snapshot(), &forecast(), at(10, 19)).contains("Прогноз на завтра"));
    assert!(render(&snapshot(), &forecast(), at(10, 20)).contains("Прогноз на завтра"));
    assert!(render(&snapshot(), &forecast(), at(10, 22)).contains("Прогноз на завтра"));
    assert!(!render(&snapshot(), &forecast(), at(10, 23)).contains("Прогноз на завтра"));
}

#[test]
fn next_day_block_lists_only_available_slots() {
    let forecast = ForecastSet::new(vec![
        point(10, 18, 18.0, 18.0, "ясно", None),
        point(11, 12, 23.5, 24.0, "ясно", None),
    ]);
    let text = render(&snapshot(), &forecast, at(10, 21));
    assert!(text.contains("🌞 День: 24°C"));
    assert!(!text.contains("Утро"));
    assert!(!text.contains("Вечер"));
}

#[test]
fn next_day_block_omitted_without_matching_points() {
    let forecast = ForecastSet::new(vec![
        point(10, 18, 18.0, 18.0, "ясно", None),
        // Not one of the fixed slots.
        point(11, 9, 14.0, 14.0, "ясно", None),
    ]);
    let text = render(&snapshot(), &forecast, at(10, 21));
    assert!(!text.contains("Прогноз на завтра"));
}

#[test]
fn gusts_are_reported_when_present() {
    let mut snap = snapshot();
    snap.wind_gust = Some(7.6);
    let forecast = ForecastSet::new(vec![
        point(10, 12, 21.0, 22.1, "облачно", Some(9.4)),
        point(10, 15, 20.0, 21.3, "облачно", Some(12.5)),
        point(11, 12, 23.5, 24.0, "ясно", Some(20.0)),
    ]);

    let text = render(&snap, &forecast, at(10, 10));
    assert!(text.contains("🌬️ Ветер: 3 м/с В, порывы до 8 м/с"));
    // Next-day gusts do not count towards today's maximum.
    assert!(text.contains("💨 Максимальные порывы сегодня: до 13 м/с"));
}

#[test]
fn missing_wind_direction_is_omitted() {
    let mut snap = snapshot();
    snap.wind_deg = None;
    let text = render(&snap, &forecast(), at(10, 10));
    assert!(text.contains("🌬️ Ветер: 3 м/с\n"));
}

#[test]
fn city_name_is_html_escaped() {
    let text = compose(
        &snapshot(),
        &forecast(),
        at(10, 10),
        "<Town & Co>",
        &ReportSettings::default(),
    )
    .expect("report should compose");
    assert!(text.contains("&lt;Town &amp; Co&gt;"));
}

#[test]
fn compose_is_deterministic() {
    let first = render(&snapshot(), &forecast(), at(10, 21));
    let second = render(&snapshot(), &forecast(), at(10, 21));
    assert_eq!(first, second);
}

#[test]
fn empty_forecast_is_incomplete() {
    let result = compose(
        &snapshot(),
        &ForecastSet::default(),
        at(10, 10),
        "Город",
        &ReportSettings::default(),
    );
    assert!(matches!(result, Err(WeatherError::Incomplete(_))));
}

#[test]
fn non_finite_temperature_is_incomplete() {
    let mut snap = snapshot();
    snap.temperature = f64::NAN;
    let result = compose(&snap, &forecast(), at(10, 10), "Город", &ReportSettings::default());
    assert!(matches!(result, Err(WeatherError::Incomplete(_))));
}

#[test]
fn fallback_text_is_fixed() {
    assert!(FALLBACK_REPORT.starts_with("⚠️"));
    assert!(!FALLBACK_REPORT.contains('<'));
}
