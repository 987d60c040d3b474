//! OpenWeatherMap response parsing and HTTP client tests.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use meteobot::weather::openweather::{parse_current, parse_forecast};
use meteobot::weather::{OpenWeatherClient, WeatherError, WeatherProvider};

const MOSCOW: Tz = chrono_tz::Europe::Moscow;

// 2024-06-10 00:55 UTC sunrise, 18:14 UTC sunset.
const CURRENT_BODY: &str = r#"{
    "weather": [{"id": 803, "main": "Clouds", "description": "облачно с прояснениями", "icon": "04d"}],
    "main": {"temp": 20.4, "feels_like": 19.6, "temp_min": 18.0, "temp_max": 22.0, "pressure": 1012, "humidity": 55},
    "wind": {"speed": 3.2, "deg": 90, "gust": 6.1},
    "sys": {"country": "RU", "sunrise": 1717980900, "sunset": 1718043240},
    "name": "Nizhny Novgorod"
}"#;

// 18:00 UTC, 21:00 UTC (local midnight) and 03:00 UTC next day.
const FORECAST_BODY: &str = r#"{
    "cod": "200",
    "list": [
        {"dt": 1718074800, "main": {"temp": 12.4, "temp_max": 12.9}, "weather": [{"description": "туман"}], "wind": {"speed": 1.0, "deg": 10}},
        {"dt": 1718042400, "main": {"temp": 17.0, "temp_max": 17.5}, "weather": [{"description": "ясно"}], "wind": {"speed": 2.0, "deg": 200, "gust": 4.4}},
        {"dt": 1718053200, "main": {"temp": 14.0, "temp_max": 14.2}, "weather": [{"description": "ясно"}]}
    ]
}"#;

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("time should be valid")
}

#[test]
fn parse_current_extracts_snapshot_in_local_time() {
    let snapshot = parse_current(CURRENT_BODY, MOSCOW).expect("current weather should parse");

    assert!((snapshot.temperature - 20.4).abs() < f64::EPSILON);
    assert!((snapshot.feels_like - 19.6).abs() < f64::EPSILON);
    assert_eq!(snapshot.description, "облачно с прояснениями");
    assert_eq!(snapshot.humidity, 55);
    assert_eq!(snapshot.wind_deg, Some(90.0));
    assert_eq!(snapshot.wind_gust, Some(6.1));
    assert_eq!(snapshot.sunrise, hm(3, 55));
    assert_eq!(snapshot.sunset, hm(21, 14));
}

#[test]
fn parse_current_tolerates_missing_wind_fields() {
    let body = CURRENT_BODY.replace(r#""deg": 90, "gust": 6.1"#, r#""deg": null"#);
    let snapshot = parse_current(&body, MOSCOW).expect("current weather should parse");
    assert_eq!(snapshot.wind_deg, None);
    assert_eq!(snapshot.wind_gust, None);
}

#[test]
fn parse_current_without_condition_is_incomplete() {
    let body = r#"{
        "weather": [],
        "main": {"temp": 1.0, "feels_like": 0.0, "humidity": 80},
        "wind": {"speed": 1.0},
        "sys": {"sunrise": 0, "sunset": 0}
    }"#;
    assert!(matches!(
        parse_current(body, MOSCOW),
        Err(WeatherError::Incomplete(_))
    ));
}

#[test]
fn parse_current_rejects_malformed_json() {
    assert!(matches!(
        parse_current("{not json", MOSCOW),
        Err(WeatherError::Parse(_))
    ));
    assert!(matches!(
        parse_current(r#"{"main": {}}"#, MOSCOW),
        Err(WeatherError::Parse(_))
    ));
}

#[test]
fn parse_forecast_sorts_and_converts_to_local_time() {
    let forecast = parse_forecast(FORECAST_BODY, MOSCOW).expect("forecast should parse");
    let points = forecast.points();
    assert_eq!(points.len(), 3);

    let june = |d: u32, h: u32| {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("datetime should be valid")
    };
    assert_eq!(points[0].at, june(10, 21));
    assert_eq!(points[1].at, june(11, 0));
    assert_eq!(points[2].at, june(11, 6));

    assert_eq!(points[0].gust, Some(4.4));
    assert_eq!(points[1].gust, None);
    assert_eq!(points[2].description, "туман");
}

#[test]
fn forecast_dates_follow_display_timezone() {
    let forecast = parse_forecast(FORECAST_BODY, MOSCOW).expect("forecast should parse");
    let june_10 = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date should be valid");
    // 21:00 UTC is already June 11 in Moscow.
    assert_eq!(forecast.on_date(june_10).count(), 1);

    let utc = parse_forecast(FORECAST_BODY, chrono_tz::UTC).expect("forecast should parse");
    assert_eq!(utc.on_date(june_10).count(), 2);
}

#[test]
fn parse_forecast_with_empty_list_is_empty_set() {
    let forecast = parse_forecast(r#"{"list": []}"#, MOSCOW).expect("forecast should parse");
    assert!(forecast.is_empty());
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

async fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
    let addr = listener.local_addr().expect("listener should expose local addr");

    let status_line_owned = status_line.to_owned();
    let body_owned = body.to_owned();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut read_buf = [0_u8; 2048];
            let _ = socket.read(&mut read_buf).await;

            let response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body_owned}",
                body_owned.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    format!("http://{addr}/")
}

fn client(base_url: &str, api_key: &str) -> OpenWeatherClient {
    OpenWeatherClient::new(api_key, "ru", MOSCOW, Duration::from_secs(5))
        .expect("client should build")
        .with_base_url(base_url)
}

#[tokio::test]
async fn client_fetches_and_parses_current_weather() {
    let url = serve_once("200 OK", CURRENT_BODY).await;
    let snapshot = client(&url, "key")
        .current("Nizhny Novgorod")
        .await
        .expect("current weather should load");
    assert_eq!(snapshot.humidity, 55);
}

#[tokio::test]
async fn client_error_status_redacts_api_key() {
    let api_key = "owm-secret-1234567890";
    let body = format!("{{\"cod\":401,\"message\":\"Invalid API key {api_key}\"}}");
    let url = serve_once("401 Unauthorized", &body).await;

    let err = client(&url, api_key)
        .forecast("Nizhny Novgorod")
        .await
        .expect_err("forecast should fail on 401");
    match err {
        WeatherError::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(!body.contains(api_key));
            assert!(body.contains("[REDACTED]"));
        }
        other => panic!("expected http status error, got: {other}"),
    }
}

#[tokio::test]
async fn client_truncates_long_error_body() {
    let body = "x".repeat(400);
    let url = serve_once("500 Internal Server Error", &body).await;

    let err = client(&url, "key")
        .current("Nizhny Novgorod")
        .await
        .expect_err("current weather should fail on 500");
    match err {
        WeatherError::HttpStatus { body, .. } => {
            assert!(body.ends_with("...[truncated]"));
            assert!(body.len() < 400);
        }
        other => panic!("expected http status error, got: {other}"),
    }
}

#[tokio::test]
async fn unreachable_provider_is_request_error() {
    // Bind then drop so the port is closed.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind")
        .local_addr()
        .expect("listener should expose local addr");

    let result = client(&format!("http://{addr}"), "key")
        .current("Nizhny Novgorod")
        .await;
    assert!(matches!(result, Err(WeatherError::Request(_))));
}
