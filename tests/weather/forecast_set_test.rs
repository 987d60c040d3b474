//! Tests for `ForecastSet` lookups.

use chrono::{NaiveDate, NaiveDateTime};

use meteobot::weather::{ForecastPoint, ForecastSet};

fn at(d: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("test datetime should be valid")
}

fn point(d: u32, hour: u32) -> ForecastPoint {
    ForecastPoint {
        at: at(d, hour),
        temperature: -5.0,
        temp_max: -4.0,
        description: "снег".to_owned(),
        gust: None,
    }
}

#[test]
fn points_are_sorted_by_time() {
    let set = ForecastSet::new(vec![point(2, 3), point(1, 21), point(2, 0)]);
    let times: Vec<_> = set.points().iter().map(|p| p.at).collect();
    assert_eq!(times, vec![at(1, 21), at(2, 0), at(2, 3)]);
}

#[test]
fn on_date_selects_local_calendar_day() {
    let set = ForecastSet::new(vec![point(1, 21), point(2, 0), point(2, 3), point(3, 0)]);
    let day = NaiveDate::from_ymd_opt(2024, 1, 2).expect("date should be valid");
    assert_eq!(set.on_date(day).count(), 2);
}

#[test]
fn at_requires_exact_bucket_start() {
    let set = ForecastSet::new(vec![point(2, 6)]);
    assert!(set.at(at(2, 6)).is_some());
    assert!(set.at(at(2, 7)).is_none());
}

#[test]
fn default_set_is_empty() {
    assert!(ForecastSet::default().is_empty());
}
