//! Text helpers shared by the report: rounding, icons, compass points.

/// Compass abbreviations, clockwise from north in 45° steps.
const COMPASS: [&str; 8] = ["С", "СВ", "В", "ЮВ", "Ю", "ЮЗ", "З", "СЗ"];

/// Condition keywords in match priority order; first hit wins.
const CONDITION_ICONS: [(&str, &str); 8] = [
    ("ясно", "☀️"),
    ("облачно", "⛅"),
    ("пасмурно", "☁️"),
    ("дожд", "🌧️"),
    ("гроза", "⛈️"),
    ("снег", "❄️"),
    ("туман", "🌫️"),
    ("дымка", "🌫️"),
];

/// Icon used when no keyword matches.
pub const DEFAULT_ICON: &str = "🌡️";

/// Round to the nearest whole number, halves towards positive infinity.
///
/// `20.5 → 21`, `-0.5 → 0`, `-2.6 → -3`.
#[allow(clippy::cast_possible_truncation)] // weather magnitudes are far inside i64
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    // `value - floor` is exact; `value + 0.5` is not just below a half.
    let rounded = if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    rounded as i64
}

/// Eight-point compass abbreviation for a wind direction in degrees.
///
/// Each point covers ±22.5°; exact half-way angles round clockwise.
/// Values outside 0..360 wrap.
pub fn compass_direction(degrees: f64) -> &'static str {
    let octant = round_half_up(degrees / 45.0).rem_euclid(8);
    usize::try_from(octant)
        .ok()
        .and_then(|i| COMPASS.get(i))
        .copied()
        .unwrap_or(COMPASS[0])
}

/// Icon for a condition description, by case-insensitive keyword match.
pub fn condition_icon(description: &str) -> &'static str {
    let lowered = description.to_lowercase();
    CONDITION_ICONS
        .iter()
        .find(|(keyword, _)| lowered.contains(*keyword))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
