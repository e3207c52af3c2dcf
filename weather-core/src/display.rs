//! Values derived from a [`WeatherReading`] for presentation.
//!
//! Everything here is a pure function of the reading and is cheap enough to
//! recompute on every render.

use crate::model::WeatherReading;

pub const GLYPH_SUN: &str = "☀";
pub const GLYPH_CLOUD: &str = "☁";
pub const GLYPH_RAIN: &str = "🌧";
pub const GLYPH_LIGHT_RAIN: &str = "🌦";
pub const GLYPH_STORM: &str = "⛈";
pub const GLYPH_SNOW: &str = "❄";
pub const GLYPH_FOG: &str = "🌫";
pub const GLYPH_DEFAULT: &str = "🌤";

/// Nearest integer, halves rounded up (`-2.5` becomes `-2`).
pub fn round_whole(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn wind_mps(kph: f64) -> f64 {
    kph / 3.6
}

/// Millibars and hectopascals are the same unit.
pub fn pressure_hpa(mb: f64) -> i64 {
    round_whole(mb)
}

pub fn pressure_pa(mb: f64) -> i64 {
    round_whole(mb * 100.0)
}

/// The provider hands out protocol-relative icon paths.
pub fn icon_url(path: &str) -> String {
    if path.starts_with("//") {
        format!("https:{path}")
    } else if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("https://{}", path.trim_start_matches('/'))
    }
}

/// Glyph for a condition description. Case-insensitive substring match,
/// first rule wins.
pub fn condition_glyph(condition: Option<&str>) -> &'static str {
    let Some(condition) = condition else {
        return GLYPH_DEFAULT;
    };
    let m = condition.to_lowercase();

    if m.contains("sunny") || m.contains("clear") {
        GLYPH_SUN
    } else if m.contains("cloud") {
        GLYPH_CLOUD
    } else if m.contains("rain") {
        GLYPH_RAIN
    } else if m.contains("drizzle") {
        GLYPH_LIGHT_RAIN
    } else if m.contains("thunder") {
        GLYPH_STORM
    } else if m.contains("snow") {
        GLYPH_SNOW
    } else if ["mist", "fog", "haze", "smoke"].iter().any(|x| m.contains(x)) {
        GLYPH_FOG
    } else {
        GLYPH_DEFAULT
    }
}

/// `name, region, country`, skipping empty parts.
pub fn location_label(reading: &WeatherReading) -> String {
    let loc = &reading.location;
    [loc.name.as_str(), loc.region.as_str(), loc.country.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formatted strings for one reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingView {
    pub location: String,
    pub glyph: &'static str,
    pub description: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub pressure: String,
    pub wind: String,
    pub coordinates: String,
    pub icon_url: Option<String>,
}

impl From<&WeatherReading> for ReadingView {
    fn from(reading: &WeatherReading) -> Self {
        let icon = reading.condition.icon.trim();

        Self {
            location: location_label(reading),
            glyph: condition_glyph(Some(&reading.condition.text)),
            description: reading.condition.text.clone(),
            temperature: format!("{}°C", round_whole(reading.temperature_c)),
            feels_like: format!("Feels like {}°C", round_whole(reading.feels_like_c)),
            humidity: format!("{}%", reading.humidity_pct),
            pressure: format!(
                "{} hPa ({} Pa)",
                pressure_hpa(reading.pressure_mb),
                pressure_pa(reading.pressure_mb)
            ),
            wind: format!("{} m/s", round_whole(wind_mps(reading.wind_kph))),
            coordinates: format!("{:.2}, {:.2}", reading.location.lat, reading.location.lon),
            icon_url: (!icon.is_empty()).then(|| icon_url(icon)),
        }
    }
}
