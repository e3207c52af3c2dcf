use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a reading was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    /// Protocol-relative path as returned by the provider, e.g. `//cdn.weatherapi.com/...`.
    pub icon: String,
}

/// Current conditions for a committed city, in the provider's own units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location: Location,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub pressure_mb: f64,
    pub wind_kph: f64,
    pub condition: Condition,
    pub observed_at: Option<DateTime<Utc>>,
}
