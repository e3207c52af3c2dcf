use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::DEFAULT_BASE_URL,
    model::{Condition, Location, WeatherReading},
};

use super::{FetchError, WeatherProvider};

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http: Client::new() }
    }

    pub fn current_url(&self) -> String {
        format!("{}/v1/current.json", self.base_url)
    }
}

impl Default for WeatherApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    pressure_mb: f64,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

impl From<WaResponse> for WeatherReading {
    fn from(parsed: WaResponse) -> Self {
        let observed_at = parsed.current.last_updated_epoch.and_then(unix_to_utc);

        WeatherReading {
            location: Location {
                name: parsed.location.name,
                region: parsed.location.region,
                country: parsed.location.country,
                lat: parsed.location.lat,
                lon: parsed.location.lon,
            },
            temperature_c: parsed.current.temp_c,
            feels_like_c: parsed.current.feelslike_c,
            humidity_pct: parsed.current.humidity,
            pressure_mb: parsed.current.pressure_mb,
            wind_kph: parsed.current.wind_kph,
            condition: Condition {
                text: parsed.current.condition.text,
                icon: parsed.current.condition.icon,
            },
            observed_at,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, api_key: &str, city: &str) -> Result<WeatherReading, FetchError> {
        let res = self
            .http
            .get(self.current_url())
            .query(&[("key", api_key), ("q", city), ("aqi", "no")])
            .send()
            .await
            // The URL carries the key; keep it out of user-facing messages.
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        let parsed: WaResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(parsed.into())
    }
}

/// `error.message`, then `message`, then a generic line with the status code.
/// Each candidate must be a non-blank string to count.
fn error_message(status: u16, body: &str) -> String {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let non_blank = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
    };

    non_blank(parsed.pointer("/error/message"))
        .or_else(|| non_blank(parsed.get("message")))
        .unwrap_or_else(|| format!("Request failed ({status})"))
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
