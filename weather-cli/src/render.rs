use std::fmt::Write;

use weather_core::{Phase, ReadingView, SearchState, WeatherReading};

pub const HINT: &str = "Try searching a city to see live weather data.";

pub fn render_reading(reading: &WeatherReading) -> String {
    let view = ReadingView::from(reading);
    let mut out = String::new();

    let _ = writeln!(out, "{}  ({})", view.location, view.coordinates);
    let _ = writeln!(out, "{} {}", view.glyph, view.description);
    let _ = writeln!(out, "{}  {}", view.temperature, view.feels_like);
    let _ = writeln!(out, "Humidity   {}", view.humidity);
    let _ = writeln!(out, "Pressure   {}", view.pressure);
    let _ = write!(out, "Wind       {}", view.wind);

    if let Some(at) = reading.observed_at {
        let _ = write!(out, "\nUpdated    {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(icon) = view.icon_url {
        let _ = write!(out, "\nIcon       {icon}");
    }

    out
}

/// Text for the status area, mirroring what a screen reader would announce.
pub fn render_state(state: &SearchState) -> String {
    match (state.phase(), &state.result) {
        (Phase::Loading, _) => "Loading…".to_string(),
        (Phase::Success, Some(reading)) => render_reading(reading),
        (Phase::Idle, _) => HINT.to_string(),
        _ => state.status_announcement(),
    }
}
