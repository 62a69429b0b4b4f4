//! Builds [`WidgetPayload`]s from fetched data and publishes them.

use auroracast_store::{KeyValueStore, Namespace, StoreError};
use auroracast_weather::astronomy::resolve_moon_phase_name;
use auroracast_weather::theme::is_night;
use auroracast_weather::{
    parse_timestamp, AmbientTheme, AuroraForecast, ForecastBundle, Language,
};
use chrono::{Datelike, DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Weekday};
use thiserror::Error;

use crate::payload::{
    normalize_hex_color, round_kp, AstronomyBlock, AuroraBlock, Customization, DailyEntry,
    HourlyEntry, WidgetPayload, DEFAULT_GRADIENT, MAX_DAILY, MAX_FORECAST_KP, MAX_HOURLY,
};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Forecast has no current conditions")]
    MissingCurrent,
}

/// Build a complete payload.
///
/// `now` is the local wall-clock time of the device; it drives `updatedAt`,
/// `isNight` and which hourly slots are still upcoming.
pub fn encode(
    weather: &ForecastBundle,
    theme: &AmbientTheme,
    aurora: Option<&AuroraForecast>,
    customization: Option<&Customization>,
    language: Language,
    now: DateTime<FixedOffset>,
) -> Result<WidgetPayload, EncodeError> {
    let current = weather.current.as_ref().ok_or(EncodeError::MissingCurrent)?;
    let (gradient_start, gradient_end) = gradient_stops(theme);

    let payload = WidgetPayload {
        temperature: round_temp(current.temperature),
        weather_code: current.weather_code.unwrap_or(0),
        city: city_label(weather),
        description: current.localized_description(language),
        updated_at: now.timestamp_millis(),
        is_night: is_night(now.hour()),
        gradient_start,
        gradient_end,
        hourly: hourly_entries(weather, now),
        daily: daily_entries(weather, language),
        astronomy: astronomy_block(weather, language),
        aurora: aurora.map(aurora_block),
        customization: None,
    };

    Ok(payload.with_customization(customization.cloned()))
}

/// Replace the widget namespace with `payload`.
///
/// Publishing the same payload twice leaves the store in the same state.
pub fn publish(store: &dyn KeyValueStore, payload: &WidgetPayload) -> Result<(), StoreError> {
    let entries = payload.to_entries();
    let count = entries.len();
    store.replace_namespace(Namespace::Widget, entries)?;
    tracing::debug!(
        keys = count,
        aurora = payload.aurora.is_some(),
        "Published widget payload"
    );
    Ok(())
}

fn round_temp(value: f64) -> i32 {
    value.round() as i32
}

fn city_label(weather: &ForecastBundle) -> String {
    let name = weather.location.name.trim();
    if name.is_empty() {
        format!(
            "{:.2}, {:.2}",
            weather.location.latitude, weather.location.longitude
        )
    } else {
        name.to_string()
    }
}

fn gradient_stops(theme: &AmbientTheme) -> (String, String) {
    let first = theme.gradient.first().and_then(|c| normalize_hex_color(c));
    let last = theme.gradient.last().and_then(|c| normalize_hex_color(c));
    match (first, last) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            tracing::warn!(theme = %theme.theme, "Invalid theme gradient, using default");
            (DEFAULT_GRADIENT.0.to_string(), DEFAULT_GRADIENT.1.to_string())
        }
    }
}

/// `HH:MM` from a backend timestamp or clock time; anything else passes through.
fn clock_label(value: &str) -> String {
    if let Some(dt) = parse_timestamp(value) {
        return dt.format("%H:%M").to_string();
    }
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value.trim(), fmt).ok())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

fn weekday_label(day: Weekday, language: Language) -> &'static str {
    match language {
        Language::En => match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        },
        Language::Cs => match day {
            Weekday::Mon => "Po",
            Weekday::Tue => "Út",
            Weekday::Wed => "St",
            Weekday::Thu => "Čt",
            Weekday::Fri => "Pá",
            Weekday::Sat => "So",
            Weekday::Sun => "Ne",
        },
    }
}

fn date_label(value: &str, language: Language) -> String {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(value).map(|dt| dt.date()))
        .map(|date| weekday_label(date.weekday(), language).to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

/// Upcoming slots only, starting with the current hour.
fn hourly_entries(weather: &ForecastBundle, now: DateTime<FixedOffset>) -> Vec<HourlyEntry> {
    let local = now.naive_local();
    let hour_start = local
        .date()
        .and_hms_opt(local.hour(), 0, 0)
        .unwrap_or(local);

    weather
        .hourly_forecast
        .iter()
        .filter(|h| parse_timestamp(&h.time).map_or(true, |t| t >= hour_start))
        .take(MAX_HOURLY)
        .map(|h| HourlyEntry {
            time_label: clock_label(&h.time),
            temperature: round_temp(h.temperature),
            weather_code: h.weather_code.unwrap_or(0),
        })
        .collect()
}

fn daily_entries(weather: &ForecastBundle, language: Language) -> Vec<DailyEntry> {
    weather
        .daily_forecast
        .iter()
        .take(MAX_DAILY)
        .map(|d| DailyEntry {
            date_label: date_label(&d.date, language),
            max_temp: round_temp(d.temperature_max),
            min_temp: round_temp(d.temperature_min),
            weather_code: d.weather_code.unwrap_or(0),
        })
        .collect()
}

/// Bundle astronomy first, today's daily entry as fallback for sun times.
fn astronomy_block(weather: &ForecastBundle, language: Language) -> AstronomyBlock {
    let astro = weather.astronomy.as_ref();
    let today = weather.daily_forecast.first();

    let sunrise = astro
        .and_then(|a| a.sunrise.as_deref())
        .or_else(|| today.and_then(|d| d.sunrise.as_deref()));
    let sunset = astro
        .and_then(|a| a.sunset.as_deref())
        .or_else(|| today.and_then(|d| d.sunset.as_deref()));

    AstronomyBlock {
        sunrise: sunrise.map(clock_label).unwrap_or_default(),
        sunset: sunset.map(clock_label).unwrap_or_default(),
        moon_phase_name: resolve_moon_phase_name(astro, language),
    }
}

fn aurora_block(aurora: &AuroraForecast) -> AuroraBlock {
    AuroraBlock {
        kp: round_kp(aurora.current_kp),
        visibility_prob: i32::from(aurora.visibility_probability),
        max_kp: round_kp(aurora.max_forecast_kp),
        max_prob: i32::from(aurora.max_visibility_probability),
        best_time: aurora
            .best_viewing_time
            .as_deref()
            .map(clock_label)
            .unwrap_or_default(),
        best_kp: round_kp(aurora.best_viewing_kp),
        forecast_kp: aurora
            .forecast
            .iter()
            .take(MAX_FORECAST_KP)
            .map(|e| round_kp(e.kp))
            .collect(),
    }
}
