//! The flat record shared with the widget renderer.
//!
//! Arrays of records are flattened into indexed keys (`hourly.0.timeLabel`)
//! next to an explicit count key, so every stored value is a primitive.

use auroracast_store::{Entries, StoreValue};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: i64 = 1;

pub const MAX_HOURLY: usize = 4;
pub const MAX_DAILY: usize = 3;
pub const MAX_FORECAST_KP: usize = 12;

/// Renderer fallback when no customization is published or colors are invalid.
pub const DEFAULT_GRADIENT: (&str, &str) = ("#4A90E2", "#1C3F6E");
pub const LIGHT_GRADIENT: (&str, &str) = ("#F5F7FA", "#C3CFE2");
pub const DARK_GRADIENT: (&str, &str) = ("#232526", "#414345");

/// Store keys of the widget namespace.
pub mod keys {
    pub const SCHEMA_VERSION: &str = "schemaVersion";
    pub const TEMPERATURE: &str = "temperature";
    pub const WEATHER_CODE: &str = "weatherCode";
    pub const CITY: &str = "city";
    pub const DESCRIPTION: &str = "description";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const IS_NIGHT: &str = "isNight";
    pub const GRADIENT_START: &str = "gradientStart";
    pub const GRADIENT_END: &str = "gradientEnd";

    pub const HOURLY_COUNT: &str = "hourly.count";
    pub const DAILY_COUNT: &str = "daily.count";

    pub const SUNRISE: &str = "astronomy.sunrise";
    pub const SUNSET: &str = "astronomy.sunset";
    pub const MOON_PHASE_NAME: &str = "astronomy.moonPhaseName";

    pub const AURORA_KP: &str = "aurora.kp";
    pub const AURORA_VISIBILITY: &str = "aurora.visibilityProb";
    pub const AURORA_MAX_KP: &str = "aurora.maxKp";
    pub const AURORA_MAX_PROB: &str = "aurora.maxProb";
    pub const AURORA_BEST_TIME: &str = "aurora.bestTime";
    pub const AURORA_BEST_KP: &str = "aurora.bestKp";
    pub const AURORA_FORECAST_COUNT: &str = "aurora.forecastKp.count";

    pub const OPACITY_PERCENT: &str = "customization.opacityPercent";
    pub const THEME_MODE: &str = "customization.themeMode";
    pub const FIXED_COLOR: &str = "customization.fixedColor";

    pub fn hourly(index: usize, field: &str) -> String {
        format!("hourly.{}.{}", index, field)
    }

    pub fn daily(index: usize, field: &str) -> String {
        format!("daily.{}.{}", index, field)
    }

    pub fn forecast_kp(index: usize) -> String {
        format!("aurora.forecastKp.{}", index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyEntry {
    pub time_label: String,
    pub temperature: i32,
    pub weather_code: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyEntry {
    pub date_label: String,
    pub max_temp: i32,
    pub min_temp: i32,
    pub weather_code: i32,
}

/// Empty strings mean unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstronomyBlock {
    pub sunrise: String,
    pub sunset: String,
    pub moon_phase_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuroraBlock {
    pub kp: f64,
    pub visibility_prob: i32,
    pub max_kp: f64,
    pub max_prob: i32,
    pub best_time: String,
    pub best_kp: f64,
    pub forecast_kp: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
    Custom,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Custom => "custom",
        }
    }

    /// Unknown modes read as `Auto`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "dark" => Self::Dark,
            "custom" => Self::Custom,
            _ => Self::Auto,
        }
    }
}

/// Widget appearance chosen on the customization screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    /// 0..=100
    pub opacity_percent: u8,
    #[serde(default)]
    pub theme_mode: ThemeMode,
    /// `#RRGGBB`, used when `theme_mode` is `Custom`
    #[serde(default)]
    pub fixed_color: String,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            opacity_percent: 100,
            theme_mode: ThemeMode::Auto,
            fixed_color: String::new(),
        }
    }
}

/// Complete widget record. Always published whole.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetPayload {
    pub temperature: i32,
    pub weather_code: i32,
    pub city: String,
    pub description: String,
    /// Epoch milliseconds
    pub updated_at: i64,
    pub is_night: bool,
    pub gradient_start: String,
    pub gradient_end: String,
    pub hourly: Vec<HourlyEntry>,
    pub daily: Vec<DailyEntry>,
    pub astronomy: AstronomyBlock,
    pub aurora: Option<AuroraBlock>,
    pub customization: Option<Customization>,
}

impl WidgetPayload {
    /// Same weather, different customization.
    ///
    /// The customization screen reads the published payload, calls this, and
    /// publishes the result; there is no store-level partial update.
    pub fn with_customization(mut self, customization: Option<Customization>) -> Self {
        self.customization = customization.map(|c| Customization {
            opacity_percent: c.opacity_percent.min(100),
            fixed_color: normalize_hex_color(&c.fixed_color).unwrap_or_default(),
            theme_mode: c.theme_mode,
        });
        self
    }

    /// Prefer the user's saved city name over the backend's label.
    pub fn with_city_name(mut self, city_name: Option<&str>) -> Self {
        if let Some(name) = city_name.map(str::trim).filter(|n| !n.is_empty()) {
            self.city = name.to_string();
        }
        self
    }

    /// Carry `previous` over when this payload has no aurora block of its own.
    ///
    /// Used after a failed aurora fetch so the whole-namespace publish does
    /// not erase the last good block.
    pub fn with_fallback_aurora(mut self, previous: Option<AuroraBlock>) -> Self {
        if self.aurora.is_none() {
            self.aurora = previous;
        }
        self
    }

    /// Canonical flat encoding, one primitive per key, arrays truncated to bounds.
    pub fn to_entries(&self) -> Entries {
        let mut e = Entries::new();
        let mut put = |key: &str, value: StoreValue| {
            e.insert(key.to_string(), value);
        };

        put(keys::SCHEMA_VERSION, StoreValue::Int(SCHEMA_VERSION));
        put(keys::TEMPERATURE, self.temperature.into());
        put(keys::WEATHER_CODE, self.weather_code.into());
        put(keys::CITY, self.city.as_str().into());
        put(keys::DESCRIPTION, self.description.as_str().into());
        put(keys::UPDATED_AT, StoreValue::Int(self.updated_at));
        put(keys::IS_NIGHT, self.is_night.into());
        put(keys::GRADIENT_START, self.gradient_start.as_str().into());
        put(keys::GRADIENT_END, self.gradient_end.as_str().into());

        let hourly = &self.hourly[..self.hourly.len().min(MAX_HOURLY)];
        put(keys::HOURLY_COUNT, StoreValue::Int(hourly.len() as i64));
        for (i, h) in hourly.iter().enumerate() {
            put(&keys::hourly(i, "timeLabel"), h.time_label.as_str().into());
            put(&keys::hourly(i, "temperature"), h.temperature.into());
            put(&keys::hourly(i, "weatherCode"), h.weather_code.into());
        }

        let daily = &self.daily[..self.daily.len().min(MAX_DAILY)];
        put(keys::DAILY_COUNT, StoreValue::Int(daily.len() as i64));
        for (i, d) in daily.iter().enumerate() {
            put(&keys::daily(i, "dateLabel"), d.date_label.as_str().into());
            put(&keys::daily(i, "maxTemp"), d.max_temp.into());
            put(&keys::daily(i, "minTemp"), d.min_temp.into());
            put(&keys::daily(i, "weatherCode"), d.weather_code.into());
        }

        put(keys::SUNRISE, self.astronomy.sunrise.as_str().into());
        put(keys::SUNSET, self.astronomy.sunset.as_str().into());
        put(keys::MOON_PHASE_NAME, self.astronomy.moon_phase_name.as_str().into());

        if let Some(a) = &self.aurora {
            put(keys::AURORA_KP, StoreValue::Float(round_kp(a.kp)));
            put(keys::AURORA_VISIBILITY, a.visibility_prob.into());
            put(keys::AURORA_MAX_KP, StoreValue::Float(round_kp(a.max_kp)));
            put(keys::AURORA_MAX_PROB, a.max_prob.into());
            put(keys::AURORA_BEST_TIME, a.best_time.as_str().into());
            put(keys::AURORA_BEST_KP, StoreValue::Float(round_kp(a.best_kp)));
            let forecast = &a.forecast_kp[..a.forecast_kp.len().min(MAX_FORECAST_KP)];
            put(keys::AURORA_FORECAST_COUNT, StoreValue::Int(forecast.len() as i64));
            for (i, kp) in forecast.iter().enumerate() {
                put(&keys::forecast_kp(i), StoreValue::Float(round_kp(*kp)));
            }
        }

        if let Some(c) = &self.customization {
            put(keys::OPACITY_PERCENT, i32::from(c.opacity_percent.min(100)).into());
            put(keys::THEME_MODE, c.theme_mode.as_str().into());
            let color = normalize_hex_color(&c.fixed_color).unwrap_or_default();
            put(keys::FIXED_COLOR, color.into());
        }

        e
    }
}

/// Kp values keep one decimal; non-finite values become 0.
pub fn round_kp(kp: f64) -> f64 {
    if kp.is_finite() {
        (kp * 10.0).round() / 10.0
    } else {
        0.0
    }
}

/// Normalize `#rgb`, `#rrggbb`, `#rrggbbaa` (with or without `#`) to `#RRGGBB`.
pub fn normalize_hex_color(value: &str) -> Option<String> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        8 => hex[..6].to_string(),
        _ => return None,
    };
    Some(format!("#{}", rgb.to_ascii_uppercase()))
}
