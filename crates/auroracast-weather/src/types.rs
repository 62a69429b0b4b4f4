use auroracast_core::NetworkError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Display language for backend text and local labels.
///
/// The backend only localizes English and Czech; anything else falls back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Cs,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "cs" | "cz" | "cs-cz" => Self::Cs,
            _ => Self::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Cs => "cs",
        }
    }
}

/// Subscription tier, forwarded to the backend and used to gate premium alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Plus,
    Pro,
}

impl SubscriptionTier {
    /// Unknown tiers are treated as free.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "plus" => Self::Plus,
            "pro" => Self::Pro,
            _ => Self::Free,
        }
    }

    pub fn grants_daily_brief(&self) -> bool {
        matches!(self, Self::Plus | Self::Pro)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Plus => "plus",
            Self::Pro => "pro",
        }
    }
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self, language: Language) -> &'static str {
        match language {
            Language::En => match self {
                Self::Clear => "Clear",
                Self::PartlyCloudy => "Partly Cloudy",
                Self::Cloudy => "Cloudy",
                Self::Fog => "Fog",
                Self::Drizzle => "Drizzle",
                Self::Rain => "Rain",
                Self::HeavyRain => "Heavy Rain",
                Self::Snow => "Snow",
                Self::Sleet => "Sleet",
                Self::Thunderstorm => "Thunderstorm",
            },
            Language::Cs => match self {
                Self::Clear => "Jasno",
                Self::PartlyCloudy => "Polojasno",
                Self::Cloudy => "Zataženo",
                Self::Fog => "Mlha",
                Self::Drizzle => "Mrholení",
                Self::Rain => "Déšť",
                Self::HeavyRain => "Silný déšť",
                Self::Snow => "Sníh",
                Self::Sleet => "Déšť se sněhem",
                Self::Thunderstorm => "Bouřka",
            },
        }
    }
}

/// Geographic location from the last-known location store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city_name: Option<String>,
}

/// Location echoed back by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastLocation {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Current weather conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Celsius
    pub temperature: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<u8>,
    /// km/h
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i32>,
    #[serde(default)]
    pub weather_description: Option<String>,
    #[serde(default)]
    pub cloud_cover: Option<u8>,
}

impl CurrentWeather {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code.unwrap_or(0))
    }

    /// Backend-localized description, falling back to the local WMO table
    pub fn localized_description(&self, language: Language) -> String {
        match self.weather_description.as_deref() {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => self.condition().description(language).to_string(),
        }
    }
}

/// Hourly forecast entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: String,
    pub temperature: f64,
    #[serde(default)]
    pub weather_code: Option<i32>,
    #[serde(default)]
    pub precipitation_probability: Option<u8>,
}

/// Daily forecast entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    #[serde(default)]
    pub weather_code: Option<i32>,
    #[serde(default)]
    pub precipitation_probability: Option<u8>,
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Astronomy {
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
    /// 0..1, 0 = new moon, 0.5 = full moon
    #[serde(default)]
    pub moon_phase: Option<f64>,
    #[serde(default)]
    pub moon_phase_name: Option<String>,
}

/// Background theme picked from conditions and time of day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientTheme {
    pub theme: String,
    /// Hex color stops, darkest-to-lightest order is not guaranteed
    pub gradient: Vec<String>,
    #[serde(default)]
    pub effect: Option<String>,
}

/// Complete forecast bundle from the aggregation backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub location: ForecastLocation,
    #[serde(default)]
    pub current: Option<CurrentWeather>,
    #[serde(default)]
    pub daily_forecast: Vec<DailyForecast>,
    #[serde(default)]
    pub hourly_forecast: Vec<HourlyForecast>,
    #[serde(default)]
    pub astronomy: Option<Astronomy>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub ambient_theme: Option<AmbientTheme>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One 3-hour Kp forecast slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpForecastEntry {
    pub time: String,
    pub kp: f64,
    #[serde(default)]
    pub scale: Option<String>,
}

/// Aurora outlook for a latitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuroraForecast {
    pub current_kp: f64,
    pub current_description: String,
    /// Percent, 0..=95
    pub visibility_probability: u8,
    pub max_forecast_kp: f64,
    pub max_visibility_probability: u8,
    pub best_viewing_time: Option<String>,
    pub best_viewing_kp: f64,
    pub forecast: Vec<KpForecastEntry>,
}

/// Parameters of a forecast request
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub location: Location,
    pub days: u32,
    pub language: Language,
    pub tier: SubscriptionTier,
    pub confidence_bias: f64,
}

/// Parameters of a smart summary request
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub location: Location,
    pub language: Language,
    pub tier: SubscriptionTier,
}

/// Parse the timestamp formats the backend emits.
///
/// Accepts `2024-01-02T08:00`, `2024-01-02T08:00:00`, `2024-01-02 08:00:00`
/// and RFC 3339 with offset (the offset is dropped, wall time is kept).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Backend error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Api(_) | Self::Parse(_) => false,
        }
    }
}
