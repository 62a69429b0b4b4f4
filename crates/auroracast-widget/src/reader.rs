//! Renderer side of the widget payload.
//!
//! The renderer runs in another process and only sees the widget namespace.
//! Every key is read on its own with a typed default, so a missing, unknown
//! or oddly typed key degrades one field instead of failing the render.
//! Integers and booleans written by older app versions as floats or strings
//! are still accepted.

use std::time::Duration;

use auroracast_store::{Entries, KeyValueStore, Namespace, StoreError, StoreValue};

use crate::payload::{
    keys, normalize_hex_color, AstronomyBlock, AuroraBlock, Customization, DailyEntry,
    HourlyEntry, ThemeMode, WidgetPayload, DARK_GRADIENT, DEFAULT_GRADIENT, LIGHT_GRADIENT,
    MAX_DAILY, MAX_FORECAST_KP, MAX_HOURLY,
};

/// Shown in place of the temperature when none was published
pub const TEMPERATURE_PLACEHOLDER: &str = "--";

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// What the renderer knows after reading the widget namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    /// 0 when the key is absent
    pub schema_version: i64,
    pub temperature: Option<i32>,
    pub weather_code: i32,
    pub city: String,
    pub description: String,
    pub updated_at: i64,
    pub is_night: bool,
    /// `None` when absent or not a valid color
    pub gradient_start: Option<String>,
    pub gradient_end: Option<String>,
    pub hourly: Vec<HourlyEntry>,
    pub daily: Vec<DailyEntry>,
    pub astronomy: AstronomyBlock,
    pub aurora: Option<AuroraBlock>,
    pub customization: Option<Customization>,
}

/// Resolved widget background
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub start: String,
    pub end: String,
    /// 0.0..=1.0
    pub opacity: f32,
}

impl WidgetSnapshot {
    pub fn read(store: &dyn KeyValueStore) -> Result<Self, StoreError> {
        Ok(Self::from_entries(&store.get_all(Namespace::Widget)?))
    }

    pub fn from_entries(entries: &Entries) -> Self {
        let r = FieldReader(entries);

        let hourly = (0..r.count(keys::HOURLY_COUNT, MAX_HOURLY))
            .map(|i| HourlyEntry {
                time_label: r.string(&keys::hourly(i, "timeLabel")),
                temperature: r.int(&keys::hourly(i, "temperature")).unwrap_or(0),
                weather_code: r.int(&keys::hourly(i, "weatherCode")).unwrap_or(0),
            })
            .collect();

        let daily = (0..r.count(keys::DAILY_COUNT, MAX_DAILY))
            .map(|i| DailyEntry {
                date_label: r.string(&keys::daily(i, "dateLabel")),
                max_temp: r.int(&keys::daily(i, "maxTemp")).unwrap_or(0),
                min_temp: r.int(&keys::daily(i, "minTemp")).unwrap_or(0),
                weather_code: r.int(&keys::daily(i, "weatherCode")).unwrap_or(0),
            })
            .collect();

        let aurora = r.float(keys::AURORA_KP).map(|kp| AuroraBlock {
            kp,
            visibility_prob: r.int(keys::AURORA_VISIBILITY).unwrap_or(0),
            max_kp: r.float(keys::AURORA_MAX_KP).unwrap_or(0.0),
            max_prob: r.int(keys::AURORA_MAX_PROB).unwrap_or(0),
            best_time: r.string(keys::AURORA_BEST_TIME),
            best_kp: r.float(keys::AURORA_BEST_KP).unwrap_or(0.0),
            forecast_kp: (0..r.count(keys::AURORA_FORECAST_COUNT, MAX_FORECAST_KP))
                .map(|i| r.float(&keys::forecast_kp(i)).unwrap_or(0.0))
                .collect(),
        });

        let customization = if r.has(keys::THEME_MODE) || r.has(keys::OPACITY_PERCENT) {
            Some(Customization {
                opacity_percent: r
                    .int(keys::OPACITY_PERCENT)
                    .map_or(100, |o| o.clamp(0, 100) as u8),
                theme_mode: ThemeMode::parse(&r.string(keys::THEME_MODE)),
                fixed_color: normalize_hex_color(&r.string(keys::FIXED_COLOR))
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        Self {
            schema_version: r.int64(keys::SCHEMA_VERSION).unwrap_or(0),
            temperature: r.int(keys::TEMPERATURE),
            weather_code: r.int(keys::WEATHER_CODE).unwrap_or(0),
            city: r.string(keys::CITY),
            description: r.string(keys::DESCRIPTION),
            updated_at: r.int64(keys::UPDATED_AT).unwrap_or(0),
            is_night: r.flag(keys::IS_NIGHT).unwrap_or(false),
            gradient_start: r.color(keys::GRADIENT_START),
            gradient_end: r.color(keys::GRADIENT_END),
            hourly,
            daily,
            astronomy: AstronomyBlock {
                sunrise: r.string(keys::SUNRISE),
                sunset: r.string(keys::SUNSET),
                moon_phase_name: r.string(keys::MOON_PHASE_NAME),
            },
            aurora,
            customization,
        }
    }

    /// Temperature text, e.g. `21°`, or the placeholder.
    pub fn temperature_label(&self) -> String {
        match self.temperature {
            Some(t) => format!("{}°", t),
            None => TEMPERATURE_PLACEHOLDER.to_string(),
        }
    }

    /// Stale payloads are still rendered, with a "last updated" hint.
    ///
    /// A payload that never recorded `updatedAt` is always stale.
    pub fn is_stale(&self, now_ms: i64, threshold: Duration) -> bool {
        if self.updated_at <= 0 {
            return true;
        }
        let threshold_ms = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.updated_at) > threshold_ms
    }

    /// Whole minutes since the last publish, `None` if never published.
    pub fn minutes_since_update(&self, now_ms: i64) -> Option<i64> {
        (self.updated_at > 0).then(|| now_ms.saturating_sub(self.updated_at).max(0) / 60_000)
    }

    pub fn background(&self) -> Background {
        let baked = |(start, end): (&str, &str)| (start.to_string(), end.to_string());

        let Some(custom) = &self.customization else {
            return Background {
                start: DEFAULT_GRADIENT.0.to_string(),
                end: DEFAULT_GRADIENT.1.to_string(),
                opacity: 1.0,
            };
        };

        let (start, end) = match custom.theme_mode {
            ThemeMode::Auto => match (&self.gradient_start, &self.gradient_end) {
                (Some(s), Some(e)) => (s.clone(), e.clone()),
                _ => baked(DEFAULT_GRADIENT),
            },
            ThemeMode::Light => baked(LIGHT_GRADIENT),
            ThemeMode::Dark => baked(DARK_GRADIENT),
            ThemeMode::Custom => match normalize_hex_color(&custom.fixed_color) {
                Some(color) => (color.clone(), color),
                None => baked(DEFAULT_GRADIENT),
            },
        };

        Background {
            start,
            end,
            opacity: f32::from(custom.opacity_percent.min(100)) / 100.0,
        }
    }
}

/// The snapshot a renderer would read back after `payload` was published.
impl From<&WidgetPayload> for WidgetSnapshot {
    fn from(p: &WidgetPayload) -> Self {
        Self::from_entries(&p.to_entries())
    }
}

struct FieldReader<'a>(&'a Entries);

impl FieldReader<'_> {
    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Integer from an int, a float (rounded) or a numeric string.
    fn int64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            StoreValue::Int(i) => Some(*i),
            StoreValue::Float(f) => float_to_int(*f),
            StoreValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
            }
            StoreValue::Bool(_) => None,
        }
    }

    fn int(&self, key: &str) -> Option<i32> {
        self.int64(key).and_then(|i| i32::try_from(i).ok())
    }

    fn float(&self, key: &str) -> Option<f64> {
        let value = match self.0.get(key)? {
            StoreValue::Float(f) => *f,
            StoreValue::Int(i) => *i as f64,
            StoreValue::Text(s) => s.trim().parse::<f64>().ok()?,
            StoreValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            StoreValue::Bool(b) => Some(*b),
            StoreValue::Int(0) => Some(false),
            StoreValue::Int(1) => Some(true),
            StoreValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn string(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(StoreValue::Text(s)) => s.clone(),
            Some(StoreValue::Int(i)) => i.to_string(),
            Some(StoreValue::Float(f)) => f.to_string(),
            Some(StoreValue::Bool(_)) | None => String::new(),
        }
    }

    fn color(&self, key: &str) -> Option<String> {
        normalize_hex_color(&self.string(key))
    }

    /// Count key clamped to `max`; negative or missing counts read as 0.
    fn count(&self, key: &str, max: usize) -> usize {
        self.int64(key)
            .map_or(0, |n| usize::try_from(n.max(0)).unwrap_or(0).min(max))
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, StoreValue)]) -> Entries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_namespace_reads_defaults() {
        let s = WidgetSnapshot::from_entries(&Entries::new());
        assert_eq!(s.temperature, None);
        assert_eq!(s.temperature_label(), "--");
        assert_eq!(s.weather_code, 0);
        assert_eq!(s.city, "");
        assert_eq!(s.updated_at, 0);
        assert!(!s.is_night);
        assert!(s.hourly.is_empty());
        assert!(s.aurora.is_none());
        assert!(s.customization.is_none());
        assert!(s.is_stale(1_704_182_400_000, DEFAULT_STALE_AFTER));
    }

    #[test]
    fn test_integers_accept_floats_and_strings() {
        let s = WidgetSnapshot::from_entries(&entries(&[
            (keys::TEMPERATURE, StoreValue::Float(20.6)),
            (keys::WEATHER_CODE, StoreValue::Text(" 61 ".into())),
            (keys::UPDATED_AT, StoreValue::Text("1704182400000.0".into())),
        ]));
        assert_eq!(s.temperature, Some(21));
        assert_eq!(s.weather_code, 61);
        assert_eq!(s.updated_at, 1_704_182_400_000);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let s = WidgetSnapshot::from_entries(&entries(&[
            (keys::TEMPERATURE, StoreValue::Text("warm".into())),
            (keys::IS_NIGHT, StoreValue::Int(7)),
            (keys::GRADIENT_START, StoreValue::Text("purple".into())),
        ]));
        assert_eq!(s.temperature, None);
        assert!(!s.is_night);
        assert_eq!(s.gradient_start, None);
    }

    #[test]
    fn test_bool_forms() {
        for (value, expected) in [
            (StoreValue::Bool(true), true),
            (StoreValue::Int(1), true),
            (StoreValue::Int(0), false),
            (StoreValue::Text("true".into()), true),
            (StoreValue::Text("FALSE".into()), false),
        ] {
            let s = WidgetSnapshot::from_entries(&entries(&[(keys::IS_NIGHT, value)]));
            assert_eq!(s.is_night, expected);
        }
    }

    #[test]
    fn test_counts_are_bounded() {
        let s = WidgetSnapshot::from_entries(&entries(&[
            (keys::HOURLY_COUNT, StoreValue::Int(50)),
            (keys::DAILY_COUNT, StoreValue::Int(-2)),
        ]));
        assert_eq!(s.hourly.len(), MAX_HOURLY);
        assert_eq!(s.hourly[0].time_label, "");
        assert!(s.daily.is_empty());
    }

    #[test]
    fn test_staleness() {
        let s = WidgetSnapshot {
            updated_at: 1_000_000,
            ..WidgetSnapshot::from_entries(&Entries::new())
        };
        let hour = 60 * 60 * 1000;
        assert!(!s.is_stale(1_000_000 + hour, DEFAULT_STALE_AFTER));
        assert!(s.is_stale(1_000_000 + hour + 1, DEFAULT_STALE_AFTER));
        assert_eq!(s.minutes_since_update(1_000_000 + 5 * 60_000), Some(5));
    }

    #[test]
    fn test_background_without_customization_is_default() {
        let s = WidgetSnapshot::from_entries(&entries(&[
            (keys::GRADIENT_START, StoreValue::Text("#0F0C29".into())),
            (keys::GRADIENT_END, StoreValue::Text("#24243E".into())),
        ]));
        let bg = s.background();
        assert_eq!(bg.start, DEFAULT_GRADIENT.0);
        assert_eq!(bg.end, DEFAULT_GRADIENT.1);
        assert_eq!(bg.opacity, 1.0);
    }

    #[test]
    fn test_background_modes() {
        let base = [
            (keys::GRADIENT_START, StoreValue::Text("#0F0C29".into())),
            (keys::GRADIENT_END, StoreValue::Text("#24243E".into())),
            (keys::OPACITY_PERCENT, StoreValue::Int(80)),
        ];
        let with_mode = |mode: &str, color: &str| {
            let mut e = entries(&base);
            e.insert(keys::THEME_MODE.into(), mode.into());
            e.insert(keys::FIXED_COLOR.into(), color.into());
            WidgetSnapshot::from_entries(&e).background()
        };

        let auto = with_mode("auto", "");
        assert_eq!((auto.start.as_str(), auto.end.as_str()), ("#0F0C29", "#24243E"));
        assert!((auto.opacity - 0.8).abs() < f32::EPSILON);

        let dark = with_mode("dark", "");
        assert_eq!((dark.start.as_str(), dark.end.as_str()), DARK_GRADIENT);

        let light = with_mode("light", "");
        assert_eq!((light.start.as_str(), light.end.as_str()), LIGHT_GRADIENT);

        let custom = with_mode("custom", "#ff0000");
        assert_eq!(custom.start, "#FF0000");
        assert_eq!(custom.end, "#FF0000");

        let broken = with_mode("custom", "red");
        assert_eq!(broken.start, DEFAULT_GRADIENT.0);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let s = WidgetSnapshot::from_entries(&entries(&[
            (keys::OPACITY_PERCENT, StoreValue::Int(250)),
        ]));
        assert_eq!(s.customization.as_ref().unwrap().opacity_percent, 100);
        assert_eq!(s.background().opacity, 1.0);
    }
}
