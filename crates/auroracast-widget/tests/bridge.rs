//! Publish from the sync side, read from the renderer side.

use auroracast_store::{Entries, KeyValueStore, MemoryStore, Namespace, SqliteStore, StoreValue};
use auroracast_weather::{
    AmbientTheme, AuroraForecast, CurrentWeather, DailyForecast, ForecastBundle,
    ForecastLocation, HourlyForecast, KpForecastEntry, Language,
};
use auroracast_widget::{
    encode, publish, Customization, ThemeMode, WidgetPayload, WidgetSnapshot, SCHEMA_VERSION,
};
use chrono::{DateTime, FixedOffset};

fn now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-02T21:10:00+01:00").unwrap()
}

fn bundle() -> ForecastBundle {
    ForecastBundle {
        location: ForecastLocation {
            name: "Tromsø".into(),
            latitude: 69.65,
            longitude: 18.96,
            ..Default::default()
        },
        current: Some(CurrentWeather {
            temperature: -7.4,
            weather_code: Some(0),
            weather_description: Some("Clear sky".into()),
            ..Default::default()
        }),
        hourly_forecast: (21..24)
            .map(|h| HourlyForecast {
                time: format!("2024-01-02T{}:00", h),
                temperature: -8.0,
                weather_code: Some(0),
                precipitation_probability: Some(0),
            })
            .collect(),
        daily_forecast: vec![DailyForecast {
            date: "2024-01-02".into(),
            temperature_max: -4.0,
            temperature_min: -11.2,
            weather_code: Some(0),
            precipitation_probability: None,
            sunrise: None,
            sunset: None,
        }],
        ..Default::default()
    }
}

fn theme() -> AmbientTheme {
    AmbientTheme {
        theme: "clear_night".into(),
        gradient: vec!["#0f0c29".into(), "#302b63".into(), "#24243e".into()],
        effect: Some("stars".into()),
    }
}

fn aurora() -> AuroraForecast {
    AuroraForecast {
        current_kp: 5.2,
        current_description: "Minor storm".into(),
        visibility_probability: 80,
        max_forecast_kp: 6.3,
        max_visibility_probability: 95,
        best_viewing_time: Some("2024-01-02T23:00:00".into()),
        best_viewing_kp: 6.3,
        forecast: [4.0, 5.3, 6.3]
            .iter()
            .map(|kp| KpForecastEntry {
                time: String::new(),
                kp: *kp,
                scale: None,
            })
            .collect(),
    }
}

fn full_payload() -> WidgetPayload {
    let custom = Customization {
        opacity_percent: 70,
        theme_mode: ThemeMode::Auto,
        fixed_color: String::new(),
    };
    encode(&bundle(), &theme(), Some(&aurora()), Some(&custom), Language::En, now()).unwrap()
}

#[test]
fn test_publish_is_idempotent() {
    let store = MemoryStore::new();
    let payload = full_payload();

    publish(&store, &payload).unwrap();
    let first = store.get_all(Namespace::Widget).unwrap();
    publish(&store, &payload).unwrap();
    let second = store.get_all(Namespace::Widget).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auroracast.db");
    let payload = full_payload();

    publish(&SqliteStore::new(&path).unwrap(), &payload).unwrap();

    // the renderer opens its own handle
    let renderer = SqliteStore::new(&path).unwrap();
    let s = WidgetSnapshot::read(&renderer).unwrap();

    assert_eq!(s.schema_version, SCHEMA_VERSION);
    assert_eq!(s.temperature, Some(payload.temperature));
    assert_eq!(s.weather_code, payload.weather_code);
    assert_eq!(s.city, payload.city);
    assert_eq!(s.description, payload.description);
    assert_eq!(s.updated_at, payload.updated_at);
    assert_eq!(s.is_night, payload.is_night);
    assert_eq!(s.gradient_start.as_deref(), Some(payload.gradient_start.as_str()));
    assert_eq!(s.gradient_end.as_deref(), Some(payload.gradient_end.as_str()));
    assert_eq!(s.hourly, payload.hourly);
    assert_eq!(s.daily, payload.daily);
    assert_eq!(s.astronomy, payload.astronomy);
    assert_eq!(s.aurora, payload.aurora);
    assert_eq!(s.customization, payload.customization);

    assert_eq!(s.temperature, Some(-7));
    assert!(s.is_night);
    assert_eq!(s.aurora.as_ref().unwrap().forecast_kp, vec![4.0, 5.3, 6.3]);
    assert_eq!(s.aurora.as_ref().unwrap().best_time, "23:00");
}

#[test]
fn test_partial_namespace_renders_with_defaults() {
    let store = MemoryStore::new();
    let mut entries = Entries::new();
    entries.insert("temperature".into(), StoreValue::Int(21));
    store.replace_namespace(Namespace::Widget, entries).unwrap();

    let s = WidgetSnapshot::read(&store).unwrap();

    assert_eq!(s.temperature_label(), "21°");
    assert_eq!(s.city, "");
    assert_eq!(s.weather_code, 0);
    assert!(s.hourly.is_empty());
    assert!(s.daily.is_empty());
    assert!(s.aurora.is_none());
    assert_eq!(s.gradient_start, None);
    assert!(s.is_stale(now().timestamp_millis(), auroracast_widget::DEFAULT_STALE_AFTER));
}

#[test]
fn test_dropped_aurora_block_is_removed_on_republish() {
    let store = MemoryStore::new();
    publish(&store, &full_payload()).unwrap();
    assert!(WidgetSnapshot::read(&store).unwrap().aurora.is_some());

    let without = encode(&bundle(), &theme(), None, None, Language::En, now()).unwrap();
    publish(&store, &without).unwrap();

    let entries = store.get_all(Namespace::Widget).unwrap();
    assert!(entries.keys().all(|k| !k.starts_with("aurora.")));
    assert!(entries.keys().all(|k| !k.starts_with("customization.")));
    assert_eq!(WidgetSnapshot::read(&store).unwrap(), WidgetSnapshot::from(&without));
}

#[test]
fn test_customization_update_keeps_weather() {
    let store = MemoryStore::new();
    let live = full_payload();
    publish(&store, &live).unwrap();

    let updated = live.clone().with_customization(Some(Customization {
        opacity_percent: 40,
        theme_mode: ThemeMode::Dark,
        fixed_color: String::new(),
    }));
    publish(&store, &updated).unwrap();

    let s = WidgetSnapshot::read(&store).unwrap();
    assert_eq!(s.temperature, Some(live.temperature));
    assert_eq!(s.hourly, live.hourly);
    assert_eq!(s.customization.unwrap().theme_mode, ThemeMode::Dark);
}
