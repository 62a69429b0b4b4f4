//! Settings and last-known location, as written by the foreground app.

use std::sync::Arc;

use auroracast_store::{KeyValueStore, Namespace, StoreValue};
use auroracast_weather::{Language, Location, SubscriptionTier};
use auroracast_widget::Customization;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SyncResult;

pub const SETTINGS_KEY: &str = "settings";
pub const LOCATION_KEY: &str = "location";

/// Preferences that affect background work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub daily_brief: bool,
    pub aurora_alerts: bool,
    #[serde(deserialize_with = "lenient_language")]
    pub language: Language,
    #[serde(deserialize_with = "lenient_tier")]
    pub tier: SubscriptionTier,
    pub confidence_bias: f64,
    /// Widget appearance, `None` until the user opens the customization screen
    pub widget: Option<Customization>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            daily_brief: true,
            aurora_alerts: true,
            language: Language::En,
            tier: SubscriptionTier::Free,
            confidence_bias: 0.0,
            widget: None,
        }
    }
}

fn lenient_language<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Language, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(Language::from_code).unwrap_or_default())
}

fn lenient_tier<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<SubscriptionTier, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(SubscriptionTier::from_code)
        .unwrap_or_default())
}

/// Where background work gets settings and location from
pub trait SettingsSource: Send + Sync {
    fn load_settings(&self) -> SyncResult<Settings>;

    /// `None` when the app never recorded a location
    fn load_location(&self) -> SyncResult<Option<Location>>;
}

/// Reads JSON records from the `app` namespace.
///
/// Undecodable records are logged and treated as missing, so a bad write by
/// an older app version never blocks the widget refresh.
pub struct StoreSettingsSource {
    store: Arc<dyn KeyValueStore>,
}

impl StoreSettingsSource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save_settings(&self, settings: &Settings) -> SyncResult<()> {
        self.save_json(SETTINGS_KEY, settings)
    }

    pub fn save_location(&self, location: &Location) -> SyncResult<()> {
        self.save_json(LOCATION_KEY, location)
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> SyncResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| auroracast_store::StoreError::Encoding(e.to_string()))?;
        self.store.set(Namespace::App, key, StoreValue::Text(json))?;
        Ok(())
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> SyncResult<Option<T>> {
        match self.store.get(Namespace::App, key)? {
            None => Ok(None),
            Some(StoreValue::Text(json)) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Ignoring undecodable app record");
                    Ok(None)
                }
            },
            Some(other) => {
                tracing::warn!(key, value = ?other, "Ignoring non-JSON app record");
                Ok(None)
            }
        }
    }
}

impl SettingsSource for StoreSettingsSource {
    fn load_settings(&self) -> SyncResult<Settings> {
        Ok(self.load_json(SETTINGS_KEY)?.unwrap_or_default())
    }

    fn load_location(&self) -> SyncResult<Option<Location>> {
        self.load_json(LOCATION_KEY)
    }
}
