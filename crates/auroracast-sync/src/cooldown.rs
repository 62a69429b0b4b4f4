//! Persisted alert cooldowns.
//!
//! Each field is its own record in the `alerts` namespace, so recording one
//! alert never rewrites the other. Callers record a cooldown only after the
//! notification was handed to the dispatcher.

use std::sync::Arc;

use auroracast_store::{KeyValueStore, Namespace, StoreError, StoreValue};
use chrono::NaiveDate;

pub const LAST_DAILY_BRIEF_DATE: &str = "lastDailyBriefDate";
pub const LAST_AURORA_ALERT_AT: &str = "lastAuroraAlertAt";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertCooldownState {
    /// Local calendar date of the last daily brief
    pub last_daily_brief_date: Option<NaiveDate>,
    /// Epoch milliseconds of the last aurora alert
    pub last_aurora_alert_at: Option<i64>,
}

pub struct CooldownStore {
    store: Arc<dyn KeyValueStore>,
}

impl CooldownStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<AlertCooldownState, StoreError> {
        let date = match self.store.get(Namespace::Alerts, LAST_DAILY_BRIEF_DATE)? {
            Some(StoreValue::Text(s)) => {
                let parsed = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok();
                if parsed.is_none() {
                    tracing::warn!(value = %s, "Unreadable daily brief cooldown, treating as unset");
                }
                parsed
            }
            _ => None,
        };

        let at = match self.store.get(Namespace::Alerts, LAST_AURORA_ALERT_AT)? {
            Some(StoreValue::Int(ms)) => Some(ms),
            Some(StoreValue::Float(ms)) if ms.is_finite() => Some(ms.round() as i64),
            Some(StoreValue::Text(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        Ok(AlertCooldownState {
            last_daily_brief_date: date,
            last_aurora_alert_at: at,
        })
    }

    pub fn record_daily_brief(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.store.set(
            Namespace::Alerts,
            LAST_DAILY_BRIEF_DATE,
            StoreValue::Text(date.format(DATE_FORMAT).to_string()),
        )
    }

    pub fn record_aurora_alert(&self, at_ms: i64) -> Result<(), StoreError> {
        self.store
            .set(Namespace::Alerts, LAST_AURORA_ALERT_AT, StoreValue::Int(at_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auroracast_store::{MemoryStore, SqliteStore};

    #[test]
    fn test_empty_store_has_no_cooldowns() {
        let cooldowns = CooldownStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(cooldowns.load().unwrap(), AlertCooldownState::default());
    }

    #[test]
    fn test_records_are_independent() {
        let cooldowns = CooldownStore::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        cooldowns.record_daily_brief(day).unwrap();
        assert_eq!(cooldowns.load().unwrap().last_aurora_alert_at, None);

        cooldowns.record_aurora_alert(1_704_182_400_000).unwrap();
        let state = cooldowns.load().unwrap();
        assert_eq!(state.last_daily_brief_date, Some(day));
        assert_eq!(state.last_aurora_alert_at, Some(1_704_182_400_000));
    }

    #[test]
    fn test_date_is_stored_as_plain_string() {
        let store = Arc::new(MemoryStore::new());
        let cooldowns = CooldownStore::new(store.clone());
        cooldowns
            .record_daily_brief(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap();

        assert_eq!(
            store.get(Namespace::Alerts, LAST_DAILY_BRIEF_DATE).unwrap(),
            Some(StoreValue::Text("2024-01-02".into()))
        );
    }

    #[test]
    fn test_legacy_representations() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(Namespace::Alerts, LAST_AURORA_ALERT_AT, "1704182400000".into())
            .unwrap();
        store
            .set(Namespace::Alerts, LAST_DAILY_BRIEF_DATE, "yesterday".into())
            .unwrap();

        let state = CooldownStore::new(store).load().unwrap();
        assert_eq!(state.last_aurora_alert_at, Some(1_704_182_400_000));
        assert_eq!(state.last_daily_brief_date, None);
    }
}
