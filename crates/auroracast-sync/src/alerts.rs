//! Alert rules. Pure: no I/O, the clock is an argument.

use auroracast_core::AlertConfig;
use auroracast_weather::{AuroraForecast, ForecastBundle, Language};
use chrono::{DateTime, Duration, FixedOffset, Timelike};

use crate::cooldown::AlertCooldownState;
use crate::settings::Settings;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    DailyBrief { text: String },
    AuroraAlert { kp: f64, probability: u8 },
}

/// Thresholds and windows for the alert rules
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// Inclusive local-hour window for the daily brief
    pub brief_window_start_hour: u32,
    pub brief_window_end_hour: u32,
    pub brief_max_chars: usize,
    pub aurora_kp_threshold: f64,
    pub aurora_probability_threshold: u8,
    pub aurora_cooldown: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for AlertPolicy {
    fn from(config: &AlertConfig) -> Self {
        Self {
            brief_window_start_hour: config.brief_window_start_hour,
            brief_window_end_hour: config.brief_window_end_hour,
            brief_max_chars: config.brief_max_chars,
            aurora_kp_threshold: config.aurora_kp_threshold,
            aurora_probability_threshold: config.aurora_probability_threshold,
            aurora_cooldown: Duration::hours(i64::from(config.aurora_cooldown_hours)),
        }
    }
}

impl AlertPolicy {
    /// Decide which alerts to send. The two rules are independent and may
    /// both fire; an empty result means nothing to send.
    pub fn decide(
        &self,
        settings: &Settings,
        cooldown: &AlertCooldownState,
        now: DateTime<FixedOffset>,
        weather: Option<&ForecastBundle>,
        aurora: Option<&AuroraForecast>,
    ) -> Vec<AlertDecision> {
        let mut decisions = Vec::new();
        if !settings.notifications_enabled {
            return decisions;
        }

        if let Some(text) = self.daily_brief(settings, cooldown, now, weather) {
            decisions.push(AlertDecision::DailyBrief { text });
        }
        if let Some(aurora) = aurora.filter(|_| settings.aurora_alerts) {
            if self.aurora_due(cooldown, now, aurora) {
                decisions.push(AlertDecision::AuroraAlert {
                    kp: aurora.current_kp,
                    probability: aurora.visibility_probability,
                });
            }
        }
        decisions
    }

    pub fn in_brief_window(&self, now: DateTime<FixedOffset>) -> bool {
        (self.brief_window_start_hour..=self.brief_window_end_hour).contains(&now.hour())
    }

    /// Fallback brief text; the routine swaps in the backend summary when it has one.
    fn daily_brief(
        &self,
        settings: &Settings,
        cooldown: &AlertCooldownState,
        now: DateTime<FixedOffset>,
        weather: Option<&ForecastBundle>,
    ) -> Option<String> {
        if !settings.daily_brief || !settings.tier.grants_daily_brief() {
            return None;
        }
        if !self.in_brief_window(now) {
            return None;
        }
        if cooldown.last_daily_brief_date == Some(now.date_naive()) {
            return None;
        }
        let text = compose_brief(weather?, settings.language)?;
        Some(self.truncate(&text))
    }

    fn aurora_due(
        &self,
        cooldown: &AlertCooldownState,
        now: DateTime<FixedOffset>,
        aurora: &AuroraForecast,
    ) -> bool {
        let active = aurora.current_kp > self.aurora_kp_threshold
            || aurora.visibility_probability > self.aurora_probability_threshold;
        if !active {
            return false;
        }
        let now_ms = now.timestamp_millis();
        match cooldown.last_aurora_alert_at {
            None => true,
            // clock moved back
            Some(last) if last > now_ms => true,
            Some(last) => now_ms.saturating_sub(last) > self.aurora_cooldown.num_milliseconds(),
        }
    }

    /// Cut to `brief_max_chars` characters, ending in an ellipsis when cut.
    pub fn truncate(&self, text: &str) -> String {
        let text = text.trim();
        if text.chars().count() <= self.brief_max_chars {
            return text.to_string();
        }
        let keep = self.brief_max_chars.saturating_sub(1);
        let mut out: String = text.chars().take(keep).collect();
        out.truncate(out.trim_end().len());
        out.push(ELLIPSIS);
        out
    }
}

fn compose_brief(weather: &ForecastBundle, language: Language) -> Option<String> {
    let current = weather.current.as_ref()?;
    let description = current.localized_description(language);
    let temp = current.temperature.round() as i32;

    let range = weather.daily_forecast.first().map(|today| {
        let (high, low) = (
            today.temperature_max.round() as i32,
            today.temperature_min.round() as i32,
        );
        match language {
            Language::En => format!(" High {}°, low {}°.", high, low),
            Language::Cs => format!(" Max {}°, min {}°.", high, low),
        }
    });

    Some(format!(
        "{}, {}°C.{}",
        description,
        temp,
        range.unwrap_or_default()
    ))
}
