//! Notification delivery seam.

use async_trait::async_trait;
use auroracast_weather::Language;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notifications unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Hands decided alerts to the host notification surface.
///
/// Returning `Ok` means the host accepted the notification; the caller then
/// records the cooldown.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn show_daily_brief(&self, title: &str, body: &str) -> Result<(), DispatchError>;

    async fn show_aurora_alert(
        &self,
        kp: f64,
        probability: u8,
        language: Language,
    ) -> Result<(), DispatchError>;
}

pub fn daily_brief_title(language: Language) -> &'static str {
    match language {
        Language::En => "Your daily weather brief",
        Language::Cs => "Vaše denní předpověď",
    }
}

pub fn aurora_alert_title(language: Language) -> &'static str {
    match language {
        Language::En => "Aurora alert",
        Language::Cs => "Upozornění na polární záři",
    }
}

pub fn aurora_alert_body(kp: f64, probability: u8, language: Language) -> String {
    match language {
        Language::En => format!("Kp {:.1}, {}% chance to see the aurora tonight", kp, probability),
        Language::Cs => format!("Kp {:.1}, {}% šance na polární záři", kp, probability),
    }
}

/// Writes notifications to the log, for hosts without a notification surface
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn show_daily_brief(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        tracing::info!(title, body, "Daily brief");
        Ok(())
    }

    async fn show_aurora_alert(
        &self,
        kp: f64,
        probability: u8,
        language: Language,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            title = aurora_alert_title(language),
            body = %aurora_alert_body(kp, probability, language),
            "Aurora alert"
        );
        Ok(())
    }
}
