//! One synchronization pass: fetch, publish the widget, send alerts.

use std::sync::Arc;

use async_trait::async_trait;
use auroracast_store::KeyValueStore;
use auroracast_weather::theme::ambient_theme;
use auroracast_weather::{
    AuroraForecast, ForecastBundle, ForecastRequest, Location, SummaryRequest, WeatherError,
    WeatherSource,
};
use auroracast_widget::{encode, publish, AuroraBlock, WidgetSnapshot};
use chrono::{DateTime, FixedOffset, Local, Timelike};
use tracing::{debug, info, instrument, warn};

use crate::alerts::{AlertDecision, AlertPolicy};
use crate::cooldown::{AlertCooldownState, CooldownStore};
use crate::error::{SyncError, SyncResult};
use crate::notify::{daily_brief_title, NotificationDispatcher};
use crate::scheduler::{SyncInvocation, SyncJob};
use crate::settings::{Settings, SettingsSource, StoreSettingsSource};

/// Everything a pass needs from persisted state
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub settings: Settings,
    pub location: Option<Location>,
    pub cooldown: AlertCooldownState,
}

/// Read settings, location and cooldowns from persisted state.
///
/// Every entry point calls this first; nothing is assumed to be in memory.
pub fn load_state(settings: &dyn SettingsSource, cooldowns: &CooldownStore) -> SyncResult<SyncState> {
    Ok(SyncState {
        settings: settings.load_settings()?,
        location: settings.load_location()?,
        cooldown: cooldowns.load()?,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum StepOutcome {
    #[default]
    NotRun,
    Done,
    Skipped(&'static str),
    Failed(String),
}

impl StepOutcome {
    fn failed(err: &SyncError) -> Self {
        Self::Failed(err.to_string())
    }
}

/// What happened in one pass, step by step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub weather: StepOutcome,
    pub aurora: StepOutcome,
    pub widget: StepOutcome,
    pub daily_brief: StepOutcome,
    pub aurora_alert: StepOutcome,
}

impl SyncReport {
    fn skipped_all(reason: &'static str) -> Self {
        let s = StepOutcome::Skipped(reason);
        Self {
            weather: s.clone(),
            aurora: s.clone(),
            widget: s.clone(),
            daily_brief: s.clone(),
            aurora_alert: s,
        }
    }

    pub fn has_failures(&self) -> bool {
        [
            &self.weather,
            &self.aurora,
            &self.widget,
            &self.daily_brief,
            &self.aurora_alert,
        ]
        .iter()
        .any(|s| matches!(s, StepOutcome::Failed(_)))
    }
}

/// The synchronization routine shared by periodic and headless invocations
pub struct SyncRoutine {
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn KeyValueStore>,
    settings: Arc<dyn SettingsSource>,
    cooldowns: CooldownStore,
    dispatcher: Arc<dyn NotificationDispatcher>,
    policy: AlertPolicy,
    forecast_days: u32,
}

impl SyncRoutine {
    /// Settings and location are read from the `app` namespace of `store`.
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            settings: Arc::new(StoreSettingsSource::new(store.clone())),
            cooldowns: CooldownStore::new(store.clone()),
            source,
            store,
            dispatcher,
            policy: AlertPolicy::default(),
            forecast_days: 3,
        }
    }

    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_forecast_days(mut self, days: u32) -> Self {
        self.forecast_days = days.max(1);
        self
    }

    pub fn with_settings_source(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.settings = settings;
        self
    }

    /// Run one pass as if the local time were `now`.
    ///
    /// Only a failure to read persisted state is returned as an error; every
    /// later step records its outcome in the report and lets the others run.
    pub async fn run_at(&self, now: DateTime<FixedOffset>) -> SyncResult<SyncReport> {
        let state = load_state(self.settings.as_ref(), &self.cooldowns)?;
        let Some(location) = state.location.clone() else {
            info!("No location recorded yet, nothing to sync");
            return Ok(SyncReport::skipped_all("no location"));
        };

        let mut report = SyncReport::default();
        let (weather, aurora) = self.fetch(&state.settings, &location).await;

        report.weather = outcome(&weather);
        report.aurora = outcome(&aurora);
        let weather = weather.ok();
        let aurora = aurora.ok();

        report.widget = match &weather {
            Some(bundle) => {
                self.publish_widget(&state.settings, &location, bundle, aurora.as_ref(), now)
            }
            None => StepOutcome::Skipped("weather unavailable"),
        };

        let decisions = self.policy.decide(
            &state.settings,
            &state.cooldown,
            now,
            weather.as_ref(),
            aurora.as_ref(),
        );
        if decisions.is_empty() {
            debug!("No alerts due");
        }

        for decision in decisions {
            match decision {
                AlertDecision::DailyBrief { text } => {
                    report.daily_brief = self
                        .send_daily_brief(&state.settings, &location, text, now)
                        .await;
                }
                AlertDecision::AuroraAlert { kp, probability } => {
                    report.aurora_alert = self
                        .send_aurora_alert(&state.settings, kp, probability, now)
                        .await;
                }
            }
        }

        Ok(report)
    }

    /// Weather and aurora are independent; one failing never blocks the other.
    async fn fetch(
        &self,
        settings: &Settings,
        location: &Location,
    ) -> (
        Result<ForecastBundle, WeatherError>,
        Result<AuroraForecast, WeatherError>,
    ) {
        let request = ForecastRequest {
            location: location.clone(),
            days: self.forecast_days,
            language: settings.language,
            tier: settings.tier,
            confidence_bias: settings.confidence_bias,
        };

        let (weather, aurora) = tokio::join!(
            self.source.get_weather_forecast(&request),
            self.source
                .get_aurora_forecast(location.latitude, settings.language),
        );

        if let Err(e) = &weather {
            warn!(error = %e, "Weather fetch failed");
        }
        if let Err(e) = &aurora {
            warn!(error = %e, "Aurora fetch failed");
        }
        (weather, aurora)
    }

    /// A failed aurora fetch keeps the last published aurora block; only the
    /// source that failed goes stale.
    fn publish_widget(
        &self,
        settings: &Settings,
        location: &Location,
        bundle: &ForecastBundle,
        aurora: Option<&AuroraForecast>,
        now: DateTime<FixedOffset>,
    ) -> StepOutcome {
        let theme = match (&bundle.ambient_theme, &bundle.current) {
            (Some(theme), _) => theme.clone(),
            (None, Some(current)) => ambient_theme(current, now.hour()),
            (None, None) => return StepOutcome::Skipped("no current conditions"),
        };

        let previous_aurora = match aurora {
            Some(_) => None,
            None => self.published_aurora(),
        };

        let result = encode(
            bundle,
            &theme,
            aurora,
            settings.widget.as_ref(),
            settings.language,
            now,
        )
        .map(|payload| {
            payload
                .with_city_name(location.city_name.as_deref())
                .with_fallback_aurora(previous_aurora)
        })
        .map_err(SyncError::from)
        .and_then(|payload| publish(self.store.as_ref(), &payload).map_err(SyncError::from));

        match result {
            Ok(()) => StepOutcome::Done,
            Err(e) => {
                warn!(error = %e, "Widget payload not published");
                StepOutcome::failed(&e)
            }
        }
    }

    fn published_aurora(&self) -> Option<AuroraBlock> {
        match WidgetSnapshot::read(self.store.as_ref()) {
            Ok(snapshot) => snapshot.aurora,
            Err(e) => {
                warn!(error = %e, "Could not read published aurora block");
                None
            }
        }
    }

    async fn send_daily_brief(
        &self,
        settings: &Settings,
        location: &Location,
        fallback: String,
        now: DateTime<FixedOffset>,
    ) -> StepOutcome {
        let request = SummaryRequest {
            location: location.clone(),
            language: settings.language,
            tier: settings.tier,
        };
        let body = match self.source.get_smart_summary(&request).await {
            Ok(summary) if !summary.trim().is_empty() => self.policy.truncate(&summary),
            Ok(_) => fallback,
            Err(e) => {
                debug!(error = %e, "Smart summary unavailable, using fallback brief");
                fallback
            }
        };

        let title = daily_brief_title(settings.language);
        if let Err(e) = self.dispatcher.show_daily_brief(title, &body).await {
            let e = SyncError::from(e);
            warn!(error = %e, "Daily brief not delivered, will retry next run");
            return StepOutcome::failed(&e);
        }

        match self.cooldowns.record_daily_brief(now.date_naive()) {
            Ok(()) => {
                info!(date = %now.date_naive(), "Daily brief sent");
                StepOutcome::Done
            }
            Err(e) => {
                let e = SyncError::from(e);
                warn!(error = %e, "Daily brief sent but cooldown not recorded");
                StepOutcome::failed(&e)
            }
        }
    }

    async fn send_aurora_alert(
        &self,
        settings: &Settings,
        kp: f64,
        probability: u8,
        now: DateTime<FixedOffset>,
    ) -> StepOutcome {
        if let Err(e) = self
            .dispatcher
            .show_aurora_alert(kp, probability, settings.language)
            .await
        {
            let e = SyncError::from(e);
            warn!(error = %e, "Aurora alert not delivered, will retry next run");
            return StepOutcome::failed(&e);
        }

        match self.cooldowns.record_aurora_alert(now.timestamp_millis()) {
            Ok(()) => {
                info!(kp, probability, "Aurora alert sent");
                StepOutcome::Done
            }
            Err(e) => {
                let e = SyncError::from(e);
                warn!(error = %e, "Aurora alert sent but cooldown not recorded");
                StepOutcome::failed(&e)
            }
        }
    }
}

fn outcome<T>(result: &Result<T, WeatherError>) -> StepOutcome {
    match result {
        Ok(_) => StepOutcome::Done,
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}

#[async_trait]
impl SyncJob for SyncRoutine {
    #[instrument(skip(self, invocation), fields(task_id = invocation.id, reason = %invocation.reason))]
    async fn run(&self, invocation: &SyncInvocation) -> SyncResult<SyncReport> {
        self.run_at(DateTime::<FixedOffset>::from(Local::now())).await
    }
}
