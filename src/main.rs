use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use auroracast_core::Config;
use auroracast_store::{KeyValueStore, SqliteStore};
use auroracast_sync::{
    run_headless, AlertPolicy, BackgroundTask, LocalTimerHost, LogDispatcher,
    SchedulerRegistration, SyncRoutine,
};
use auroracast_weather::WeatherClient;
use auroracast_widget::WidgetSnapshot;

const HEADLESS_FLAG: &str = "--headless";

#[tokio::main]
async fn main() -> Result<()> {
    auroracast_core::init()?;

    let headless = std::env::args().skip(1).any(|arg| arg == HEADLESS_FLAG);
    let (config, _) = Config::load_validated()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(
        SqliteStore::new(config.store_path()).context("Failed to open shared store")?,
    );
    log_widget_age(store.as_ref(), &config);

    let client = WeatherClient::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_secs),
    )?;
    let routine = SyncRoutine::new(Arc::new(client), store, Arc::new(LogDispatcher))
        .with_policy(AlertPolicy::from(&config.alerts))
        .with_forecast_days(config.backend.forecast_days);

    let host = Arc::new(LocalTimerHost::new());
    let task = BackgroundTask::new(
        Arc::new(routine),
        host.clone(),
        Duration::from_secs(config.sync.time_budget_secs),
    );
    task.register(&SchedulerRegistration::from(&config.sync))?;

    if headless {
        if !config.sync.allow_headless {
            anyhow::bail!("Headless runs are disabled in config");
        }
        tracing::info!("Auroracast headless sync");
        run_headless(&task).await?;
        return Ok(());
    }

    let cancel = host.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            cancel.cancel();
        }
    });

    tracing::info!(
        config_dir = %config.config_dir.display(),
        "Auroracast sync started"
    );
    host.run(&task).await?;
    tracing::info!("Auroracast sync stopped");

    Ok(())
}

/// Log how old the payload the widget currently shows is.
fn log_widget_age(store: &dyn KeyValueStore, config: &Config) {
    let snapshot = match WidgetSnapshot::read(store) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read widget payload");
            return;
        }
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let stale_after = Duration::from_secs(u64::from(config.widget.stale_after_minutes) * 60);
    match snapshot.minutes_since_update(now_ms) {
        None => tracing::info!("No widget payload published yet"),
        Some(minutes) if snapshot.is_stale(now_ms, stale_after) => {
            tracing::warn!(minutes, "Widget payload is stale")
        }
        Some(minutes) => tracing::debug!(minutes, "Widget payload is fresh"),
    }
}
