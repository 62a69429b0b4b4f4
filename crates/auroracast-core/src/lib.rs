pub mod config;
pub mod error;

pub use config::{
    AlertConfig, BackendConfig, Config, SyncConfig, ValidationResult, WidgetConfig,
    MIN_SYNC_INTERVAL_MINUTES,
};
pub use error::{DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt};

use anyhow::Result;

/// Initialize logging for the sync process.
///
/// Safe to call more than once; only the first subscriber is installed.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Auroracast core initialized");
    }
    Ok(())
}
