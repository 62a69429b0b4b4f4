use auroracast_store::StoreError;
use auroracast_weather::WeatherError;
use auroracast_widget::EncodeError;
use thiserror::Error;

use crate::notify::DispatchError;

/// Errors from one sync invocation
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Weather source failed: {0}")]
    Weather(#[from] WeatherError),

    #[error("Store write failed: {0}")]
    Store(#[from] StoreError),

    #[error("Widget payload could not be built: {0}")]
    Encode(#[from] EncodeError),

    #[error("Notification dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Sync exceeded its {seconds}s budget")]
    Overrun { seconds: u64 },

    #[error("Sync task panicked: {0}")]
    Panicked(String),

    #[error("Host scheduler error: {0}")]
    Host(String),
}

impl SyncError {
    /// Whether the next trigger can be expected to succeed without intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Weather(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            Self::Dispatch(_) | Self::Overrun { .. } => true,
            Self::Encode(_) | Self::Panicked(_) | Self::Host(_) => false,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use auroracast_core::{DatabaseError, NetworkError};

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::Weather(WeatherError::Network(NetworkError::Timeout)).is_retryable());
        assert!(!SyncError::Weather(WeatherError::Api("bad request".into())).is_retryable());
        assert!(SyncError::Store(StoreError::Database(DatabaseError::Busy("locked".into())))
            .is_retryable());
        assert!(SyncError::Overrun { seconds: 25 }.is_retryable());
        assert!(!SyncError::Panicked("boom".into()).is_retryable());
    }

    #[test]
    fn test_overrun_message() {
        assert_eq!(
            SyncError::Overrun { seconds: 25 }.to_string(),
            "Sync exceeded its 25s budget"
        );
    }
}
