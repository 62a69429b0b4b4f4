//! Background synchronization for Auroracast
//!
//! A registered [`BackgroundTask`] runs the [`SyncRoutine`] on every host
//! trigger, periodic or headless. Each pass rehydrates settings, location and
//! cooldowns from the shared store, fetches weather and aurora data,
//! publishes the widget payload and sends any alerts that are due.

pub mod alerts;
pub mod cooldown;
pub mod error;
pub mod notify;
pub mod routine;
pub mod scheduler;
pub mod settings;

pub use alerts::{AlertDecision, AlertPolicy};
pub use cooldown::{AlertCooldownState, CooldownStore};
pub use error::{SyncError, SyncResult};
pub use notify::{DispatchError, LogDispatcher, NotificationDispatcher};
pub use routine::{load_state, StepOutcome, SyncReport, SyncRoutine, SyncState};
pub use scheduler::{
    run_headless, BackgroundTask, HostScheduler, InvocationReason, LocalTimerHost,
    SchedulerRegistration, SyncInvocation, SyncJob,
};
pub use settings::{Settings, SettingsSource, StoreSettingsSource};
