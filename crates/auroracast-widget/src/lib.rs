//! Cross-process widget bridge
//!
//! The sync task encodes fetched data into a [`WidgetPayload`] and publishes
//! it into the widget namespace of the shared store; the renderer process
//! reads it back through [`WidgetSnapshot`].

pub mod encoder;
pub mod payload;
pub mod reader;

pub use encoder::{encode, publish, EncodeError};
pub use payload::{
    AstronomyBlock, AuroraBlock, Customization, DailyEntry, HourlyEntry, ThemeMode,
    WidgetPayload, SCHEMA_VERSION,
};
pub use reader::{Background, WidgetSnapshot, DEFAULT_STALE_AFTER, TEMPERATURE_PLACEHOLDER};
