//! Weather and aurora data for Auroracast
//!
//! Domain types, the aggregation backend client, and the small amount of
//! astronomy/aurora/theme logic needed to fill gaps in backend responses.

pub mod astronomy;
pub mod aurora;
pub mod client;
pub mod theme;
pub mod types;

pub use client::{WeatherClient, WeatherSource};
pub use types::*;
