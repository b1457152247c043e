//! Weather service for SkyCast
//!
//! Provides weather data via the WeatherAPI.com REST API, automatic location
//! detection with an ordered fallback chain, and the decorative day/night
//! progress engine.

pub mod daynight;
pub mod error;
#[cfg(target_os = "linux")]
pub mod geoclue;
pub mod ipgeo;
pub mod location;
pub mod provider;
pub mod types;
pub mod units;

pub use daynight::{
    parse_clock_time, ClockParseError, DayNightError, DayNightState, DayNightTicker, SolarEvent,
    SolarWindow, TimeOfDay,
};
pub use error::ApiError;
pub use location::{DeviceLocator, LocationResolver, LocationStrategy, PositionRequest};
pub use provider::WeatherApiClient;
pub use types::*;
