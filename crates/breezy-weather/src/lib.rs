//! Weather data for Breezy
//!
//! Fetches forecasts from the weather provider, caches them per query
//! string, derives unit-specific views and classifies readings.

pub mod cache;
pub mod location;
pub mod provider;
pub mod readings;
pub mod service;
pub mod types;
pub mod units;

pub use cache::{Clock, ManualClock, SystemClock, WeatherCache, DEFAULT_TTL};
pub use location::{
    current_location_query, ConfiguredGeolocator, Coordinates, FixedGeolocator, Geolocator,
    IpGeolocator,
};
pub use provider::{ForecastOptions, ForecastSource, WeatherProvider};
pub use readings::{moon_phase_display, AirQualityLevel, AlertSeverity, MoonPhase, UvLevel, VisibilityLevel};
pub use service::WeatherService;
pub use types::*;
pub use units::{labels, UnitLabels, WeatherView};
