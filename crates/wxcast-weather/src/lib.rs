//! Weather data for wxcast
//!
//! Resolves city names with the Open-Meteo geocoding API and reduces
//! historical archive data to summary statistics.

pub mod aggregate;
pub mod archive;
pub mod geocode;
pub mod provider;
pub mod types;

pub use aggregate::{point_estimate, Aggregate, TemperatureAggregator};
pub use archive::{parse_daily, ArchiveClient};
pub use geocode::Geocoder;
pub use provider::WeatherProvider;
pub use types::*;
