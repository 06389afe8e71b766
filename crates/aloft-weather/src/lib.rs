//! Winds-aloft forecast acquisition.
//!
//! Fetches multi-altitude forecast data (temperature, wind, cloud cover)
//! for the current time bucket from an FMI-style WFS, with a bounded
//! forecast cache, reverse-geocoded place labels, and refresh orchestration
//! that supersedes in-flight requests.

pub mod bucket;
pub mod cache;
pub mod client;
pub mod error;
pub mod geocode;
pub mod location;
pub mod orchestrator;
pub mod parser;
pub mod request;
pub mod scheduler;
pub mod service;
pub mod types;

pub use bucket::TimeBucket;
pub use cache::BoundedCache;
pub use client::WfsClient;
pub use error::{LocationError, WeatherError};
pub use geocode::PlaceResolver;
pub use location::{FixedLocation, LocationProvider, LocationRequest, Position};
pub use orchestrator::{FetchConfig, ForecastSink, Orchestrator};
pub use scheduler::RefreshScheduler;
pub use service::WeatherService;
pub use types::{param, AltitudeLevel, CacheKey, Coordinate, Forecast, ParameterMap};
