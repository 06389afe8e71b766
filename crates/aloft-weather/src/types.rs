//! Domain types for the winds-aloft forecast layer.

use std::collections::BTreeMap;
use std::fmt;

use crate::bucket::TimeBucket;

/// Upstream parameter names.
pub mod param {
    pub const GEOM_HEIGHT: &str = "GeomHeight";
    pub const TEMPERATURE: &str = "Temperature";
    pub const WIND_DIRECTION: &str = "WindDirection";
    pub const WIND_SPEED_MS: &str = "WindSpeedMS";
    pub const MEDIUM_CLOUD_COVER: &str = "MediumCloudCover";
    pub const LOW_CLOUD_COVER: &str = "LowCloudCover";
    pub const WIND_GUST: &str = "WindGust";

    /// Requested at every level.
    pub const BASE: [&str; 4] = [GEOM_HEIGHT, TEMPERATURE, WIND_DIRECTION, WIND_SPEED_MS];

    /// Only meaningful for the surface query.
    pub const SURFACE_ONLY: [&str; 3] = [MEDIUM_CLOUD_COVER, LOW_CLOUD_COVER, WIND_GUST];
}

/// A latitude/longitude pair rounded to 2 decimal places.
///
/// Stored as centidegrees so equality and hashing are exact; the rounding
/// both coarsens the position for privacy and keeps cache keys stable
/// across small geolocation wobble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    lat_centi: i32,
    lon_centi: i32,
}

impl Coordinate {
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_centi: (latitude * 100.0).round() as i32,
            lon_centi: (longitude * 100.0).round() as i32,
        }
    }

    pub fn latitude(&self) -> f64 {
        f64::from(self.lat_centi) / 100.0
    }

    pub fn longitude(&self) -> f64 {
        f64::from(self.lon_centi) / 100.0
    }

    /// Space-joined form used inside `gml:pos`.
    pub fn as_pos(&self) -> String {
        format!("{:.2} {:.2}", self.latitude(), self.longitude())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2},{:.2}", self.latitude(), self.longitude())
    }
}

/// Meters above ground; 0 is the surface and selects a different upstream
/// stored query than the non-zero hybrid levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AltitudeLevel(u32);

impl AltitudeLevel {
    pub const SURFACE: AltitudeLevel = AltitudeLevel(0);

    pub fn meters(meters: u32) -> Self {
        Self(meters)
    }

    /// Level key from a reported geometric height.
    pub fn from_geom_height(value: f64) -> Self {
        Self(value.round().max(0.0) as u32)
    }

    pub fn is_surface(&self) -> bool {
        self.0 == 0
    }

    pub fn as_meters(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AltitudeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter name to finite numeric value.
pub type ParameterMap = BTreeMap<String, f64>;

/// Parsed multi-altitude forecast for one time bucket and coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    pub levels: BTreeMap<AltitudeLevel, ParameterMap>,
}

impl Forecast {
    pub fn level(&self, level: AltitudeLevel) -> Option<&ParameterMap> {
        self.levels.get(&level)
    }

    pub fn value(&self, level: AltitudeLevel, parameter: &str) -> Option<f64> {
        self.levels.get(&level).and_then(|map| map.get(parameter)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Cache identity: a forecast is keyed by its time bucket and coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub bucket: TimeBucket,
    pub coordinate: Coordinate,
}
