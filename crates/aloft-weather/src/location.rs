//! Geolocation seam.
//!
//! The data layer only needs a coordinate; where it comes from (a platform
//! location service, a fixed configuration entry) is the host's concern and
//! plugs in behind `LocationProvider`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LocationError;

/// A raw geolocation fix, before cache-key coarsening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Accuracy/recency knobs passed to the provider.
#[derive(Debug, Clone, Copy)]
pub struct LocationRequest {
    /// Accept a cached fix up to this old.
    pub maximum_age: Duration,
    /// Ask the backend for a high-accuracy fix.
    pub high_accuracy: bool,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            maximum_age: Duration::from_secs(60),
            high_accuracy: false,
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self, request: LocationRequest)
        -> Result<Position, LocationError>;
}

/// Provider backed by a fixed, configured coordinate.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    position: Position,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: Position {
                latitude,
                longitude,
            },
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _request: LocationRequest,
    ) -> Result<Position, LocationError> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn fixed_location_returns_its_coordinate() {
        let provider = FixedLocation::new(60.17, 24.94);
        let position = provider
            .current_position(LocationRequest::default())
            .await
            .unwrap();
        assert_eq!(position.latitude, 60.17);
        assert_eq!(position.longitude, 24.94);
    }
}
