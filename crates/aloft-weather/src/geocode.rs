//! Reverse geocoding: coordinates to a human-readable place label.
//!
//! Lookups degrade to `None` on any failure; the caller falls back to
//! showing raw coordinates. Labels are cached per coarsened coordinate.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::cache::{BoundedCache, PLACE_CACHE_CAP};
use crate::error::WeatherError;
use crate::types::Coordinate;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "aloft/0.1.0";

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    name: Option<String>,
    error: Option<PlaceError>,
}

#[derive(Debug, Deserialize)]
struct PlaceError {
    message: String,
}

pub struct PlaceResolver {
    client: reqwest::Client,
    endpoint: String,
    cache: Mutex<BoundedCache<Coordinate, String>>,
}

impl PlaceResolver {
    pub fn new(endpoint: &str) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            cache: Mutex::new(BoundedCache::new(PLACE_CACHE_CAP)),
        })
    }

    /// Resolve a place label, serving repeats from the label cache.
    pub async fn resolve(&self, coordinate: Coordinate) -> Option<String> {
        if let Some(label) = self.cache.lock().get(&coordinate) {
            return Some(label.clone());
        }

        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", format!("{:.2}", coordinate.latitude())),
                ("lon", format!("{:.2}", coordinate.longitude())),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Place lookup request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Place lookup returned status {}", response.status());
            return None;
        }

        let body: PlaceResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Place lookup parse error: {}", e);
                return None;
            }
        };

        if let Some(error) = body.error {
            tracing::debug!("Place lookup error: {}", error.message);
            return None;
        }

        let name = body.name.filter(|n| !n.is_empty())?;
        self.cache.lock().put(coordinate, name.clone());
        tracing::info!("Resolved {} to {}", coordinate, name);
        Some(name)
    }
}
