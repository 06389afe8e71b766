//! HTTP client for the upstream forecast feature service.

use std::time::Duration;

use tracing::instrument;

use crate::error::WeatherError;
use crate::parser::{extract_exception_text, parse_forecast};
use crate::request::GetFeatureRequest;
use crate::types::Forecast;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WfsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WfsClient {
    /// Build a client against the given WFS endpoint (tests point this at
    /// a mock server).
    pub fn new(endpoint: &str) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// POST the batched request and decode the response.
    #[instrument(skip(self, request), level = "info")]
    pub async fn fetch(&self, request: &GetFeatureRequest) -> Result<Forecast, WeatherError> {
        let body = request.to_xml()?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Prefer the human-readable exception over the bare status.
            if let Some(message) = extract_exception_text(&text) {
                return Err(WeatherError::Upstream(message));
            }
            return Err(WeatherError::UpstreamStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let text = response.text().await?;
        parse_forecast(&text)
    }
}
