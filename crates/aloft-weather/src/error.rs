//! Weather-layer error types.

use thiserror::Error;

/// Geolocation errors, a distinct kind from network/parse failures.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service unavailable")]
    Unavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// Non-success upstream response with an extractable exception message.
    #[error("{0}")]
    Upstream(String),

    /// Non-success upstream response without one.
    #[error("Upstream returned {status} {status_text}")]
    UpstreamStatus { status: u16, status_text: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Superseded by a newer refresh. Swallowed at the orchestrator
    /// boundary, never shown to the renderer.
    #[error("Superseded by a newer refresh")]
    Cancelled,
}

impl WeatherError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Kind-specific status line for the renderer.
    pub fn status_message(&self) -> String {
        match self {
            Self::Location(e) => format!("Location unavailable: {}", e),
            Self::Upstream(message) => format!("Forecast service error: {}", message),
            Self::UpstreamStatus {
                status,
                status_text,
            } => format!("Forecast service error: {} {}", status, status_text),
            Self::Parse(_) => "Could not read forecast data".to_string(),
            Self::Request(_) => "Could not build forecast request".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Cancelled => String::new(),
        }
    }
}
