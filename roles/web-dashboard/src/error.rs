use dashboard_metrics::HistoryError;
use thiserror::Error;

/// Reasons a refresh cycle is abandoned.
///
/// `Transport` and `Status` are endpoint failures; `Decode`, `MissingField`
/// and `MalformedHistory` mean an endpoint answered with something unusable.
/// Either way the cycle publishes nothing.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Invalid JSON from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} response is missing {field}")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("Malformed history log: {0}")]
    MalformedHistory(#[from] HistoryError),

    #[error("A refresh cycle is already running")]
    Busy,
}

impl DashboardError {
    /// Failures caused by an endpoint being unreachable or unhappy, as
    /// opposed to returning unusable data.
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
