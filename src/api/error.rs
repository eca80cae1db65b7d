//! Error taxonomy for calls to the clinical-records API.

use serde_json::Value;

/// Every remote failure is recoverable from the controller's point of view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Clinical records API is not reachable at {0}")]
    Unreachable(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Build an `Http` error from a non-2xx response body.
    ///
    /// Best effort: a JSON body with a `message`, `error`, `title` or `detail`
    /// string supplies the message; anything else yields a generic one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body)
            .unwrap_or_else(|| format!("Request failed with HTTP status {status}"));
        Self::Http { status, message }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "title", "detail"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
