// ⚠️ Error Types
// Store faults are translated into domain outcomes by the workflow;
// only entry loading lets them through (wrapped in LoadError).

use crate::month::Month;
use thiserror::Error;

/// Result type for remote entry store calls
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures reaching or talking to the remote entry store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network failure or connection refused
    #[error("Network error: {0}")]
    Transport(String),

    /// No answer within the configured request timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Endpoint answered with a non-success HTTP status
    #[error("HTTP error! status: {0}")]
    Http(u16),

    /// Response body carried a top-level `error` field
    #[error("Remote error: {0}")]
    Remote(String),

    /// Body could not be read as a JSON object
    #[error("Invalid response from entry store: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Request timed out before the store answered
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Http(status.as_u16())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Why a month's entries could not be shown
///
/// Keeps "nothing recorded for this month" apart from "store unreachable"
/// so the caller can render the right message.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No entries found for {0}")]
    NoEntries(Month),

    #[error("Failed to load entries: {0}")]
    Unavailable(#[from] StoreError),
}

impl LoadError {
    /// Message shown on the input screen
    pub fn user_message(&self) -> String {
        match self {
            LoadError::NoEntries(month) => format!(
                "No entries found for {}. Please try a different month or check if the data is available in the spreadsheet.",
                month
            ),
            LoadError::Unavailable(_) => "Failed to load entries from the spreadsheet. Please check your internet connection and API configuration.".to_string(),
        }
    }
}
