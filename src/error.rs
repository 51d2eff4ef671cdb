//! Error taxonomy for the dashboard engine.
//!
//! Every failure is recovered at the widget or data-access boundary: it is
//! logged and the UI stays in its last good state. Nothing here is fatal to
//! the page except a missing anti-forgery token or template at startup.

use crate::model::{LocationType, ThemeType};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    /// Non-2xx response or transport failure.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// A required identifier or time value was missing before a request was built.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no rendering strategy for location {location} with theme {theme}")]
    UnsupportedCombination {
        location: LocationType,
        theme: ThemeType,
    },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unknown {kind} code {code:?}")]
    UnknownCode { kind: &'static str, code: String },

    #[error("template {0} not found in page")]
    MissingTemplate(&'static str),

    #[error("anti-forgery token field {0} not found in page")]
    MissingCsrfToken(String),

    /// The page rejected a DOM operation.
    #[error("page update failed: {0}")]
    Dom(String),
}

impl DashboardError {
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::network(url, format!("request failed with status code {}", status))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
