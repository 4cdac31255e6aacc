//! Lookup error types.

/// Errors from portal lookups.
///
/// The console never shows these to the user. The dispatcher logs them and
/// renders the module as having no results.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Portal operation being called.
        endpoint: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The portal returned a non-2xx status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Portal operation being called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
    /// JSON body could not be decoded.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        /// Portal operation being called.
        endpoint: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// An element the adapter depends on is missing from the page.
    #[error("unexpected markup from {endpoint}: {reason}")]
    Markup {
        /// Portal operation being called.
        endpoint: String,
        /// What was missing.
        reason: String,
    },
    /// The CAPTCHA solver failed to run.
    #[error("captcha solver failed: {0}")]
    Captcha(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl LookupError {
    pub(crate) fn markup(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::Markup {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}
