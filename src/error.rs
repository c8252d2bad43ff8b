use thiserror::Error;

/// Failures produced by the translation pipeline. A chunk-level error
/// aborts the whole in-flight attempt; the page stays untouched and
/// remains retryable.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Missing or unusable provider configuration. User-actionable, so the
    /// message is surfaced verbatim.
    #[error("{0}")]
    Configuration(String),

    /// Transport failure or non-success status from the upstream provider.
    /// `status` is `None` when the request never produced a response.
    #[error("provider request failed: {detail}")]
    Provider { status: Option<u16>, detail: String },

    /// The provider answered with a success status but no usable content
    /// survived normalization.
    #[error("provider returned no usable translation content")]
    EmptyResponse,

    /// The background service task is no longer running.
    #[error("translation service is unavailable")]
    ServiceClosed,
}

impl From<reqwest::Error> for TranslateError {
    fn from(err: reqwest::Error) -> Self {
        TranslateError::Provider {
            status: err.status().map(|status| status.as_u16()),
            detail: err.to_string(),
        }
    }
}
