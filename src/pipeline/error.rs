//! Hard failures of an extraction call.

use thiserror::Error;

use crate::browser::BrowserError;

/// Failures that prevent an extraction call from producing any result.
///
/// Strategy failures that still allow a result (fetch errors, navigation
/// timeouts, empty documents) never appear here; they end up in
/// `ExtractionResult::diagnostic_note`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document URL cannot be parsed, so no strategy can run.
    #[error("invalid document URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The browser engine cannot be launched at all.
    #[error("browser strategy unavailable: {source}")]
    BrowserUnavailable {
        /// The launch failure.
        #[source]
        source: BrowserError,
    },

    /// The caller's deadline elapsed; no partial result is returned.
    #[error("extraction of {url} exceeded its {deadline_ms}ms deadline")]
    DeadlineExceeded {
        /// The document URL.
        url: String,
        /// The deadline that elapsed.
        deadline_ms: u64,
    },
}

impl PipelineError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}
