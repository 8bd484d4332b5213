//! Error types for the static fetcher.
//!
//! Each variant carries the URL it concerns so the orchestrator can fold the
//! failure into a diagnostic note without extra context.

use thiserror::Error;

/// Maximum number of characters of an error response body retained for diagnostics.
pub const BODY_SNIPPET_LIMIT: usize = 1500;

/// Errors that can occur while fetching a raw document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before a complete response arrived.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Response status other than 200.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Leading part of the response body, bounded by [`BODY_SNIPPET_LIMIT`].
        body_snippet: String,
    },

    /// Response body is mostly undecodable as UTF-8.
    #[error("response from {url} could not be decoded as UTF-8 text")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
    },

    /// The provided URL is malformed or not HTTP(S).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Why construction failed.
        reason: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error, truncating the body to the snippet limit.
    pub fn http_status(url: impl Into<String>, status: u16, body: &str) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body_snippet: truncate_chars(body, BODY_SNIPPET_LIMIT).to_string(),
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>) -> Self {
        Self::Decode { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Classifies a reqwest send/body error as timeout or network failure.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Stable short label for the failure class.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => "network_error",
            Self::HttpStatus { .. } => "http_status_error",
            Self::Decode { .. } => "decode_error",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::ClientBuild { .. } => "client_error",
        }
    }

    /// Returns the HTTP status for `HttpStatus` errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
