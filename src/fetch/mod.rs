//! Static document fetching.
//!
//! This module issues the single HTTP GET the cheap extraction strategy runs
//! against, and classifies network-level failures.
//!
//! # Features
//!
//! - One request per call, no automatic retry
//! - Redirect following and gzip decoding
//! - Forced UTF-8 decoding (declared charsets on the target site are unreliable)
//! - Failure classes: network/timeout, non-200 status (with bounded body
//!   snippet), undecodable body
//!
//! Caching is the caller's responsibility; compose with
//! [`crate::cache::DocumentCache`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use chapter_core::fetch::{DocumentFetcher, FetchRequest, StaticFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = StaticFetcher::new()?;
//! let request = FetchRequest::new("https://example.com/series/foo/chapter-1", Duration::from_secs(25));
//! let html = fetcher.fetch(&request).await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod headers;

pub use client::{DEFAULT_CONNECT_TIMEOUT, StaticFetcher};
pub use error::{BODY_SNIPPET_LIMIT, FetchError};

use std::time::Duration;

use async_trait::async_trait;

/// Default per-request timeout for document fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(25);

/// Parameters for one document fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Document URL.
    pub url: String,
    /// User-Agent override; the fetcher default applies when `None`.
    pub user_agent: Option<String>,
    /// Clearance cookie, bare value or `cf_clearance=<value>`.
    pub auth_cookie: Option<String>,
    /// Extra cookies as a `k=v; k2=v2` header string.
    pub cookie_header: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl FetchRequest {
    /// Creates a request with no identity overrides.
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            user_agent: None,
            auth_cookie: None,
            cookie_header: None,
            timeout,
        }
    }
}

/// Outbound HTTP capability used by the static strategy.
///
/// Uses `async_trait` so the orchestrator can hold `Arc<dyn DocumentFetcher>`
/// and tests can substitute counting doubles.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetches the raw document body.
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError>;
}
