//! reqwest-backed [`DocumentFetcher`] implementation.

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::FetchError;
use super::headers::{build_request_headers, merge_cookies};
use super::{DocumentFetcher, FetchRequest};
use crate::user_agent::effective_user_agent;

/// Default connect timeout for document fetches.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Single-shot HTTP GET fetcher for chapter documents.
///
/// Issues exactly one request per call (no retry), follows redirects, and
/// always decodes the body as UTF-8 regardless of the declared charset,
/// replacing stray invalid sequences.
/// Create once and reuse to benefit from connection pooling.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
    default_user_agent: String,
}

impl StaticFetcher {
    /// Creates a fetcher with the default connect timeout and User-Agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(DEFAULT_CONNECT_TIMEOUT, None)
    }

    /// Creates a fetcher with explicit connect timeout and default User-Agent override.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when the HTTP client cannot be constructed.
    #[instrument(level = "debug", skip(default_user_agent))]
    pub fn with_settings(
        connect_timeout: Duration,
        default_user_agent: Option<&str>,
    ) -> Result<Self, FetchError> {
        // Some sandboxed environments panic while reading system proxy settings.
        let built = catch_unwind(AssertUnwindSafe(|| {
            Client::builder()
                .connect_timeout(connect_timeout)
                .gzip(true)
                .build()
        }));
        let client = match built {
            Ok(Ok(client)) => client,
            Ok(Err(error)) => {
                return Err(FetchError::ClientBuild {
                    reason: error.to_string(),
                });
            }
            Err(_) => {
                warn!("HTTP client construction panicked; retrying without system proxy lookup");
                Client::builder()
                    .connect_timeout(connect_timeout)
                    .gzip(true)
                    .no_proxy()
                    .build()
                    .map_err(|error| FetchError::ClientBuild {
                        reason: error.to_string(),
                    })?
            }
        };

        Ok(Self {
            client,
            default_user_agent: effective_user_agent(default_user_agent),
        })
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let url = Url::parse(&request.url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| FetchError::invalid_url(&request.url))?;

        let user_agent = request
            .user_agent
            .as_deref()
            .map_or_else(|| self.default_user_agent.clone(), |ua| effective_user_agent(Some(ua)));
        let cookies = merge_cookies(request.cookie_header.as_deref(), request.auth_cookie.as_deref());
        let headers = build_request_headers(&url, &user_agent, &cookies);

        debug!(cookies = cookies.len(), timeout_ms = request.timeout.as_millis(), "sending GET");
        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|error| FetchError::from_transport(&request.url, error))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::from_transport(&request.url, error))?;

        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "non-200 response");
            return Err(FetchError::http_status(
                &request.url,
                status.as_u16(),
                &String::from_utf8_lossy(&body),
            ));
        }

        let text = decode_body(&body).ok_or_else(|| FetchError::decode(&request.url))?;
        debug!(bytes = text.len(), "document fetched");
        Ok(text)
    }
}

/// Forces UTF-8, replacing invalid sequences.
///
/// Returns `None` when more than half of the decoded characters are replacements.
fn decode_body(body: &[u8]) -> Option<String> {
    match String::from_utf8_lossy(body) {
        Cow::Borrowed(text) => Some(text.to_owned()),
        Cow::Owned(text) => {
            let total = text.chars().count();
            let replaced = text
                .chars()
                .filter(|&c| c == char::REPLACEMENT_CHARACTER)
                .count();
            if replaced * 2 > total {
                return None;
            }
            warn!(replaced, total, "body is not valid UTF-8; invalid sequences replaced");
            Some(text)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_replaces_stray_invalid_bytes() {
        let mut body = "<p>الفصل 3</p>".as_bytes().to_vec();
        body.insert(3, 0xff);
        let text = decode_body(&body).unwrap();
        assert_eq!(text, "<p>\u{fffd}الفصل 3</p>");
    }

    #[test]
    fn test_decode_body_rejects_mostly_undecodable_bytes() {
        assert!(decode_body(&[0x3c, 0xff, 0xfe, 0xc7, 0xfd]).is_none());
        assert_eq!(decode_body(b"").as_deref(), Some(""));
    }

    #[test]
    fn test_static_fetcher_builds_with_defaults() {
        let fetcher = StaticFetcher::new().unwrap();
        assert!(fetcher.default_user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_static_fetcher_uses_override_user_agent() {
        let fetcher =
            StaticFetcher::with_settings(Duration::from_secs(5), Some("Custom/2.0")).unwrap();
        assert_eq!(fetcher.default_user_agent, "Custom/2.0");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url_without_network() {
        let fetcher = StaticFetcher::new().unwrap();
        let request = FetchRequest::new("ftp://example.com/file", Duration::from_secs(1));
        let error = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(error, FetchError::InvalidUrl { .. }), "got {error:?}");
    }

    #[tokio::test]
    async fn test_fetch_rejects_unparseable_url() {
        let fetcher = StaticFetcher::new().unwrap();
        let request = FetchRequest::new("not a url", Duration::from_secs(1));
        assert!(matches!(
            fetcher.fetch(&request).await,
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
