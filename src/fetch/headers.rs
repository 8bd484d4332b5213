//! Request header and cookie helpers for the static fetcher.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use tracing::warn;
use url::Url;

/// Name of the bot-mitigation clearance cookie the site issues.
pub const CLEARANCE_COOKIE_NAME: &str = "cf_clearance";

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Normalizes a header value copied from a browser or query string.
///
/// URL-decodes (`+` as space), trims whitespace, then strips surrounding
/// double and single quotes.
#[must_use]
pub fn normalize_header_value(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    let decoded = urlencoding::decode(&plus_decoded)
        .map_or_else(|_| plus_decoded.clone(), std::borrow::Cow::into_owned);
    decoded
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

/// Parses a `k=v; k2=v2` cookie header into ordered pairs.
///
/// Segments without `=` are ignored.
#[must_use]
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Interprets the auth cookie input, accepting a bare value or `cf_clearance=<value>`.
#[must_use]
pub fn clearance_cookie(raw: &str) -> (String, String) {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("cf_clearance=") {
        Some(value) => (CLEARANCE_COOKIE_NAME.to_string(), value.to_string()),
        None => (CLEARANCE_COOKIE_NAME.to_string(), trimmed.to_string()),
    }
}

/// Returns the bare clearance value for an auth cookie input.
#[must_use]
pub fn clearance_value(raw: &str) -> String {
    clearance_cookie(raw).1
}

/// Builds the full cookie list: header pairs first, clearance cookie last (overriding).
#[must_use]
pub fn merge_cookies(
    cookie_header: Option<&str>,
    auth_cookie: Option<&str>,
) -> Vec<(String, String)> {
    let mut cookies = cookie_header.map(parse_cookie_string).unwrap_or_default();
    if let Some(raw) = auth_cookie.filter(|value| !value.trim().is_empty()) {
        let (name, value) = clearance_cookie(raw);
        cookies.retain(|(existing, _)| existing != &name);
        cookies.push((name, value));
    }
    cookies
}

/// Builds the request header map for a document fetch.
#[must_use]
pub fn build_request_headers(
    document_url: &Url,
    user_agent: &str,
    cookies: &[(String, String)],
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    insert_normalized(&mut headers, USER_AGENT, user_agent);

    let origin = document_url.origin().ascii_serialization();
    if origin != "null" {
        insert_normalized(&mut headers, REFERER, &format!("{origin}/"));
    }

    if !cookies.is_empty() {
        let joined = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&joined) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => warn!(count = cookies.len(), "Cookie header contains invalid characters; omitted"),
        }
    }
    headers
}

fn insert_normalized(headers: &mut HeaderMap, name: HeaderName, raw: &str) {
    let normalized = normalize_header_value(raw);
    match HeaderValue::from_str(&normalized) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "Header value contains invalid characters; omitted"),
    }
}
