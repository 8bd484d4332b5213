//! Asset URL normalization against the document URL.

use url::Url;

/// Resolves a raw asset reference to an absolute URL string.
///
/// - absolute `http(s)://` values are returned unchanged
/// - protocol-relative `//host/path` takes the document's scheme
/// - root-relative and path-relative values are joined with the document URL
///
/// Returns `None` for empty values and inline `data:`/`blob:`/`javascript:` references.
#[must_use]
pub fn normalize_asset_url(raw: &str, document_url: &Url) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let lower = value.to_ascii_lowercase();
    if ["data:", "blob:", "javascript:", "about:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return None;
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("{}:{value}", document_url.scheme()));
    }
    document_url.join(value).ok().map(String::from)
}
