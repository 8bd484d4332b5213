//! Deep search over embedded JSON state.
//!
//! The walk is a visitor over [`serde_json::Value`]; the two decisions it makes
//! ("is this string an image URL", "is this key a content list") are plain
//! functions so they can be tested on their own.

use serde_json::Value;

/// Keys whose values hold the ordered page images of a chapter.
pub const CONTENT_LIST_KEYS: [&str; 2] = ["images", "pages"];

/// Key holding the build identifier of the embedded state.
pub const BUILD_ID_KEY: &str = "buildId";

/// Recognized image file extensions (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// A URL string found in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonCandidate {
    /// The string value as found.
    pub url: String,
    /// Whether it sat inside a content-list key.
    pub in_content_list: bool,
}

/// Output of a deep search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonScan {
    /// Image-looking URLs in document order.
    pub candidates: Vec<JsonCandidate>,
    /// First string-valued build identifier encountered.
    pub build_id: Option<String>,
}

/// Position of the current node relative to a content-list key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListContext {
    /// Not under a content-list key.
    Outside,
    /// Directly inside a content-list value (or nested arrays of it).
    List,
    /// Inside an object element of a content list (one page record).
    Record,
}

/// Returns true if `value` starts with an HTTP scheme and its path ends with an image extension.
///
/// Query strings and fragments are ignored for the extension check.
#[must_use]
pub fn looks_like_image_url(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }
    let path_end = lower.find(['?', '#']).unwrap_or(lower.len());
    let path = &lower[..path_end];
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Returns true if `key` names a content list.
#[must_use]
pub fn is_content_list_key(key: &str) -> bool {
    CONTENT_LIST_KEYS
        .iter()
        .any(|name| key.eq_ignore_ascii_case(name))
}

/// Parses `text` as JSON and deep-searches it.
///
/// # Errors
///
/// Returns the parse error; callers treat it as an empty sub-result.
pub fn deep_search_json(text: &str) -> Result<JsonScan, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(deep_search_value(&value))
}

/// Deep-searches an already parsed value.
#[must_use]
pub fn deep_search_value(value: &Value) -> JsonScan {
    let mut scan = JsonScan::default();
    visit(value, None, ListContext::Outside, &mut scan);
    scan
}

fn visit(value: &Value, key: Option<&str>, context: ListContext, scan: &mut JsonScan) {
    match value {
        Value::Object(map) => {
            let inner = match context {
                ListContext::List => ListContext::Record,
                ListContext::Record | ListContext::Outside => ListContext::Outside,
            };
            for (child_key, child) in map {
                if child_key == BUILD_ID_KEY
                    && scan.build_id.is_none()
                    && let Value::String(build_id) = child
                    && !build_id.trim().is_empty()
                {
                    scan.build_id = Some(build_id.trim().to_string());
                    continue;
                }
                let child_context = if is_content_list_key(child_key) {
                    ListContext::List
                } else if inner == ListContext::Record && !child.is_string() {
                    ListContext::Outside
                } else {
                    inner
                };
                visit(child, Some(child_key), child_context, scan);
            }
        }
        Value::Array(items) => {
            let inner = match context {
                ListContext::List => ListContext::List,
                ListContext::Record | ListContext::Outside => ListContext::Outside,
            };
            for item in items {
                visit(item, key, inner, scan);
            }
        }
        Value::String(text) => {
            if looks_like_image_url(text) {
                scan.candidates.push(JsonCandidate {
                    url: text.trim().to_string(),
                    in_content_list: context != ListContext::Outside,
                });
            }
        }
        Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_looks_like_image_url() {
        assert!(looks_like_image_url("https://cdn.site/a/01.jpg"));
        assert!(looks_like_image_url("http://cdn.site/a/01.JPEG"));
        assert!(looks_like_image_url("https://cdn.site/a/01.webp?w=800"));
        assert!(!looks_like_image_url("//cdn.site/a/01.jpg"));
        assert!(!looks_like_image_url("/a/01.jpg"));
        assert!(!looks_like_image_url("https://cdn.site/a/01.gif"));
        assert!(!looks_like_image_url("https://cdn.site/page"));
    }

    #[test]
    fn test_is_content_list_key() {
        assert!(is_content_list_key("images"));
        assert!(is_content_list_key("Pages"));
        assert!(!is_content_list_key("thumbnail"));
    }

    #[test]
    fn test_deep_search_finds_nested_urls_in_document_order() {
        let value = json!({
            "props": {
                "pageProps": {
                    "cover": "https://cdn.site/cover.png",
                    "chapter": {
                        "images": [
                            "https://cdn.site/chapter_1/01.jpg",
                            "https://cdn.site/chapter_1/02.jpg"
                        ]
                    }
                }
            }
        });
        let scan = deep_search_value(&value);
        let urls: Vec<_> = scan.candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.site/cover.png",
                "https://cdn.site/chapter_1/01.jpg",
                "https://cdn.site/chapter_1/02.jpg"
            ]
        );
        assert!(!scan.candidates[0].in_content_list);
        assert!(scan.candidates[1].in_content_list);
        assert!(scan.candidates[2].in_content_list);
    }

    #[test]
    fn test_page_records_inside_content_list_are_flagged() {
        let value = json!({
            "pages": [
                {"url": "https://cdn.site/p/01.png", "meta": {"preview": "https://cdn.site/p/01-small.png"}},
                {"url": "https://cdn.site/p/02.png"}
            ]
        });
        let scan = deep_search_value(&value);
        let flagged: Vec<_> = scan
            .candidates
            .iter()
            .map(|c| (c.url.as_str(), c.in_content_list))
            .collect();
        assert_eq!(
            flagged,
            vec![
                ("https://cdn.site/p/01.png", true),
                ("https://cdn.site/p/01-small.png", false),
                ("https://cdn.site/p/02.png", true),
            ]
        );
    }

    #[test]
    fn test_build_id_noted_but_not_a_candidate() {
        let scan = deep_search_json(r#"{"buildId":"abc123","props":{"x":"https://cdn.site/a.jpg"}}"#)
            .unwrap();
        assert_eq!(scan.build_id.as_deref(), Some("abc123"));
        assert_eq!(scan.candidates.len(), 1);
    }

    #[test]
    fn test_first_build_id_wins() {
        let scan = deep_search_json(r#"{"buildId":"first","nested":{"buildId":"second"}}"#).unwrap();
        assert_eq!(scan.build_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_non_string_build_id_ignored() {
        let scan = deep_search_json(r#"{"buildId":42}"#).unwrap();
        assert!(scan.build_id.is_none());
    }

    #[test]
    fn test_parse_failure_is_reported() {
        assert!(deep_search_json("{not json").is_err());
    }

    #[test]
    fn test_scalar_root_yields_nothing() {
        let scan = deep_search_json("null").unwrap();
        assert_eq!(scan, JsonScan::default());
    }
}
