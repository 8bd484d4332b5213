//! Markup scan over a parsed HTML document.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Element id of the embedded JSON state payload.
pub const EMBEDDED_PAYLOAD_ID: &str = "__NEXT_DATA__";

/// Image attributes in read priority: lazy-load attributes before the eager `src`.
pub const IMAGE_SOURCE_ATTRIBUTES: [&str; 4] = ["data-src", "data-lazy-src", "data-original", "src"];

fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("img"));
static PAYLOAD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(&format!("script#{EMBEDDED_PAYLOAD_ID}")));
static OG_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(r#"meta[property="og:title"]"#));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("title"));

/// Returns the raw source reference of every `<img>`, in document order.
///
/// Values are not yet normalized; elements without any usable attribute are skipped.
#[must_use]
pub fn scan_image_sources(document: &Html) -> Vec<String> {
    document
        .select(&IMG_SELECTOR)
        .filter_map(preferred_source)
        .collect()
}

fn preferred_source(element: ElementRef<'_>) -> Option<String> {
    IMAGE_SOURCE_ATTRIBUTES.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Returns the text of the embedded JSON payload script, if present.
#[must_use]
pub fn embedded_payload(document: &Html) -> Option<String> {
    document
        .select(&PAYLOAD_SELECTOR)
        .next()
        .map(|script| script.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
}

/// Returns the document's declared title: `og:title` first, then `<title>`.
#[must_use]
pub fn document_title(document: &Html) -> Option<String> {
    let og = document
        .select(&OG_TITLE_SELECTOR)
        .find_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace);
    og.filter(|title| !title.is_empty()).or_else(|| {
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|title| collapse_whitespace(&title.text().collect::<String>()))
            .filter(|title| !title.is_empty())
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_attribute_preferred_over_src() {
        let html = Html::parse_document(
            r#"<img src="/placeholder.gif" data-src="//cdn.site/real/01.jpg">
               <img src="/eager.jpg">
               <img data-lazy-src=" /lazy.jpg ">
               <img alt="no source">"#,
        );
        assert_eq!(
            scan_image_sources(&html),
            vec!["//cdn.site/real/01.jpg", "/eager.jpg", "/lazy.jpg"]
        );
    }

    #[test]
    fn test_blank_lazy_attribute_falls_back_to_src() {
        let html = Html::parse_document(r#"<img data-src="  " src="/a.png">"#);
        assert_eq!(scan_image_sources(&html), vec!["/a.png"]);
    }

    #[test]
    fn test_embedded_payload_found_by_id() {
        let html = Html::parse_document(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{"buildId":"b1"}</script></body></html>"#,
        );
        assert_eq!(embedded_payload(&html).as_deref(), Some(r#"{"buildId":"b1"}"#));
    }

    #[test]
    fn test_embedded_payload_absent() {
        let html = Html::parse_document("<html><script>var x = 1;</script></html>");
        assert!(embedded_payload(&html).is_none());
    }

    #[test]
    fn test_document_title_prefers_og_title() {
        let html = Html::parse_document(
            r#"<html><head><title>Site | Home</title>
               <meta property="og:title" content="Nano Machine   Chapter 291"></head></html>"#,
        );
        assert_eq!(document_title(&html).as_deref(), Some("Nano Machine Chapter 291"));
    }

    #[test]
    fn test_document_title_falls_back_to_title_element() {
        let html = Html::parse_document("<html><head><title>\n Chapter 7 \n</title></head></html>");
        assert_eq!(document_title(&html).as_deref(), Some("Chapter 7"));
    }

    #[test]
    fn test_document_title_missing() {
        let html = Html::parse_document("<html><body></body></html>");
        assert!(document_title(&html).is_none());
    }
}
