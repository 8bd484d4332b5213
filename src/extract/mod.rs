//! Candidate extraction from raw or rendered documents.
//!
//! Two independent techniques run over every document and their results are
//! concatenated (markup first) before classification:
//!
//! - **Markup scan** - every `<img>`, reading lazy-load attributes before `src`,
//!   normalized to absolute URLs against the document URL.
//! - **Structured-data deep search** - the embedded JSON payload
//!   (`script#__NEXT_DATA__`) walked recursively for image URLs; the build
//!   identifier found there is noted for the browser's secondary endpoint.
//!
//! A missing or unparseable payload yields an empty sub-result without
//! affecting the markup scan.

mod markup;
mod normalize;
pub mod structured;

pub use markup::{EMBEDDED_PAYLOAD_ID, document_title, embedded_payload, scan_image_sources};
pub use normalize::normalize_asset_url;
pub use structured::{
    JsonCandidate, JsonScan, deep_search_json, deep_search_value, is_content_list_key,
    looks_like_image_url,
};

use scraper::Html;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Which technique produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// `<img>` scan of the statically fetched document.
    StaticMarkup,
    /// Embedded JSON of the statically fetched document.
    StaticStructuredData,
    /// `<img>` scan of the rendered DOM.
    BrowserDom,
    /// Embedded JSON of the rendered DOM.
    BrowserStructuredData,
    /// JSON body of the build-identifier data endpoint.
    BrowserSecondaryEndpoint,
}

impl CandidateOrigin {
    /// Stable label used in logs and diagnostic notes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaticMarkup => "static_markup",
            Self::StaticStructuredData => "static_structured_data",
            Self::BrowserDom => "browser_dom",
            Self::BrowserStructuredData => "browser_structured_data",
            Self::BrowserSecondaryEndpoint => "browser_secondary_endpoint",
        }
    }
}

/// A raw string that might be a content asset URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAsset {
    /// Absolute URL (already normalized against the document URL).
    pub raw_url: String,
    /// Technique that produced it.
    pub origin: CandidateOrigin,
    /// Found under a content-list key of structured data.
    pub in_content_list: bool,
}

impl CandidateAsset {
    /// Creates a candidate outside any content list.
    #[must_use]
    pub fn new(raw_url: impl Into<String>, origin: CandidateOrigin) -> Self {
        Self {
            raw_url: raw_url.into(),
            origin,
            in_content_list: false,
        }
    }
}

/// Everything one pass over a document produced.
#[derive(Debug, Clone, Default)]
pub struct DocumentScan {
    /// Markup candidates followed by structured-data candidates.
    pub candidates: Vec<CandidateAsset>,
    /// Declared document title.
    pub title: Option<String>,
    /// Build identifier from the embedded payload.
    pub build_id: Option<String>,
    /// Recoverable problems encountered (for the diagnostic note).
    pub notes: Vec<String>,
}

/// Runs both techniques over `html`, tagging candidates with the given origins.
#[must_use]
pub fn scan_document(
    html: &str,
    document_url: &Url,
    markup_origin: CandidateOrigin,
    structured_origin: CandidateOrigin,
) -> DocumentScan {
    let document = Html::parse_document(html);
    let mut scan = DocumentScan {
        title: document_title(&document),
        ..DocumentScan::default()
    };

    scan.candidates.extend(
        scan_image_sources(&document)
            .iter()
            .filter_map(|raw| normalize_asset_url(raw, document_url))
            .map(|url| CandidateAsset::new(url, markup_origin)),
    );
    let markup_count = scan.candidates.len();

    match embedded_payload(&document) {
        None => debug!(origin = structured_origin.as_str(), "no embedded JSON payload"),
        Some(payload) => match deep_search_json(&payload) {
            Ok(json) => {
                scan.build_id = json.build_id;
                scan.candidates.extend(json.candidates.into_iter().filter_map(|found| {
                    normalize_asset_url(&found.url, document_url).map(|url| CandidateAsset {
                        raw_url: url,
                        origin: structured_origin,
                        in_content_list: found.in_content_list,
                    })
                }));
            }
            Err(error) => {
                debug!(error = %error, "embedded JSON payload failed to parse");
                scan.notes.push(format!(
                    "{}: embedded JSON parse failed ({error})",
                    structured_origin.as_str()
                ));
            }
        },
    }

    debug!(
        markup = markup_count,
        structured = scan.candidates.len() - markup_count,
        build_id = scan.build_id.is_some(),
        "document scanned"
    );
    scan
}

/// Static-pass extraction over a fetched document.
#[must_use]
pub fn extract_static(html: &str, document_url: &Url) -> DocumentScan {
    scan_document(
        html,
        document_url,
        CandidateOrigin::StaticMarkup,
        CandidateOrigin::StaticStructuredData,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc_url() -> Url {
        Url::parse("https://site.example/series/foo/chapter-3").unwrap()
    }

    #[test]
    fn test_extract_static_markup_then_structured() {
        let html = r#"<html><head><title>Foo Chapter 3</title></head><body>
            <img data-src="//cdn.site/storage/upload/chapter_3/01.jpg">
            <img src="/icons/like.png">
            <script id="__NEXT_DATA__" type="application/json">
              {"buildId":"b7","props":{"images":["https://cdn.site/storage/upload/chapter_3/02.jpg"]}}
            </script></body></html>"#;
        let scan = extract_static(html, &doc_url());

        let urls: Vec<_> = scan.candidates.iter().map(|c| c.raw_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.site/storage/upload/chapter_3/01.jpg",
                "https://site.example/icons/like.png",
                "https://cdn.site/storage/upload/chapter_3/02.jpg",
            ]
        );
        assert_eq!(scan.candidates[0].origin, CandidateOrigin::StaticMarkup);
        assert_eq!(scan.candidates[2].origin, CandidateOrigin::StaticStructuredData);
        assert!(scan.candidates[2].in_content_list);
        assert_eq!(scan.build_id.as_deref(), Some("b7"));
        assert_eq!(scan.title.as_deref(), Some("Foo Chapter 3"));
        assert!(scan.notes.is_empty());
    }

    #[test]
    fn test_bad_payload_keeps_markup_results_and_notes_failure() {
        let html = r#"<img src="https://cdn.site/a/chapter_1/01.png">
            <script id="__NEXT_DATA__">{"broken": </script>"#;
        let scan = extract_static(html, &doc_url());
        assert_eq!(scan.candidates.len(), 1);
        assert_eq!(scan.notes.len(), 1);
        assert!(scan.notes[0].contains("static_structured_data"));
        assert!(scan.build_id.is_none());
    }

    #[test]
    fn test_scan_document_uses_given_origins() {
        let html = r#"<img src="https://cdn.site/x.jpg">"#;
        let scan = scan_document(
            html,
            &doc_url(),
            CandidateOrigin::BrowserDom,
            CandidateOrigin::BrowserStructuredData,
        );
        assert_eq!(scan.candidates[0].origin, CandidateOrigin::BrowserDom);
    }

    #[test]
    fn test_origin_labels() {
        assert_eq!(CandidateOrigin::BrowserSecondaryEndpoint.as_str(), "browser_secondary_endpoint");
        assert_eq!(
            serde_json::to_string(&CandidateOrigin::StaticMarkup).unwrap(),
            "\"static_markup\""
        );
    }
}
