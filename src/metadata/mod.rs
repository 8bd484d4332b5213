//! Chapter number and title resolution.
//!
//! Numbers come from an ordered pattern chain: a pattern anchored on the literal
//! chapter marker, then the first number-like token. The chain runs against the
//! declared title first and the URL path second. Nothing here fails; an
//! unresolvable number is simply `None`.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;
use url::Url;

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Number-extraction patterns in priority order; capture group 1 holds the number.
static SEQUENCE_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        compile_static_regex(r"(?i)chapter[\s\-_/:]*([0-9]+(?:\.[0-9]+)?)"),
        compile_static_regex(r"([0-9]+(?:\.[0-9]+)?)"),
    ]
});

/// Title and ordinal of one chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChapterIdentity {
    /// Declared title, or a readable rendering of the last URL path segment.
    pub title: Option<String>,
    /// Chapter number; fractional values such as `10.5` are kept.
    pub sequence_number: Option<f64>,
}

/// Resolves a chapter identity from the document's declared title and its URL.
#[must_use]
pub fn resolve(title_text: Option<&str>, url: &str) -> ChapterIdentity {
    let title_text = title_text.map(str::trim).filter(|t| !t.is_empty());
    let path = url_path(url);

    let sequence_number = title_text
        .and_then(parse_sequence_number)
        .or_else(|| parse_sequence_number(&path));
    let title = title_text
        .map(str::to_string)
        .or_else(|| title_from_path(&path));

    trace!(url, ?sequence_number, title = title.as_deref(), "resolved chapter identity");
    ChapterIdentity {
        title,
        sequence_number,
    }
}

/// Runs the pattern chain over `text`, returning the first number that parses.
#[must_use]
pub fn parse_sequence_number(text: &str) -> Option<f64> {
    SEQUENCE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|n| n.is_finite())
    })
}

fn url_path(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string())
}

fn title_from_path(path: &str) -> Option<String> {
    let segment = path.split('/').rev().find(|s| !s.trim().is_empty())?;
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |d| d.into_owned());
    let readable = decoded
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!readable.is_empty()).then_some(readable)
}

/// One entry of a series chapter listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterLink {
    /// Link text.
    pub title: String,
    /// Chapter document URL.
    pub url: String,
    /// Number supplied by the listing, if any.
    pub number: Option<f64>,
}

impl ChapterLink {
    /// Listing number, else one resolved from the link title and URL.
    #[must_use]
    pub fn effective_number(&self) -> Option<f64> {
        self.number
            .filter(|n| n.is_finite())
            .or_else(|| resolve(Some(&self.title), &self.url).sequence_number)
    }
}

/// Sorts links ascending by chapter number; unnumbered links go last in their original order.
pub fn sort_chapters_by_number(links: &mut [ChapterLink]) {
    links.sort_by_cached_key(|link| SortKey(link.effective_number()));
}

#[derive(Debug, PartialEq)]
struct SortKey(Option<f64>);

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
