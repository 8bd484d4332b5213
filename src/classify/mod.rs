//! Allow/deny heuristic separating chapter images from UI chrome.
//!
//! The fragment lists are the only site-specific knowledge here and are plain
//! data: swap them per site with [`ClassifierRules::from_file`] without touching
//! the algorithm.
//!
//! Deny fragments are checked first and are authoritative. Allow fragments are
//! looser, so any single allow match accepts only once no deny fragment matched.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::extract::{CandidateAsset, looks_like_image_url};

/// Built-in fragments that only appear in genuine content-asset paths.
pub const DEFAULT_ALLOW_FRAGMENTS: [&str; 4] =
    ["wp-manga/data", "storage.azoramoon.com", "/upload/", "chapter_"];

/// Built-in fragments that only appear in non-content assets.
pub const DEFAULT_DENY_FRAGMENTS: [&str; 8] = [
    "wsrv.nl",
    "/_next/static",
    "like.",
    "love.",
    "default-avatar",
    "icon",
    "emoji",
    "reaction",
];

static DEFAULT_RULES: LazyLock<ClassifierRules> = LazyLock::new(ClassifierRules::default);

/// Classifies `raw_url` with the built-in rules.
#[must_use]
pub fn classify(raw_url: &str) -> bool {
    DEFAULT_RULES.classify(raw_url)
}

/// Errors loading classifier rules from disk.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rules file could not be read.
    #[error("cannot read classifier rules '{path}': {source}")]
    Io {
        /// Rules file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The rules file is not valid JSON of the expected shape.
    #[error("invalid classifier rules{}: {source}\n  Suggestion: expected {{\"allow\": [...], \"deny\": [...]}}", .path.as_ref().map(|p| format!(" '{}'", p.display())).unwrap_or_default())]
    Parse {
        /// Rules file path, when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The allow list is empty, so nothing could ever be accepted.
    #[error("classifier rules have an empty allow list")]
    EmptyAllowList,
}

#[derive(Debug, Deserialize)]
struct RawRules {
    allow: Vec<String>,
    #[serde(default)]
    deny: Vec<String>,
    #[serde(default = "default_trust_content_lists")]
    trust_content_lists: bool,
}

fn default_trust_content_lists() -> bool {
    true
}

/// Fragment lists driving classification. Fragments are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifierRules {
    allow: Vec<String>,
    deny: Vec<String>,
    trust_content_lists: bool,
}

impl ClassifierRules {
    /// Creates rules from fragment lists; blank fragments are dropped.
    #[must_use]
    pub fn new<A, D>(allow: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            allow: lowercase_fragments(allow),
            deny: lowercase_fragments(deny),
            trust_content_lists: true,
        }
    }

    /// Sets whether unmatched content-list candidates are accepted.
    #[must_use]
    pub fn with_trust_content_lists(mut self, trust: bool) -> Self {
        self.trust_content_lists = trust;
        self
    }

    /// Parses rules from a JSON document `{"allow": [...], "deny": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Parse`] for malformed JSON and
    /// [`RulesError::EmptyAllowList`] when no allow fragment remains.
    pub fn from_json_str(raw: &str) -> Result<Self, RulesError> {
        let parsed: RawRules =
            serde_json::from_str(raw).map_err(|source| RulesError::Parse { path: None, source })?;
        let rules = Self::new(parsed.allow, parsed.deny)
            .with_trust_content_lists(parsed.trust_content_lists);
        if rules.allow.is_empty() {
            return Err(RulesError::EmptyAllowList);
        }
        Ok(rules)
    }

    /// Loads rules from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] when the file cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_json_str(&raw).map_err(|error| match error {
            RulesError::Parse { source, .. } => RulesError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })?;
        debug!(allow = rules.allow.len(), deny = rules.deny.len(), "loaded classifier rules");
        Ok(rules)
    }

    /// Allow fragments (lowercased).
    #[must_use]
    pub fn allow(&self) -> &[String] {
        &self.allow
    }

    /// Deny fragments (lowercased).
    #[must_use]
    pub fn deny(&self) -> &[String] {
        &self.deny
    }

    /// Returns true if any deny fragment occurs in `raw_url`.
    #[must_use]
    pub fn is_denied(&self, raw_url: &str) -> bool {
        let lower = raw_url.to_lowercase();
        self.deny.iter().any(|fragment| lower.contains(fragment.as_str()))
    }

    /// Returns true if any allow fragment occurs in `raw_url`.
    #[must_use]
    pub fn is_allowed(&self, raw_url: &str) -> bool {
        let lower = raw_url.to_lowercase();
        self.allow.iter().any(|fragment| lower.contains(fragment.as_str()))
    }

    /// Deny first (authoritative), then any allow match accepts.
    #[must_use]
    pub fn classify(&self, raw_url: &str) -> bool {
        !self.is_denied(raw_url) && self.is_allowed(raw_url)
    }

    /// Classifies a candidate, also accepting content-list images when trusted.
    #[must_use]
    pub fn accepts(&self, candidate: &CandidateAsset) -> bool {
        let url = candidate.raw_url.as_str();
        if self.is_denied(url) {
            trace!(url, "denied");
            return false;
        }
        self.is_allowed(url)
            || (self.trust_content_lists
                && candidate.in_content_list
                && looks_like_image_url(url))
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_FRAGMENTS, DEFAULT_DENY_FRAGMENTS)
    }
}

fn lowercase_fragments<I>(fragments: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fragments
        .into_iter()
        .map(|fragment| fragment.as_ref().trim().to_lowercase())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extract::CandidateOrigin;

    #[test]
    fn test_chapter_image_accepted() {
        assert!(classify("https://cdn.site/storage/upload/chapter_3/01.jpg"));
        assert!(classify("https://storage.azoramoon.com/series/1/02.webp"));
        assert!(classify("https://host/wp-content/WP-manga/data/manga_1/03.png"));
    }

    #[test]
    fn test_ui_chrome_rejected() {
        assert!(!classify("https://site.example/icons/like.png"));
        assert!(!classify("https://site.example/_next/static/media/logo.png"));
        assert!(!classify("https://site.example/default-avatar.png"));
        assert!(!classify("https://site.example/images/banner.jpg"));
    }

    #[test]
    fn test_deny_fragment_wins_over_allow_fragment() {
        let urls = [
            "https://wsrv.nl/?url=storage.azoramoon.com/upload/chapter_1/01.jpg",
            "https://cdn.site/upload/chapter_2/reaction-love.png",
            "https://cdn.site/upload/emoji/chapter_3.png",
            "https://storage.azoramoon.com/icons/01.png",
        ];
        for url in urls {
            let rules = ClassifierRules::default();
            assert!(rules.is_allowed(url), "fixture must also match allow: {url}");
            assert!(!classify(url), "deny must be authoritative: {url}");
        }
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(!classify("https://cdn.site/UPLOAD/Chapter_1/ICON.png"));
        assert!(classify("https://cdn.site/UPLOAD/x/01.png"));
        let rules = ClassifierRules::new(["/Pages/"], ["BANNER"]);
        assert!(rules.classify("https://x/pages/01.jpg"));
        assert!(!rules.classify("https://x/pages/banner.jpg"));
    }

    #[test]
    fn test_content_list_candidate_trusted_when_not_denied() {
        let rules = ClassifierRules::default();
        let mut candidate =
            CandidateAsset::new("https://img.other/p/01.jpg", CandidateOrigin::StaticStructuredData);
        assert!(!rules.accepts(&candidate));

        candidate.in_content_list = true;
        assert!(rules.accepts(&candidate));
        assert!(!rules.clone().with_trust_content_lists(false).accepts(&candidate));

        candidate.raw_url = "https://img.other/p/icon.jpg".to_string();
        assert!(!rules.accepts(&candidate));
    }

    #[test]
    fn test_rules_from_json() {
        let rules = ClassifierRules::from_json_str(
            r#"{"allow": ["/Chapters/", " "], "deny": ["thumb"], "trust_content_lists": false}"#,
        )
        .unwrap();
        assert_eq!(rules.allow(), ["/chapters/"]);
        assert_eq!(rules.deny(), ["thumb"]);
        assert!(rules.classify("https://x/chapters/1/01.jpg"));
        assert!(!rules.classify("https://x/chapters/1/thumb.jpg"));
    }

    #[test]
    fn test_rules_from_json_rejects_empty_allow() {
        let error = ClassifierRules::from_json_str(r#"{"allow": []}"#).unwrap_err();
        assert!(matches!(error, RulesError::EmptyAllowList));
    }

    #[test]
    fn test_rules_from_json_reports_parse_error() {
        let error = ClassifierRules::from_json_str("{").unwrap_err();
        assert!(error.to_string().contains("Suggestion"));
    }

    #[test]
    fn test_rules_from_missing_file() {
        let error = ClassifierRules::from_file(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(error, RulesError::Io { .. }));
    }

    #[test]
    fn test_rules_from_file_replaces_builtin_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"allow": ["/pages/"], "deny": ["Thumb"], "trust_content_lists": false}"#)
            .unwrap();

        let rules = ClassifierRules::from_file(&path).unwrap();
        assert_eq!(rules.allow(), ["/pages/"]);
        assert_eq!(rules.deny(), ["thumb"]);
        assert!(rules.classify("https://cdn.site/pages/01.png"));
        assert!(!rules.classify("https://cdn.site/pages/thumb-01.png"));
        assert!(!rules.classify("https://cdn.site/upload/chapter_1/01.png"));
    }
}
