//! Result value objects of an extraction call.

use std::collections::HashSet;

use serde::Serialize;

use crate::metadata::ChapterIdentity;

/// Extraction strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Plain HTTP fetch and parse.
    Static,
    /// Headless browser render.
    Browser,
}

impl StrategyKind {
    /// Stable label used in logs and notes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Browser => "browser",
        }
    }
}

/// A candidate that passed classification, with its absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassifiedAsset {
    /// Absolute asset URL.
    pub url: String,
}

/// Outcome of one extraction call. Empty `assets` is a valid outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// The requested document URL.
    pub document_url: String,
    /// Assets in first-occurrence order, unique by URL.
    pub assets: Vec<ClassifiedAsset>,
    /// Number of assets.
    pub count: usize,
    /// Strategies that contributed at least one asset, in run order.
    pub strategies_used: Vec<StrategyKind>,
    /// Why a stage contributed nothing or failed, when any did.
    pub diagnostic_note: Option<String>,
    /// Chapter title and number.
    pub identity: ChapterIdentity,
}

impl ExtractionResult {
    /// Asset URLs in order.
    #[must_use]
    pub fn urls(&self) -> Vec<&str> {
        self.assets.iter().map(|asset| asset.url.as_str()).collect()
    }

    /// Returns true if no asset was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Order-preserving, URL-unique accumulator.
#[derive(Debug, Default)]
pub(crate) struct AssetSet {
    assets: Vec<ClassifiedAsset>,
    seen: HashSet<String>,
    strategies: Vec<StrategyKind>,
}

impl AssetSet {
    /// Adds `url` unless already present; returns whether it was added.
    pub(crate) fn insert(&mut self, url: &str, strategy: StrategyKind) -> bool {
        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.assets.push(ClassifiedAsset {
            url: url.to_string(),
        });
        if !self.strategies.contains(&strategy) {
            self.strategies.push(strategy);
        }
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.assets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<ClassifiedAsset>, Vec<StrategyKind>) {
        (self.assets, self.strategies)
    }
}
