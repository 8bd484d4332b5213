//! Chapter Extractor Core Library
//!
//! This library resolves, for a single chapter document URL, the ordered list of
//! image asset URLs that compose the chapter, plus light metadata (title and
//! chapter number). Sites render these assets through static markup, embedded
//! JSON state, and client-side hydration, so extraction runs as a chain of
//! strategies of increasing cost.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`cache`] - Time-bound document cache keyed by URL and request identity
//! - [`fetch`] - Single-shot HTTP fetcher with failure classification
//! - [`extract`] - Markup scan and embedded-JSON deep search
//! - [`browser`] - Headless browser rendering fallback
//! - [`classify`] - Allow/deny heuristic separating content from UI chrome
//! - [`metadata`] - Chapter number and title resolution
//! - [`pipeline`] - Strategy orchestration, merge, and dedup
//! - [`config`] - Runtime configuration with environment overrides

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod cache;
pub mod classify;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod metadata;
pub mod pipeline;
mod user_agent;

// Re-export commonly used types
pub use browser::{
    BrowserError, BrowserExtractor, BrowserHarvest, BrowserLauncher, BrowserSession,
    BrowserSettings, BrowserStrategy, ChromiumLauncher, RenderRequest, SessionOptions,
};
pub use cache::{CacheKey, Clock, DocumentCache, ManualClock, SystemClock};
pub use classify::{ClassifierRules, RulesError, classify};
pub use config::{ConfigError, ExtractorConfig};
pub use extract::{CandidateAsset, CandidateOrigin, DocumentScan, extract_static, scan_document};
pub use fetch::{DocumentFetcher, FetchError, FetchRequest, StaticFetcher};
pub use metadata::{ChapterIdentity, ChapterLink, resolve, sort_chapters_by_number};
pub use pipeline::{
    ChapterExtractor, ClassifiedAsset, DocumentRequest, ExtractionResult, PipelineError,
    StrategyKind,
};
pub use user_agent::DEFAULT_BROWSER_USER_AGENT;
