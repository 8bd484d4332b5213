//! Strategy orchestration.
//!
//! [`ChapterExtractor::extract`] runs a small state machine per call:
//!
//! ```text
//! Idle --static fetch, extract, classify--> StaticAttempted
//! StaticAttempted --assets found, no reliability demand--> Resolved
//! StaticAttempted --otherwise: browser render, classify, merge--> Resolved
//! ```
//!
//! Strategy failures are folded into the diagnostic note; the only hard
//! failures are an unparseable document URL, a browser engine that cannot be
//! launched, and the caller's deadline elapsing.

mod error;
mod result;

pub use error::PipelineError;
pub use result::{ClassifiedAsset, ExtractionResult, StrategyKind};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::browser::{BrowserStrategy, DEFAULT_SETTLE_DELAY, RenderRequest};
use crate::cache::{CacheKey, DocumentCache};
use crate::classify::ClassifierRules;
use crate::extract::{CandidateAsset, extract_static};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, DocumentFetcher, FetchRequest};
use crate::metadata;
use crate::user_agent::effective_user_agent;
use result::AssetSet;

/// Separator between diagnostic note entries.
const NOTE_SEPARATOR: &str = " | ";

/// One extraction call.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    /// Chapter document URL.
    pub url: String,
    /// Clearance cookie (bare value or `cf_clearance=<value>`).
    pub auth_cookie: Option<String>,
    /// User agent for this call.
    pub user_agent: Option<String>,
    /// Extra cookies for the static fetch, `k=v; k2=v2`.
    pub cookie_header: Option<String>,
    /// Run the browser even when the static pass found assets.
    pub prefer_high_reliability: bool,
    /// Permit the browser strategy at all.
    pub allow_browser_fallback: bool,
    /// Run the browser without a window.
    pub headless: bool,
    /// Settle delay override for the browser pass.
    pub settle_delay: Option<Duration>,
    /// Whole-call deadline.
    pub deadline: Option<Duration>,
}

impl DocumentRequest {
    /// Creates a request with no identity, browser fallback allowed, headless.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_cookie: None,
            user_agent: None,
            cookie_header: None,
            prefer_high_reliability: false,
            allow_browser_fallback: true,
            headless: true,
            settle_delay: None,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    StaticAttempted,
    Resolved,
}

/// Mutable state of one call.
#[derive(Debug, Default)]
struct Run {
    assets: AssetSet,
    notes: Vec<String>,
    title: Option<String>,
    build_id: Option<String>,
}

impl Run {
    /// Classifies and merges candidates; returns how many new assets were added.
    fn absorb(
        &mut self,
        rules: &ClassifierRules,
        candidates: &[CandidateAsset],
        strategy: StrategyKind,
    ) -> usize {
        let mut classified = 0;
        let mut added = 0;
        for candidate in candidates {
            if !rules.accepts(candidate) {
                trace!(url = %candidate.raw_url, origin = candidate.origin.as_str(), "rejected");
                continue;
            }
            classified += 1;
            if self.assets.insert(&candidate.raw_url, strategy) {
                added += 1;
            }
        }

        let label = strategy.as_str();
        if candidates.is_empty() {
            self.notes.push(format!("{label}: no candidates found"));
        } else if classified == 0 {
            self.notes.push(format!(
                "{label}: {} candidates, none classified as content",
                candidates.len()
            ));
        } else if added == 0 {
            self.notes
                .push(format!("{label}: {classified} classified assets, all already found"));
        }
        added
    }

    fn finish(self, document_url: &Url) -> ExtractionResult {
        let identity = metadata::resolve(self.title.as_deref(), document_url.as_str());
        let diagnostic_note = (!self.notes.is_empty()).then(|| self.notes.join(NOTE_SEPARATOR));
        let (assets, strategies_used) = self.assets.into_parts();
        ExtractionResult {
            document_url: document_url.to_string(),
            count: assets.len(),
            assets,
            strategies_used,
            diagnostic_note,
            identity,
        }
    }
}

/// The extraction pipeline. Cheap to share behind `Arc`; calls are independent
/// apart from the document cache.
pub struct ChapterExtractor {
    fetcher: Arc<dyn DocumentFetcher>,
    cache: Arc<DocumentCache>,
    browser: Option<Arc<dyn BrowserStrategy>>,
    rules: ClassifierRules,
    fetch_timeout: Duration,
    settle_delay: Duration,
    browser_user_agent: String,
    conserve_resources: bool,
    block_images: bool,
}

impl fmt::Debug for ChapterExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterExtractor")
            .field("cache", &self.cache)
            .field("has_browser", &self.browser.is_some())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl ChapterExtractor {
    /// Creates a static-only extractor with built-in rules.
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, cache: Arc<DocumentCache>) -> Self {
        Self {
            fetcher,
            cache,
            browser: None,
            rules: ClassifierRules::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            browser_user_agent: effective_user_agent(None),
            conserve_resources: false,
            block_images: false,
        }
    }

    /// Enables the browser fallback strategy.
    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn BrowserStrategy>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Replaces the classifier rules.
    #[must_use]
    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the static fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the default settle delay for browser passes.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the user agent browser sessions use when the request has none.
    #[must_use]
    pub fn with_default_user_agent(mut self, user_agent: Option<&str>) -> Self {
        self.browser_user_agent = effective_user_agent(user_agent);
        self
    }

    /// Sets browser subresource blocking.
    #[must_use]
    pub fn with_resource_blocking(mut self, conserve_resources: bool, block_images: bool) -> Self {
        self.conserve_resources = conserve_resources;
        self.block_images = block_images;
        self
    }

    /// Returns the document cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Resolves the chapter assets and identity of one document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for hard failures; an empty asset list
    /// with a diagnostic note is a successful result.
    #[instrument(skip(self, request), fields(url = %request.url, prefer_browser = request.prefer_high_reliability))]
    pub async fn extract(&self, request: &DocumentRequest) -> Result<ExtractionResult, PipelineError> {
        let Some(deadline) = request.deadline else {
            return self.run(request).await;
        };
        match tokio::time::timeout(deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(deadline_ms, "extraction deadline exceeded");
                Err(PipelineError::DeadlineExceeded {
                    url: request.url.clone(),
                    deadline_ms,
                })
            }
        }
    }

    async fn run(&self, request: &DocumentRequest) -> Result<ExtractionResult, PipelineError> {
        let document_url = parse_document_url(&request.url)?;
        let mut run = Run::default();
        let mut stage = Stage::Idle;

        loop {
            trace!(?stage, "pipeline stage");
            stage = match stage {
                Stage::Idle => {
                    self.static_pass(request, &document_url, &mut run).await;
                    Stage::StaticAttempted
                }
                Stage::StaticAttempted => {
                    if !run.assets.is_empty() && !request.prefer_high_reliability {
                        debug!(count = run.assets.len(), "static pass sufficient; browser skipped");
                    } else {
                        self.browser_pass(request, &document_url, &mut run).await?;
                    }
                    Stage::Resolved
                }
                Stage::Resolved => break,
            };
        }

        let result = run.finish(&document_url);
        info!(
            count = result.count,
            strategies = ?result.strategies_used,
            sequence_number = ?result.identity.sequence_number,
            "extraction resolved"
        );
        Ok(result)
    }

    async fn static_pass(&self, request: &DocumentRequest, document_url: &Url, run: &mut Run) {
        let key = CacheKey::new(
            document_url.as_str(),
            request.auth_cookie.as_deref(),
            request.user_agent.as_deref(),
        );
        let fetch_request = FetchRequest {
            url: document_url.to_string(),
            user_agent: request.user_agent.clone(),
            auth_cookie: request.auth_cookie.clone(),
            cookie_header: request.cookie_header.clone(),
            timeout: self.fetch_timeout,
        };

        match self
            .cache
            .get_or_fetch(&key, || self.fetcher.fetch(&fetch_request))
            .await
        {
            Ok((body, from_cache)) => {
                let scan = extract_static(&body, document_url);
                run.title = scan.title;
                run.build_id = scan.build_id;
                run.notes.extend(scan.notes);
                let added = run.absorb(&self.rules, &scan.candidates, StrategyKind::Static);
                info!(
                    from_cache,
                    candidates = scan.candidates.len(),
                    added,
                    "static pass complete"
                );
            }
            Err(error) => {
                warn!(error = %error, kind = error.kind_label(), "static fetch failed");
                run.notes
                    .push(format!("static: {} ({error})", error.kind_label()));
            }
        }
    }

    async fn browser_pass(
        &self,
        request: &DocumentRequest,
        document_url: &Url,
        run: &mut Run,
    ) -> Result<(), PipelineError> {
        if !request.allow_browser_fallback {
            run.notes.push("browser: fallback disabled".to_string());
            return Ok(());
        }
        let Some(browser) = self.browser.as_ref() else {
            run.notes.push("browser: no engine configured".to_string());
            return Ok(());
        };

        let render = RenderRequest {
            url: document_url.clone(),
            auth_cookie: request.auth_cookie.clone(),
            user_agent: Some(
                request
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| self.browser_user_agent.clone()),
            ),
            headless: request.headless,
            settle_delay: request.settle_delay.unwrap_or(self.settle_delay),
            conserve_resources: self.conserve_resources,
            block_images: self.block_images,
            build_id: run.build_id.clone(),
        };

        match browser.render(&render).await {
            Ok(harvest) => {
                // The static title only wins when the static pass produced assets.
                if harvest.title.is_some() && (run.title.is_none() || run.assets.is_empty()) {
                    run.title = harvest.title;
                }
                run.notes.extend(harvest.notes);
                let added = run.absorb(&self.rules, &harvest.candidates, StrategyKind::Browser);
                info!(candidates = harvest.candidates.len(), added, "browser pass complete");
                Ok(())
            }
            Err(error) if error.is_launch_failure() => {
                warn!(error = %error, "browser engine unavailable");
                Err(PipelineError::BrowserUnavailable { source: error })
            }
            Err(error) => {
                warn!(error = %error, kind = error.kind_label(), "browser pass failed");
                run.notes
                    .push(format!("browser: {} ({error})", error.kind_label()));
                Ok(())
            }
        }
    }
}

fn parse_document_url(raw: &str) -> Result<Url, PipelineError> {
    let url = Url::parse(raw.trim()).map_err(|e| PipelineError::invalid_url(raw, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::invalid_url(
            raw,
            "only http and https documents are supported",
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::browser::{BrowserError, BrowserHarvest};
    use crate::cache::ManualClock;
    use crate::extract::CandidateOrigin;
    use crate::fetch::FetchError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CHAPTER_URL: &str = "https://site.example/series/foo/chapter-3";

    struct FakeFetcher {
        body: Result<String, u16>,
        hang: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<FetchRequest>>,
    }

    impl FakeFetcher {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Ok(body.to_string()),
                hang: false,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                body: Err(status),
                hang: false,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                body: Ok(String::new()),
                hang: true,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentFetcher for FakeFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(FetchError::http_status(&request.url, *status, "challenge")),
            }
        }
    }

    struct FakeBrowser {
        outcome: fn() -> Result<BrowserHarvest, BrowserError>,
        calls: AtomicUsize,
        seen: Mutex<Vec<RenderRequest>>,
    }

    impl FakeBrowser {
        fn new(outcome: fn() -> Result<BrowserHarvest, BrowserError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserStrategy for FakeBrowser {
        async fn render(&self, request: &RenderRequest) -> Result<BrowserHarvest, BrowserError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            (self.outcome)()
        }
    }

    fn browser_harvest() -> Result<BrowserHarvest, BrowserError> {
        Ok(BrowserHarvest {
            candidates: vec![
                CandidateAsset::new(
                    "https://cdn.site/storage/upload/chapter_3/01.jpg",
                    CandidateOrigin::BrowserDom,
                ),
                CandidateAsset::new("https://site.example/icons/love.png", CandidateOrigin::BrowserDom),
                CandidateAsset::new(
                    "https://cdn.site/storage/upload/chapter_3/02.jpg",
                    CandidateOrigin::BrowserSecondaryEndpoint,
                ),
            ],
            title: Some("Foo Chapter 3".to_string()),
            notes: Vec::new(),
        })
    }

    fn browser_launch_failure() -> Result<BrowserHarvest, BrowserError> {
        Err(BrowserError::launch("Chromium executable not found"))
    }

    fn browser_navigation_timeout() -> Result<BrowserHarvest, BrowserError> {
        Err(BrowserError::navigation_timeout(CHAPTER_URL, 120_000))
    }

    const STATIC_HTML: &str = r#"<html><body>
        <img data-src="//cdn.site/storage/upload/chapter_3/01.jpg">
        <img src="/icons/like.png">
        </body></html>"#;

    const EMPTY_HTML: &str = "<html><body><p>Loading...</p></body></html>";

    fn extractor(fetcher: Arc<FakeFetcher>, browser: Option<Arc<FakeBrowser>>) -> ChapterExtractor {
        let cache = Arc::new(DocumentCache::with_clock(
            Duration::from_secs(180),
            Arc::new(ManualClock::new()),
        ));
        let mut extractor = ChapterExtractor::new(fetcher, cache);
        if let Some(browser) = browser {
            extractor = extractor.with_browser(browser);
        }
        extractor
    }

    #[tokio::test]
    async fn test_static_markup_scenario() {
        let browser = FakeBrowser::new(browser_harvest);
        let extractor = extractor(FakeFetcher::ok(STATIC_HTML), Some(Arc::clone(&browser)));

        let result = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap();
        assert_eq!(result.urls(), vec!["https://cdn.site/storage/upload/chapter_3/01.jpg"]);
        assert_eq!(result.identity.sequence_number, Some(3.0));
        assert_eq!(result.strategies_used, vec![StrategyKind::Static]);
        assert_eq!(result.count, 1);
        assert!(result.diagnostic_note.is_none());
        assert_eq!(browser.calls(), 0, "browser must not run when static succeeded");
    }

    #[tokio::test]
    async fn test_browser_runs_when_static_finds_nothing() {
        let browser = FakeBrowser::new(browser_harvest);
        let extractor = extractor(FakeFetcher::ok(EMPTY_HTML), Some(Arc::clone(&browser)));

        let result = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap();
        assert_eq!(browser.calls(), 1);
        assert_eq!(
            result.urls(),
            vec![
                "https://cdn.site/storage/upload/chapter_3/01.jpg",
                "https://cdn.site/storage/upload/chapter_3/02.jpg",
            ]
        );
        assert_eq!(result.strategies_used, vec![StrategyKind::Browser]);
        assert_eq!(result.identity.title.as_deref(), Some("Foo Chapter 3"));
        assert!(result.diagnostic_note.unwrap().contains("static: no candidates found"));
    }

    #[tokio::test]
    async fn test_static_build_id_forwarded_to_browser() {
        let browser = FakeBrowser::new(browser_harvest);
        let html = r#"<html><head><title>Loading</title></head><body>
            <script id="__NEXT_DATA__" type="application/json">{"buildId":"stat1"}</script>
            </body></html>"#;
        let extractor = extractor(FakeFetcher::ok(html), Some(Arc::clone(&browser)));

        let result = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap();
        let rendered = browser.seen.lock().unwrap()[0].clone();
        assert_eq!(rendered.build_id.as_deref(), Some("stat1"));
        assert_eq!(result.identity.title.as_deref(), Some("Foo Chapter 3"));
    }

    #[tokio::test]
    async fn test_static_title_kept_when_static_found_assets() {
        let browser = FakeBrowser::new(browser_harvest);
        let html = r#"<title>Chapter 3 | Site</title><img src="https://cdn.site/storage/upload/chapter_3/01.jpg">"#;
        let extractor = extractor(FakeFetcher::ok(html), Some(Arc::clone(&browser)));
        let mut request = DocumentRequest::new(CHAPTER_URL);
        request.prefer_high_reliability = true;

        let result = extractor.extract(&request).await.unwrap();
        assert_eq!(browser.calls(), 1);
        assert_eq!(result.identity.title.as_deref(), Some("Chapter 3 | Site"));
    }

    #[tokio::test]
    async fn test_preferred_reliability_merges_static_first_without_duplicates() {
        let browser = FakeBrowser::new(browser_harvest);
        let extractor = extractor(FakeFetcher::ok(STATIC_HTML), Some(Arc::clone(&browser)));
        let mut request = DocumentRequest::new(CHAPTER_URL);
        request.prefer_high_reliability = true;

        let result = extractor.extract(&request).await.unwrap();
        assert_eq!(browser.calls(), 1);
        assert_eq!(
            result.urls(),
            vec![
                "https://cdn.site/storage/upload/chapter_3/01.jpg",
                "https://cdn.site/storage/upload/chapter_3/02.jpg",
            ]
        );
        assert_eq!(result.strategies_used, vec![StrategyKind::Static, StrategyKind::Browser]);
    }

    #[tokio::test]
    async fn test_every_strategy_failing_is_an_empty_result() {
        let browser = FakeBrowser::new(browser_navigation_timeout);
        let extractor = extractor(FakeFetcher::status(403), Some(browser));

        let result = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap();
        assert!(result.is_empty());
        assert!(result.strategies_used.is_empty());
        let note = result.diagnostic_note.unwrap();
        assert!(note.contains("static: http_status_error"), "{note}");
        assert!(note.contains("browser: browser_navigation_timeout"), "{note}");
        assert_eq!(result.identity.sequence_number, Some(3.0));
    }

    #[tokio::test]
    async fn test_browser_launch_failure_is_hard() {
        let browser = FakeBrowser::new(browser_launch_failure);
        let extractor = extractor(FakeFetcher::ok(EMPTY_HTML), Some(browser));

        let error = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap_err();
        assert!(matches!(error, PipelineError::BrowserUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_disabled_fallback_is_noted() {
        let browser = FakeBrowser::new(browser_harvest);
        let extractor = extractor(FakeFetcher::ok(EMPTY_HTML), Some(Arc::clone(&browser)));
        let mut request = DocumentRequest::new(CHAPTER_URL);
        request.allow_browser_fallback = false;

        let result = extractor.extract(&request).await.unwrap();
        assert_eq!(browser.calls(), 0);
        assert!(result.diagnostic_note.unwrap().contains("browser: fallback disabled"));
    }

    #[tokio::test]
    async fn test_missing_engine_is_noted() {
        let extractor = extractor(FakeFetcher::ok(EMPTY_HTML), None);
        let result = extractor.extract(&DocumentRequest::new(CHAPTER_URL)).await.unwrap();
        assert!(result.diagnostic_note.unwrap().contains("no engine configured"));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_fetching() {
        let fetcher = FakeFetcher::ok(STATIC_HTML);
        let extractor = extractor(Arc::clone(&fetcher), None);

        for raw in ["not a url", "ftp://site.example/c/1"] {
            let error = extractor.extract(&DocumentRequest::new(raw)).await.unwrap_err();
            assert!(matches!(error, PipelineError::InvalidUrl { .. }), "{raw}");
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_without_partial_result() {
        let extractor = extractor(FakeFetcher::hanging(), None);
        let mut request = DocumentRequest::new(CHAPTER_URL);
        request.deadline = Some(Duration::from_secs(5));

        let error = extractor.extract(&request).await.unwrap_err();
        assert!(error.is_timeout());
        assert!(error.to_string().contains("5000ms"));
    }

    #[tokio::test]
    async fn test_repeat_call_served_from_cache_with_identical_order() {
        let fetcher = FakeFetcher::ok(STATIC_HTML);
        let extractor = extractor(Arc::clone(&fetcher), None);
        let request = DocumentRequest::new(CHAPTER_URL);

        let first = extractor.extract(&request).await.unwrap();
        let second = extractor.extract(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);

        let mut other_identity = request.clone();
        other_identity.auth_cookie = Some("cf_clearance=fresh".to_string());
        extractor.extract(&other_identity).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_request_identity_forwarded_to_strategies() {
        let fetcher = FakeFetcher::ok(EMPTY_HTML);
        let browser = FakeBrowser::new(browser_harvest);
        let extractor = extractor(Arc::clone(&fetcher), Some(Arc::clone(&browser)))
            .with_settle_delay(Duration::from_millis(1500));
        let mut request = DocumentRequest::new(CHAPTER_URL);
        request.auth_cookie = Some("tok".to_string());
        request.headless = false;

        extractor.extract(&request).await.unwrap();
        let fetched = fetcher.seen.lock().unwrap()[0].clone();
        assert_eq!(fetched.auth_cookie.as_deref(), Some("tok"));
        let rendered = browser.seen.lock().unwrap()[0].clone();
        assert_eq!(rendered.auth_cookie.as_deref(), Some("tok"));
        assert!(!rendered.headless);
        assert_eq!(rendered.settle_delay, Duration::from_millis(1500));
        assert!(rendered.user_agent.unwrap().starts_with("Mozilla/5.0"));
    }
}
