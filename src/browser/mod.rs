//! Headless browser rendering fallback.
//!
//! The expensive strategy: render the document in a real engine so client-side
//! hydration and lazy loading run, then apply the same two extraction
//! techniques to the live DOM. A build identifier found in the rendered state
//! also unlocks a JSON-only data endpoint for the same document, fetched from
//! inside the page so it carries the session's cookies.
//!
//! # Architecture
//!
//! - [`BrowserStrategy`] is the seam the orchestrator calls.
//! - [`BrowserExtractor`] implements the render sequence against the
//!   [`BrowserLauncher`]/[`BrowserSession`] engine seam.
//! - [`ChromiumLauncher`] is the production engine (Chromium over CDP).
//!
//! Every session is closed on every exit path of [`BrowserExtractor::render`];
//! sessions dropped by cancellation kill their process in `Drop`.

mod chromium;
mod error;

pub use chromium::ChromiumLauncher;
pub use error::BrowserError;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extract::{
    CandidateAsset, CandidateOrigin, deep_search_json, normalize_asset_url, scan_document,
};
use crate::fetch::headers::{CLEARANCE_COOKIE_NAME, clearance_value};

/// First navigation bound.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound for the single navigation retry.
pub const DEFAULT_NAVIGATION_RETRY_TIMEOUT: Duration = Duration::from_secs(120);

/// Pause after load for deferred script execution.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Number of incremental scroll steps.
pub const DEFAULT_SCROLL_STEPS: u32 = 8;

/// Pause after scrolling so lazy loaders can swap in real sources.
pub const DEFAULT_SCROLL_PAUSE: Duration = Duration::from_millis(600);

/// Smallest scroll step in CSS pixels.
const MIN_SCROLL_STEP_PX: u32 = 800;

/// Options applied when a session is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// User agent applied to the page.
    pub user_agent: Option<String>,
    /// Block media, fonts and stylesheets.
    pub conserve_resources: bool,
    /// Also block image bytes (URLs stay in the markup).
    pub block_images: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            conserve_resources: false,
            block_images: false,
        }
    }
}

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a fresh session with its own profile.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] when the engine cannot be started.
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser session with a single page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Adds a cookie scoped to `domain`, path `/`, secure.
    async fn set_cookie(&self, name: &str, value: &str, domain: &str) -> Result<(), BrowserError>;

    /// Navigates the page and waits for the load to settle. Unbounded; callers apply timeouts.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluates a script expression in the page and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Returns the serialized live DOM.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Fetches `url` from inside the page (same cookies) and returns the body text.
    async fn fetch_text(&self, url: &str) -> Result<String, BrowserError>;

    /// Closes the page and the engine process.
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// One render call.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Document URL.
    pub url: Url,
    /// Clearance cookie (bare value or `cf_clearance=<value>`).
    pub auth_cookie: Option<String>,
    /// User agent applied to the page.
    pub user_agent: Option<String>,
    /// Run without a visible window.
    pub headless: bool,
    /// Pause after load before scanning.
    pub settle_delay: Duration,
    /// Block heavy subresources.
    pub conserve_resources: bool,
    /// Also block image bytes.
    pub block_images: bool,
    /// Build identifier already found in the static document; used when the
    /// rendered DOM carries none.
    pub build_id: Option<String>,
}

impl RenderRequest {
    /// Creates a headless request with default settle delay and no identity.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            auth_cookie: None,
            user_agent: None,
            headless: true,
            settle_delay: DEFAULT_SETTLE_DELAY,
            conserve_resources: false,
            block_images: false,
            build_id: None,
        }
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            headless: self.headless,
            user_agent: self.user_agent.clone(),
            conserve_resources: self.conserve_resources,
            block_images: self.block_images,
        }
    }
}

/// Raw output of a browser pass, before classification.
#[derive(Debug, Clone, Default)]
pub struct BrowserHarvest {
    /// DOM markup, DOM structured data, then secondary-endpoint candidates.
    pub candidates: Vec<CandidateAsset>,
    /// Title declared by the rendered document.
    pub title: Option<String>,
    /// Recoverable problems met along the way.
    pub notes: Vec<String>,
}

/// The browser strategy as seen by the orchestrator.
#[async_trait]
pub trait BrowserStrategy: Send + Sync {
    /// Renders the document and harvests candidates.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when the session cannot be launched or the
    /// document cannot be loaded after one retry.
    async fn render(&self, request: &RenderRequest) -> Result<BrowserHarvest, BrowserError>;
}

/// Timing knobs of the render sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserSettings {
    /// First navigation bound.
    pub navigation_timeout: Duration,
    /// Retry navigation bound.
    pub navigation_retry_timeout: Duration,
    /// Incremental scroll steps.
    pub scroll_steps: u32,
    /// Pause after scrolling.
    pub scroll_pause: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            navigation_retry_timeout: DEFAULT_NAVIGATION_RETRY_TIMEOUT,
            scroll_steps: DEFAULT_SCROLL_STEPS,
            scroll_pause: DEFAULT_SCROLL_PAUSE,
        }
    }
}

/// Render sequence over any [`BrowserLauncher`].
pub struct BrowserExtractor {
    launcher: Arc<dyn BrowserLauncher>,
    settings: BrowserSettings,
}

impl fmt::Debug for BrowserExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserExtractor")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BrowserExtractor {
    /// Creates an extractor with default timings.
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self::with_settings(launcher, BrowserSettings::default())
    }

    /// Creates an extractor with explicit timings.
    #[must_use]
    pub fn with_settings(launcher: Arc<dyn BrowserLauncher>, settings: BrowserSettings) -> Self {
        Self { launcher, settings }
    }

    /// Returns the timing settings.
    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    async fn drive(
        &self,
        session: &dyn BrowserSession,
        request: &RenderRequest,
    ) -> Result<BrowserHarvest, BrowserError> {
        let url = request.url.as_str();

        if let Some(raw) = request.auth_cookie.as_deref().filter(|c| !c.trim().is_empty())
            && let Some(host) = request.url.host_str()
        {
            session
                .set_cookie(CLEARANCE_COOKIE_NAME, &clearance_value(raw), host)
                .await?;
            debug!(host, "clearance cookie injected");
        }

        self.navigate_with_retry(session, url).await?;

        if !request.settle_delay.is_zero() {
            tokio::time::sleep(request.settle_delay).await;
        }

        let mut harvest = BrowserHarvest::default();
        if let Err(error) = self.scroll(session).await {
            warn!(error = %error, "scroll simulation failed");
            harvest.notes.push(format!("browser: scroll failed ({error})"));
        }

        let html = session.content().await?;
        let scan = scan_document(
            &html,
            &request.url,
            CandidateOrigin::BrowserDom,
            CandidateOrigin::BrowserStructuredData,
        );
        harvest.candidates = scan.candidates;
        harvest.title = scan.title;
        harvest.notes.extend(scan.notes);

        let build_id = scan.build_id.as_deref().or(request.build_id.as_deref());
        if let Some(build_id) = build_id {
            self.harvest_secondary_endpoint(session, &request.url, build_id, &mut harvest)
                .await;
        }

        Ok(harvest)
    }

    async fn navigate_with_retry(
        &self,
        session: &dyn BrowserSession,
        url: &str,
    ) -> Result<(), BrowserError> {
        match bounded_navigate(session, url, self.settings.navigation_timeout).await {
            Ok(()) => return Ok(()),
            Err(error) => {
                warn!(url, error = %error, "navigation failed; retrying with longer bound");
            }
        }
        bounded_navigate(session, url, self.settings.navigation_retry_timeout).await
    }

    async fn scroll(&self, session: &dyn BrowserSession) -> Result<(), BrowserError> {
        if self.settings.scroll_steps == 0 {
            return Ok(());
        }
        for step in 1..=self.settings.scroll_steps {
            session.evaluate(&scroll_script(step)).await?;
        }
        tokio::time::sleep(self.settings.scroll_pause).await;
        Ok(())
    }

    async fn harvest_secondary_endpoint(
        &self,
        session: &dyn BrowserSession,
        document_url: &Url,
        build_id: &str,
        harvest: &mut BrowserHarvest,
    ) {
        let endpoint = secondary_endpoint_url(document_url, build_id);
        let fetched = tokio::time::timeout(
            self.settings.navigation_timeout,
            session.fetch_text(endpoint.as_str()),
        )
        .await;

        let body = match fetched {
            Ok(Ok(body)) => body,
            Ok(Err(error)) => {
                debug!(endpoint = %endpoint, error = %error, "secondary endpoint fetch failed");
                harvest
                    .notes
                    .push(format!("browser_secondary_endpoint: {error}"));
                return;
            }
            Err(_) => {
                harvest.notes.push(format!(
                    "browser_secondary_endpoint: timed out after {}ms",
                    self.settings.navigation_timeout.as_millis()
                ));
                return;
            }
        };

        match deep_search_json(&body) {
            Ok(scan) => {
                let before = harvest.candidates.len();
                harvest
                    .candidates
                    .extend(scan.candidates.into_iter().filter_map(|found| {
                        normalize_asset_url(&found.url, document_url).map(|url| CandidateAsset {
                            raw_url: url,
                            origin: CandidateOrigin::BrowserSecondaryEndpoint,
                            in_content_list: found.in_content_list,
                        })
                    }));
                debug!(
                    endpoint = %endpoint,
                    count = harvest.candidates.len() - before,
                    "secondary endpoint searched"
                );
            }
            Err(error) => harvest.notes.push(format!(
                "browser_secondary_endpoint: JSON parse failed ({error})"
            )),
        }
    }
}

#[async_trait]
impl BrowserStrategy for BrowserExtractor {
    #[instrument(skip(self, request), fields(url = %request.url, headless = request.headless))]
    async fn render(&self, request: &RenderRequest) -> Result<BrowserHarvest, BrowserError> {
        let session = self.launcher.launch(&request.session_options()).await?;
        let outcome = self.drive(session.as_ref(), request).await;
        if let Err(error) = session.close().await {
            warn!(error = %error, "browser session close failed");
        }
        if let Ok(harvest) = &outcome {
            info!(count = harvest.candidates.len(), "browser pass complete");
        }
        outcome
    }
}

async fn bounded_navigate(
    session: &dyn BrowserSession,
    url: &str,
    bound: Duration,
) -> Result<(), BrowserError> {
    match tokio::time::timeout(bound, session.navigate(url)).await {
        Ok(result) => result,
        Err(_) => Err(BrowserError::navigation_timeout(
            url,
            u64::try_from(bound.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

/// Script scrolling to the `step`-th viewport position (at least 800px per step).
fn scroll_script(step: u32) -> String {
    format!(
        "(() => {{ const h = Math.max(document.documentElement.clientHeight || 0, {MIN_SCROLL_STEP_PX}); \
         window.scrollTo(0, h * {step}); return window.scrollY; }})()"
    )
}

/// Data endpoint for the document: `<scheme>://<host>/_next/data/<build_id><path>.json`.
#[must_use]
pub fn secondary_endpoint_url(document_url: &Url, build_id: &str) -> Url {
    let path = document_url.path().trim_end_matches('/');
    let path = if path.is_empty() { "/index" } else { path };
    let mut endpoint = document_url.clone();
    endpoint.set_path(&format!("/_next/data/{build_id}{path}.json"));
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    endpoint
}
