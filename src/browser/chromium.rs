//! Chromium engine over CDP.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, SetBlockedUrLsParams, SetCookieParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures_util::{Stream, StreamExt};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{BrowserError, BrowserLauncher, BrowserSession, SessionOptions};

/// Subresource patterns blocked in resource-conservation mode.
const HEAVY_RESOURCE_PATTERNS: [&str; 12] = [
    "*.mp4", "*.webm", "*.m3u8", "*.mp3", "*.ogg", "*.woff", "*.woff2", "*.ttf", "*.otf",
    "*.eot", "*.css", "*.css?*",
];

/// Image patterns additionally blocked when image bytes are not needed.
const IMAGE_RESOURCE_PATTERNS: [&str; 6] = ["*.jpg", "*.jpeg", "*.png", "*.webp", "*.gif", "*.avif"];

/// Lifecycle event fired after 500 ms without network activity.
const NETWORK_IDLE_EVENT: &str = "networkIdle";

/// Launches one Chromium process per session, each with a throwaway profile.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    /// Uses the engine's own executable detection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit Chromium executable.
    #[must_use]
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }

    /// Configured executable, if any.
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    fn browser_config(&self, options: &SessionOptions, profile: &Path) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile)
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            if !path.exists() {
                return Err(BrowserError::launch(format!(
                    "Chromium executable not found at {}",
                    path.display()
                )));
            }
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(BrowserError::launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let profile = tempfile::Builder::new()
            .prefix("chapter-extractor-profile-")
            .tempdir()
            .map_err(|e| BrowserError::launch(format!("cannot create profile directory: {e}")))?;
        let config = self.browser_config(options, profile.path())?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::launch(format!("failed to launch Chromium: {e}")))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    trace!(error = %error, "CDP handler event error");
                }
            }
        });
        debug!(profile = %profile.path().display(), headless = options.headless, "Chromium launched");

        // From here on the session owns the process, so early returns still clean up.
        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
            _profile: profile,
        };
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::session(format!("failed to open page: {e}")))?;
        prepare_page(&page, options).await?;
        session.page = Some(page);
        Ok(Box::new(session))
    }
}

async fn prepare_page(page: &Page, options: &SessionOptions) -> Result<(), BrowserError> {
    if let Some(user_agent) = options.user_agent.as_deref() {
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| BrowserError::session(format!("failed to set user agent: {e}")))?;
    }
    if options.conserve_resources || options.block_images {
        let mut patterns: Vec<String> = Vec::new();
        if options.conserve_resources {
            patterns.extend(HEAVY_RESOURCE_PATTERNS.iter().map(ToString::to_string));
        }
        if options.block_images {
            patterns.extend(IMAGE_RESOURCE_PATTERNS.iter().map(ToString::to_string));
        }
        page.execute(EnableParams::default())
            .await
            .map_err(|e| BrowserError::session(format!("failed to enable network domain: {e}")))?;
        page.execute(SetBlockedUrLsParams::new(patterns))
            .await
            .map_err(|e| BrowserError::session(format!("failed to block resources: {e}")))?;
    }
    Ok(())
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    _profile: TempDir,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::session("page not open"))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn set_cookie(&self, name: &str, value: &str, domain: &str) -> Result<(), BrowserError> {
        let params = SetCookieParams::builder()
            .name(name)
            .value(value)
            .domain(domain)
            .path("/")
            .secure(true)
            .build()
            .map_err(BrowserError::session)?;
        self.page()?
            .execute(params)
            .await
            .map_err(|e| BrowserError::session(format!("failed to set cookie: {e}")))?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let page = self.page()?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| BrowserError::session(format!("cannot enable lifecycle events: {e}")))?;
        let main_frame = page
            .mainframe()
            .await
            .map_err(|e| BrowserError::session(format!("cannot resolve main frame: {e}")))?;
        let lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| BrowserError::session(format!("cannot listen for lifecycle events: {e}")))?
            .map(|event| (event.frame_id.inner().clone(), event.name.clone()));

        page.goto(url)
            .await
            .map_err(|e| BrowserError::session(format!("navigation to {url} failed: {e}")))?;
        await_network_idle(lifecycle, main_frame.as_ref().map(|frame| frame.inner().as_str()))
            .await
            .map_err(|e| BrowserError::session(format!("load of {url} did not settle: {e}")))?;
        trace!(url, "network idle");
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::session(format!("script evaluation failed: {e}")))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::session(format!("failed to read page content: {e}")))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, BrowserError> {
        let target = serde_json::to_string(url)
            .map_err(|e| BrowserError::session(format!("cannot encode url: {e}")))?;
        let params = EvaluateParams::builder()
            .expression(format!(
                "fetch({target}, {{ credentials: 'include' }}).then(r => r.ok ? r.text() \
                 : Promise.reject(new Error('HTTP ' + r.status)))"
            ))
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::session)?;
        let result = self
            .page()?
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::session(format!("in-page fetch of {url} failed: {e}")))?;
        result
            .into_value::<String>()
            .map_err(|e| BrowserError::session(format!("in-page fetch of {url} returned no text: {e}")))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let mut session = *self;
        if let Some(page) = session.page.take()
            && let Err(error) = page.close().await
        {
            warn!(error = %error, "page close failed");
        }
        session
            .browser
            .close()
            .await
            .map_err(|e| BrowserError::session(format!("browser close failed: {e}")))?;
        if let Err(error) = session.browser.wait().await {
            warn!(error = %error, "waiting for Chromium exit failed");
        }
        debug!("Chromium session closed");
        Ok(())
    }
}

/// Resolves once the main frame reports network idle after a fresh `init`.
///
/// Events are `(frame_id, name)` pairs; other frames are ignored.
async fn await_network_idle<S>(events: S, main_frame: Option<&str>) -> Result<(), BrowserError>
where
    S: Stream<Item = (String, String)>,
{
    let mut events = std::pin::pin!(events);
    let mut navigation_started = false;
    while let Some((frame, name)) = events.next().await {
        if main_frame.is_some_and(|main| main != frame) {
            continue;
        }
        match name.as_str() {
            "init" => navigation_started = true,
            NETWORK_IDLE_EVENT if navigation_started => return Ok(()),
            _ => {}
        }
    }
    Err(BrowserError::session("lifecycle events ended before network idle"))
}
