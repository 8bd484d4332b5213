//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use chapter_core::{DocumentRequest, ExtractorConfig};
use clap::Parser;

/// Resolve the ordered image assets of one chapter page.
///
/// Tries a plain HTTP fetch first and falls back to a headless Chromium render
/// when the static document yields no chapter images. Prints the result as
/// JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "chapter-extractor")]
#[command(author, version, about)]
pub struct Args {
    /// Chapter document URL
    pub url: String,

    /// Clearance cookie, bare value or `cf_clearance=<value>`
    #[arg(long)]
    pub cookie: Option<String>,

    /// Extra cookies for the static fetch, `k=v; k2=v2`
    #[arg(long)]
    pub cookie_header: Option<String>,

    /// User agent for static and browser requests
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Render in the browser even if the static pass finds images
    #[arg(long, conflicts_with = "no_browser")]
    pub prefer_browser: bool,

    /// Never fall back to the browser
    #[arg(long)]
    pub no_browser: bool,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Seconds to wait after page load before scanning (0-60)
    #[arg(long, value_parser = parse_settle_delay)]
    pub settle_delay: Option<Duration>,

    /// Abort the whole extraction after this many seconds
    #[arg(long, value_parser = parse_deadline)]
    pub deadline: Option<Duration>,

    /// Block media, fonts and stylesheets in the browser
    #[arg(long)]
    pub conserve_resources: bool,

    /// Also block image downloads in the browser (URLs are still collected)
    #[arg(long)]
    pub block_images: bool,

    /// Chromium executable to launch
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,

    /// JSON file with classifier fragment lists: {"allow": [...], "deny": [...]}
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Also write the JSON result to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Layers command-line values over environment-derived configuration.
    pub fn apply_to(&self, config: &mut ExtractorConfig) {
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
        if let Some(delay) = self.settle_delay {
            config.settle_delay = delay;
        }
        if self.conserve_resources {
            config.conserve_resources = true;
        }
        if self.block_images {
            config.block_images = true;
        }
        if let Some(path) = &self.chromium_path {
            config.chromium_path = Some(path.clone());
        }
        if let Some(path) = &self.rules {
            config.rules_file = Some(path.clone());
        }
    }

    /// The extraction call described by these arguments.
    #[must_use]
    pub fn document_request(&self) -> DocumentRequest {
        DocumentRequest {
            auth_cookie: self.cookie.clone(),
            user_agent: self.user_agent.clone(),
            cookie_header: self.cookie_header.clone(),
            prefer_high_reliability: self.prefer_browser,
            allow_browser_fallback: !self.no_browser,
            headless: !self.headful,
            settle_delay: self.settle_delay,
            deadline: self.deadline,
            ..DocumentRequest::new(self.url.clone())
        }
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{raw}' must be finite and non-negative"))
}

fn parse_settle_delay(raw: &str) -> Result<Duration, String> {
    let delay = parse_seconds(raw)?;
    if delay > Duration::from_secs(60) {
        return Err("settle delay must be at most 60 seconds".to_string());
    }
    Ok(delay)
}

fn parse_deadline(raw: &str) -> Result<Duration, String> {
    let deadline = parse_seconds(raw)?;
    if deadline.is_zero() {
        return Err("deadline must be greater than zero".to_string());
    }
    Ok(deadline)
}
