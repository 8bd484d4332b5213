//! Runtime configuration with environment overrides.
//!
//! Defaults live here; `CHAPTER_*` environment variables override them and the
//! CLI overrides both. Durations are read as whole seconds except the settle
//! delay, which accepts fractional seconds.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::browser::{
    BrowserSettings, DEFAULT_NAVIGATION_RETRY_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_SCROLL_PAUSE, DEFAULT_SCROLL_STEPS, DEFAULT_SETTLE_DELAY,
};
use crate::cache::DEFAULT_CACHE_TTL;
use crate::classify::{ClassifierRules, RulesError};
use crate::fetch::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_FETCH_TIMEOUT};

pub const ENV_CACHE_TTL: &str = "CHAPTER_CACHE_TTL_SECS";
pub const ENV_CONNECT_TIMEOUT: &str = "CHAPTER_CONNECT_TIMEOUT_SECS";
pub const ENV_FETCH_TIMEOUT: &str = "CHAPTER_FETCH_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "CHAPTER_USER_AGENT";
pub const ENV_SETTLE_DELAY: &str = "CHAPTER_SETTLE_DELAY_SECS";
pub const ENV_CONSERVE_RESOURCES: &str = "CHAPTER_CONSERVE_RESOURCES";
pub const ENV_BLOCK_IMAGES: &str = "CHAPTER_BLOCK_IMAGES";
pub const ENV_CHROMIUM_PATH: &str = "CHAPTER_CHROMIUM_PATH";
pub const ENV_RULES_FILE: &str = "CHAPTER_RULES_FILE";

const TIMEOUT_RANGE_SECS: (u64, u64) = (1, 3600);
const CACHE_TTL_RANGE_SECS: (u64, u64) = (0, 86_400);
const SETTLE_DELAY_MAX_SECS: f64 = 60.0;
const SCROLL_STEPS_MAX: u32 = 50;

/// Errors in configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name.
        name: String,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A parsed value falls outside its accepted range.
    #[error("{name} = {value} is out of range ({min}..={max})")]
    OutOfRange {
        /// Setting name.
        name: &'static str,
        /// The offending value, rendered.
        value: String,
        /// Inclusive lower bound, rendered.
        min: String,
        /// Inclusive upper bound, rendered.
        max: String,
    },
}

impl ConfigError {
    fn invalid(name: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Settings for one extractor instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Document cache TTL.
    pub cache_ttl: Duration,
    /// TCP connect timeout of the static client.
    pub connect_timeout: Duration,
    /// Whole-request timeout of a static fetch.
    pub fetch_timeout: Duration,
    /// Default user agent for static and browser traffic.
    pub user_agent: Option<String>,
    /// First navigation bound.
    pub navigation_timeout: Duration,
    /// Navigation retry bound.
    pub navigation_retry_timeout: Duration,
    /// Default settle delay after load.
    pub settle_delay: Duration,
    /// Incremental scroll steps.
    pub scroll_steps: u32,
    /// Pause after scrolling.
    pub scroll_pause: Duration,
    /// Block heavy subresources in browser sessions.
    pub conserve_resources: bool,
    /// Also block image bytes in browser sessions.
    pub block_images: bool,
    /// Explicit Chromium executable.
    pub chromium_path: Option<PathBuf>,
    /// JSON classifier rules replacing the built-in lists.
    pub rules_file: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: None,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            navigation_retry_timeout: DEFAULT_NAVIGATION_RETRY_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            scroll_steps: DEFAULT_SCROLL_STEPS,
            scroll_pause: DEFAULT_SCROLL_PAUSE,
            conserve_resources: false,
            block_images: false,
            chromium_path: None,
            rules_file: None,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by `CHAPTER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values from `lookup` (keyed by environment variable name).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is present but unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(raw) = get(ENV_CACHE_TTL) {
            config.cache_ttl = parse_secs(ENV_CACHE_TTL, &raw)?;
        }
        if let Some(raw) = get(ENV_CONNECT_TIMEOUT) {
            config.connect_timeout = parse_secs(ENV_CONNECT_TIMEOUT, &raw)?;
        }
        if let Some(raw) = get(ENV_FETCH_TIMEOUT) {
            config.fetch_timeout = parse_secs(ENV_FETCH_TIMEOUT, &raw)?;
        }
        if let Some(raw) = get(ENV_USER_AGENT) {
            config.user_agent = Some(raw);
        }
        if let Some(raw) = get(ENV_SETTLE_DELAY) {
            config.settle_delay = parse_fractional_secs(ENV_SETTLE_DELAY, &raw)?;
        }
        if let Some(raw) = get(ENV_CONSERVE_RESOURCES) {
            config.conserve_resources = parse_flag(ENV_CONSERVE_RESOURCES, &raw)?;
        }
        if let Some(raw) = get(ENV_BLOCK_IMAGES) {
            config.block_images = parse_flag(ENV_BLOCK_IMAGES, &raw)?;
        }
        if let Some(raw) = get(ENV_CHROMIUM_PATH) {
            config.chromium_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = get(ENV_RULES_FILE) {
            config.rules_file = Some(PathBuf::from(raw));
        }

        debug!(?config, "configuration resolved from environment");
        Ok(config)
    }

    /// Range-checks every setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first setting outside its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("fetch_timeout", self.fetch_timeout),
            ("navigation_timeout", self.navigation_timeout),
            ("navigation_retry_timeout", self.navigation_retry_timeout),
        ] {
            check_secs(name, value, TIMEOUT_RANGE_SECS)?;
        }
        check_secs("cache_ttl", self.cache_ttl, CACHE_TTL_RANGE_SECS)?;

        if self.settle_delay.as_secs_f64() > SETTLE_DELAY_MAX_SECS {
            return Err(ConfigError::OutOfRange {
                name: "settle_delay",
                value: format!("{}s", self.settle_delay.as_secs_f64()),
                min: "0s".to_string(),
                max: format!("{SETTLE_DELAY_MAX_SECS}s"),
            });
        }
        if self.scroll_steps > SCROLL_STEPS_MAX {
            return Err(ConfigError::OutOfRange {
                name: "scroll_steps",
                value: self.scroll_steps.to_string(),
                min: "0".to_string(),
                max: SCROLL_STEPS_MAX.to_string(),
            });
        }
        Ok(())
    }

    /// Browser timing settings derived from this configuration.
    #[must_use]
    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            navigation_timeout: self.navigation_timeout,
            navigation_retry_timeout: self.navigation_retry_timeout,
            scroll_steps: self.scroll_steps,
            scroll_pause: self.scroll_pause,
        }
    }

    /// Classifier rules: the configured file, else the built-in lists.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] when the configured file cannot be loaded.
    pub fn classifier_rules(&self) -> Result<ClassifierRules, RulesError> {
        match &self.rules_file {
            Some(path) => ClassifierRules::from_file(path),
            None => Ok(ClassifierRules::default()),
        }
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::invalid(name, raw, e.to_string()))
}

/// Parses non-negative, possibly fractional seconds.
pub fn parse_fractional_secs(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(name, raw, "expected seconds, e.g. 1.5"))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::invalid(name, raw, "must be a finite, non-negative number"))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, raw, "expected true/false")),
    }
}

fn check_secs(name: &'static str, value: Duration, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    let below = value < Duration::from_secs(min);
    let above = value > Duration::from_secs(max);
    if below || above {
        return Err(ConfigError::OutOfRange {
            name,
            value: format!("{}s", value.as_secs_f64()),
            min: format!("{min}s"),
            max: format!("{max}s"),
        });
    }
    Ok(())
}
