//! Error types for the browser strategy.

use thiserror::Error;

/// Errors that can occur while rendering a document in a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The engine could not be started at all (missing executable, spawn failure).
    #[error("browser launch failed: {reason}")]
    Launch {
        /// Why the launch failed.
        reason: String,
    },

    /// Navigation did not reach network quiescence within the bound, after one retry.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout {
        /// The URL being navigated to.
        url: String,
        /// The final (longer) bound that elapsed.
        timeout_ms: u64,
    },

    /// Any other fault inside a running session (CDP error, script failure).
    #[error("browser session error: {reason}")]
    Session {
        /// What went wrong.
        reason: String,
    },
}

impl BrowserError {
    /// Creates a launch error.
    pub fn launch(reason: impl Into<String>) -> Self {
        Self::Launch {
            reason: reason.into(),
        }
    }

    /// Creates a navigation timeout error.
    pub fn navigation_timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::NavigationTimeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Creates a session error.
    pub fn session(reason: impl Into<String>) -> Self {
        Self::Session {
            reason: reason.into(),
        }
    }

    /// Returns true when the engine never started, so the strategy could not run.
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }

    /// Stable short label for the failure class.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Launch { .. } => "browser_launch_error",
            Self::NavigationTimeout { .. } => "browser_navigation_timeout",
            Self::Session { .. } => "browser_session_error",
        }
    }
}
