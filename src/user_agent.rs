//! Shared User-Agent strings for static and browser traffic.
//!
//! The target site serves bot-mitigation challenges to non-browser agents, so
//! the default identifies as a desktop Chrome build rather than as this tool.

/// Default browser-like User-Agent used when the caller supplies none.
pub const DEFAULT_BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Returns the configured UA override, or the default browser UA.
#[must_use]
pub(crate) fn effective_user_agent(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BROWSER_USER_AGENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_looks_like_browser() {
        assert!(DEFAULT_BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(DEFAULT_BROWSER_USER_AGENT.contains("Chrome/"));
        assert!(!DEFAULT_BROWSER_USER_AGENT.contains("  "), "line continuation must not leave double spaces");
    }

    #[test]
    fn test_effective_user_agent_prefers_override() {
        assert_eq!(effective_user_agent(Some("Custom/1.0")), "Custom/1.0");
    }

    #[test]
    fn test_effective_user_agent_blank_override_uses_default() {
        assert_eq!(effective_user_agent(Some("   ")), DEFAULT_BROWSER_USER_AGENT);
        assert_eq!(effective_user_agent(None), DEFAULT_BROWSER_USER_AGENT);
    }
}
