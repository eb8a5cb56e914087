//! Detection of embedded in-app browsers that break file uploads.

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// User-agent fragments of in-app browsers known to mishandle file pickers.
pub const DEFAULT_USER_AGENT_PATTERNS: &[&str] =
    &[r"\bInstagram\b", r"\bFBAN/", r"\bFBAV/", r"\bFB_IAB\b"];

/// Globals injected by those browsers into the page.
pub const DEFAULT_GLOBAL_MARKERS: &[&str] = &["__instagramWebView", "FbQuoteShareJSInterface"];

/// Classes those browsers add to the document root.
pub const DEFAULT_DOM_CLASS_MARKERS: &[&str] = &["instagram-browser", "fb-iab"];

/// Signals a host collects from the client environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSignals {
    pub user_agent: String,
    /// Names of notable globals present on the page.
    pub globals: Vec<String>,
    /// Classes on the document root element.
    pub dom_classes: Vec<String>,
}

/// Predicate over [`ClientSignals`] for restricted browser contexts.
#[derive(Debug, Clone)]
pub struct EnvironmentGuard {
    user_agents: RegexSet,
    global_markers: Vec<String>,
    dom_class_markers: Vec<String>,
}

impl EnvironmentGuard {
    /// Build a guard from case-insensitive user-agent patterns and exact
    /// global/class markers.
    pub fn new<P, G, C>(
        user_agent_patterns: P,
        global_markers: G,
        dom_class_markers: C,
    ) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let patterns = user_agent_patterns
            .into_iter()
            .map(|pattern| format!("(?i){}", pattern.as_ref()));
        let user_agents = RegexSet::new(patterns)
            .map_err(|error| Error::InvalidInput(format!("Invalid user-agent pattern: {error}")))?;

        Ok(Self {
            user_agents,
            global_markers: global_markers.into_iter().map(Into::into).collect(),
            dom_class_markers: dom_class_markers.into_iter().map(Into::into).collect(),
        })
    }

    /// Guard for the known Instagram and Facebook in-app browsers.
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            DEFAULT_USER_AGENT_PATTERNS.iter().copied(),
            DEFAULT_GLOBAL_MARKERS.iter().copied(),
            DEFAULT_DOM_CLASS_MARKERS.iter().copied(),
        )
    }

    /// Whether any signal points at a restricted embedded browser.
    pub fn is_restricted_browser_context(&self, signals: &ClientSignals) -> bool {
        self.user_agents.is_match(&signals.user_agent)
            || signals
                .globals
                .iter()
                .any(|name| self.global_markers.contains(name))
            || signals
                .dom_classes
                .iter()
                .any(|class| self.dom_class_markers.contains(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFARI_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const INSTAGRAM_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 Instagram 302.0.0.23.114";
    const FACEBOOK_UA: &str = "Mozilla/5.0 (Linux; Android 13) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/119.0 Mobile Safari/537.36 [FB_IAB/FB4A;FBAV/442.0.0.32.113;]";

    fn signals(user_agent: &str) -> ClientSignals {
        ClientSignals {
            user_agent: user_agent.to_string(),
            ..ClientSignals::default()
        }
    }

    #[test]
    fn regular_browser_is_not_restricted() {
        let guard = EnvironmentGuard::with_defaults().unwrap();
        assert!(!guard.is_restricted_browser_context(&signals(SAFARI_UA)));
        assert!(!guard.is_restricted_browser_context(&ClientSignals::default()));
    }

    #[test]
    fn in_app_user_agents_are_restricted() {
        let guard = EnvironmentGuard::with_defaults().unwrap();
        assert!(guard.is_restricted_browser_context(&signals(INSTAGRAM_UA)));
        assert!(guard.is_restricted_browser_context(&signals(FACEBOOK_UA)));
        assert!(guard.is_restricted_browser_context(&signals("something INSTAGRAM something")));
    }

    #[test]
    fn global_or_class_marker_alone_is_enough() {
        let guard = EnvironmentGuard::with_defaults().unwrap();

        let mut by_global = signals(SAFARI_UA);
        by_global.globals.push("__instagramWebView".to_string());
        assert!(guard.is_restricted_browser_context(&by_global));

        let mut by_class = signals(SAFARI_UA);
        by_class.dom_classes = vec!["js".to_string(), "instagram-browser".to_string()];
        assert!(guard.is_restricted_browser_context(&by_class));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = EnvironmentGuard::new(["(unclosed"], Vec::<String>::new(), Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
