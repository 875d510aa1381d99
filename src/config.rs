//! Host configuration.

use serde::{Deserialize, Serialize};

/// Maximum redirect depth to prevent infinite redirect loops.
pub const DEFAULT_MAX_REDIRECT_DEPTH: usize = 5;

/// Tunables for a [`NavigationHost`](crate::NavigationHost).
///
/// Missing keys fall back to their defaults when deserializing:
///
/// ```
/// use spa_navigator::HostConfig;
///
/// let config = HostConfig::from_json(r#"{ "max_redirect_depth": 3 }"#).unwrap();
/// assert_eq!(config.max_redirect_depth, 3);
/// assert!(config.update_history);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// A redirect whose `parent` chain grows deeper than this is rejected with
    /// [`NavigationError::RedirectLoop`](crate::NavigationError::RedirectLoop).
    pub max_redirect_depth: usize,
    /// Write settled navigations to the environment's history.
    pub update_history: bool,
}

impl HostConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`max_redirect_depth`](Self::max_redirect_depth).
    pub fn max_redirect_depth(mut self, depth: usize) -> Self {
        self.max_redirect_depth = depth;
        self
    }

    /// Set [`update_history`](Self::update_history).
    pub fn update_history(mut self, enabled: bool) -> Self {
        self.update_history = enabled;
        self
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_redirect_depth: DEFAULT_MAX_REDIRECT_DEPTH,
            update_history: true,
        }
    }
}
