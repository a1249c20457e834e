//! Application-level configuration.
//!
//! Controls how the routing and dispatch use cases behave: per-handler
//! timeout, classifier weighting and the no-match fallback.

use delegate_domain::DEFAULT_DOMAIN_HINT_WEIGHT;
use std::time::Duration;

/// Dispatch behavior configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum time a single handler invocation may take.
    ///
    /// `None` means handlers run until they finish or the plan is cancelled.
    pub handler_timeout: Option<Duration>,
    /// Score bonus for each explicit domain hint a handler covers.
    pub domain_hint_weight: u32,
    /// Handler used when classification finds no match.
    pub fallback_handler: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout: None,
            domain_hint_weight: DEFAULT_DOMAIN_HINT_WEIGHT,
            fallback_handler: None,
        }
    }
}

impl DispatchConfig {
    /// Sets the per-handler timeout in whole seconds, keeping other settings.
    pub fn with_timeout_seconds(self, seconds: u64) -> Self {
        self.with_handler_timeout(Duration::from_secs(seconds))
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn with_domain_hint_weight(mut self, weight: u32) -> Self {
        self.domain_hint_weight = weight;
        self
    }

    pub fn with_fallback_handler(mut self, name: impl Into<String>) -> Self {
        self.fallback_handler = Some(name.into());
        self
    }
}
