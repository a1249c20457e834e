//! Incoming task request

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A free-form task description plus optional explicit domain hints.
///
/// Created per incoming task and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    text: String,
    domain_hints: BTreeSet<String>,
}

impl Request {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            domain_hints: BTreeSet::new(),
        }
    }

    /// Add a domain hint (normalized to lowercase).
    pub fn with_domain_hint(mut self, hint: impl AsRef<str>) -> Self {
        let hint = hint.as_ref().trim().to_lowercase();
        if !hint.is_empty() {
            self.domain_hints.insert(hint);
        }
        self
    }

    pub fn with_domain_hints<I, S>(self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hints
            .into_iter()
            .fold(self, |request, hint| request.with_domain_hint(hint))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn domain_hints(&self) -> &BTreeSet<String> {
        &self.domain_hints
    }
}

impl From<&str> for Request {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Request {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_hints_normalized_and_blank_dropped() {
        let request = Request::new("x").with_domain_hints(["Infra", "  ", "infra"]);
        assert_eq!(request.domain_hints().len(), 1);
        assert!(request.domain_hints().contains("infra"));
    }
}
