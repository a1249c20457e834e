//! Handler descriptor - the static description of a registered specialist.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Describes a specialist handler: what triggers it, which domains it
/// covers, and how it relates to other handlers during planning.
///
/// Descriptors are immutable once registered. Triggers and domain tags
/// are normalized to lowercase so classification is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Unique handler identifier
    pub name: String,
    /// Keywords whose presence in the request text routes work here
    pub triggers: BTreeSet<String>,
    /// Domain tags this handler covers
    pub domains: BTreeSet<String>,
    /// Short human-readable capability descriptions, in declaration order
    pub capabilities: Vec<String>,
    /// Domain tags whose handlers must run before this one
    pub depends_on: BTreeSet<String>,
    /// Whether plans containing this handler need a final aggregation step
    pub requires_aggregation: bool,
    /// Handler that receives this handler's full output as its sole input
    pub hand_off_to: Option<String>,
}

impl HandlerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggers: BTreeSet::new(),
            domains: BTreeSet::new(),
            capabilities: Vec::new(),
            depends_on: BTreeSet::new(),
            requires_aggregation: false,
            hand_off_to: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl AsRef<str>) -> Self {
        self.triggers.insert(normalize(trigger.as_ref()));
        self
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.triggers
            .extend(triggers.into_iter().map(|t| normalize(t.as_ref())));
        self
    }

    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domains.insert(normalize(domain.as_ref()));
        self
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domains
            .extend(domains.into_iter().map(|d| normalize(d.as_ref())));
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Declare that this handler consumes the output of handlers in `domain`.
    pub fn depends_on(mut self, domain: impl AsRef<str>) -> Self {
        self.depends_on.insert(normalize(domain.as_ref()));
        self
    }

    pub fn requiring_aggregation(mut self) -> Self {
        self.requires_aggregation = true;
        self
    }

    pub fn hand_off_to(mut self, target: impl Into<String>) -> Self {
        self.hand_off_to = Some(target.into());
        self
    }

    /// Returns `true` if this handler depends on any domain `other` covers.
    pub fn depends_on_handler(&self, other: &HandlerDescriptor) -> bool {
        self.name != other.name && !self.depends_on.is_disjoint(&other.domains)
    }

    /// Check the descriptor is usable for registration.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidDescriptor(
                "handler name cannot be empty".to_string(),
            ));
        }
        if self.triggers.iter().any(|t| t.is_empty()) {
            return Err(DomainError::InvalidDescriptor(format!(
                "handler '{}' has an empty trigger",
                self.name
            )));
        }
        if self.hand_off_to.as_deref() == Some(self.name.as_str()) {
            return Err(DomainError::InvalidDescriptor(format!(
                "handler '{}' cannot hand off to itself",
                self.name
            )));
        }
        Ok(())
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
