//! Keyword classifier
//!
//! Scores every registered handler against a request:
//!
//! - `+1` for each trigger keyword found in the request text
//!   (case-insensitive substring match)
//! - `+domain_hint_weight` for each explicit domain hint the handler covers
//!
//! Handlers scoring zero are dropped. The rest are sorted by score
//! descending; ties go to the handler registered first. The classifier
//! is a pure function of (request, registry).

use crate::core::error::DomainError;
use crate::handler::registry::HandlerRegistry;
use crate::routing::request::Request;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default bonus for each matched domain hint
pub const DEFAULT_DOMAIN_HINT_WEIGHT: u32 = 2;

/// A handler selected for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Matched handler name
    pub handler: String,
    /// Confidence score (trigger hits plus weighted hint hits)
    pub score: u32,
    /// Trigger keywords that were found in the request text
    pub matched_triggers: BTreeSet<String>,
    /// Domain hints that matched one of the handler's domains
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub matched_domains: BTreeSet<String>,
}

/// Keyword/domain scoring classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    domain_hint_weight: u32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            domain_hint_weight: DEFAULT_DOMAIN_HINT_WEIGHT,
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain_hint_weight(mut self, weight: u32) -> Self {
        self.domain_hint_weight = weight;
        self
    }

    pub fn domain_hint_weight(&self) -> u32 {
        self.domain_hint_weight
    }

    /// Classify a request against a registry snapshot.
    ///
    /// Fails with [`DomainError::NoMatch`] when no handler scores above zero.
    pub fn classify(
        &self,
        request: &Request,
        registry: &HandlerRegistry,
    ) -> Result<Vec<Match>, DomainError> {
        let text = request.text().to_lowercase();

        // Registry iteration is in registration order and sort_by is stable,
        // so equal scores keep the earliest registered handler first.
        let mut matches: Vec<Match> = registry
            .all()
            .filter_map(|descriptor| {
                let matched_triggers: BTreeSet<String> = descriptor
                    .triggers
                    .iter()
                    .filter(|trigger| text.contains(trigger.as_str()))
                    .cloned()
                    .collect();

                let matched_domains: BTreeSet<String> = descriptor
                    .domains
                    .intersection(request.domain_hints())
                    .cloned()
                    .collect();

                let score = matched_triggers.len() as u32
                    + self.domain_hint_weight * matched_domains.len() as u32;

                (score > 0).then(|| Match {
                    handler: descriptor.name.clone(),
                    score,
                    matched_triggers,
                    matched_domains,
                })
            })
            .collect();

        if matches.is_empty() {
            return Err(DomainError::NoMatch);
        }

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(matches)
    }
}
