//! Task context passed to each handler invocation.

use crate::execution::result::HandlerResult;
use crate::routing::request::Request;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The slice of a request a handler sees, plus results of earlier stages
/// it depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Handler being invoked
    pub handler: String,
    /// Stage index within the plan
    pub stage: usize,
    /// Original request text
    pub request: String,
    /// Explicit domain hints from the request
    #[serde(default)]
    pub domain_hints: BTreeSet<String>,
    /// Triggers that selected this handler (empty if it was not classified directly)
    #[serde(default)]
    pub matched_triggers: BTreeSet<String>,
    /// Results of declared upstream handlers from earlier stages
    #[serde(default)]
    pub upstream: Vec<HandlerResult>,
    /// Full result of the previous stage in a hand-off plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_off: Option<HandlerResult>,
}

impl TaskContext {
    pub fn new(handler: impl Into<String>, stage: usize, request: &Request) -> Self {
        Self {
            handler: handler.into(),
            stage,
            request: request.text().to_string(),
            domain_hints: request.domain_hints().clone(),
            matched_triggers: BTreeSet::new(),
            upstream: Vec::new(),
            hand_off: None,
        }
    }

    pub fn with_matched_triggers(mut self, triggers: BTreeSet<String>) -> Self {
        self.matched_triggers = triggers;
        self
    }

    pub fn with_upstream(mut self, upstream: Vec<HandlerResult>) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_hand_off(mut self, result: HandlerResult) -> Self {
        self.hand_off = Some(result);
        self
    }

    /// Upstream payloads rendered as `[name]\npayload` blocks
    pub fn upstream_text(&self) -> String {
        self.upstream
            .iter()
            .chain(self.hand_off.iter())
            .filter(|r| r.is_success())
            .map(|r| format!("[{}]\n{}", r.handler, r.payload_text()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
