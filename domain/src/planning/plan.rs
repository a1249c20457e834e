//! Execution plan value objects.

use crate::core::error::DomainError;
use crate::handler::registry::HandlerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the matched handlers are orchestrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationPattern {
    /// One handler, one stage
    Single,
    /// Stages ordered by declared dependencies
    Sequential,
    /// All handlers in one concurrent stage
    Parallel,
    /// Sequential or parallel stages followed by an aggregation step
    Hierarchical,
    /// Stage 2 receives stage 1's full result as its sole input
    HandOff,
}

impl OrchestrationPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationPattern::Single => "single",
            OrchestrationPattern::Sequential => "sequential",
            OrchestrationPattern::Parallel => "parallel",
            OrchestrationPattern::Hierarchical => "hierarchical",
            OrchestrationPattern::HandOff => "hand_off",
        }
    }
}

impl fmt::Display for OrchestrationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of handlers executed concurrently within one step of a plan.
///
/// The order of `handlers` is dispatch order (match rank), not a
/// completion-order guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub handlers: Vec<String>,
}

impl Stage {
    pub fn new<I, S>(handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handlers: handlers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.handlers.iter().any(|h| h == handler)
    }
}

/// Hand-off link between the two stages of a [`OrchestrationPattern::HandOff`] plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandOff {
    pub from: String,
    pub to: String,
}

/// Ordered stages plus the metadata the dispatcher and aggregator need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub pattern: OrchestrationPattern,
    pub stages: Vec<Stage>,
    /// Whether a final aggregation step runs after all stages
    pub aggregation_step: bool,
    /// Handler -> handlers (in earlier stages) whose results it consumes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub upstream: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_off: Option<HandOff>,
}

impl ExecutionPlan {
    /// Every handler in the plan, stage by stage, in dispatch order
    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.handlers.iter().map(String::as_str))
    }

    pub fn handler_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    /// Index of the stage containing `handler`
    pub fn stage_of(&self, handler: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(handler))
    }

    /// Handlers whose results feed `handler`
    pub fn upstream_of(&self, handler: &str) -> &[String] {
        self.upstream
            .get(handler)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Check every handler named by the plan exists in `registry`.
    pub fn validate(&self, registry: &HandlerRegistry) -> Result<(), DomainError> {
        for handler in self.handlers() {
            registry.lookup(handler)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::descriptor::HandlerDescriptor;

    fn two_stage_plan() -> ExecutionPlan {
        ExecutionPlan {
            pattern: OrchestrationPattern::Sequential,
            stages: vec![Stage::new(["a"]), Stage::new(["b", "c"])],
            aggregation_step: false,
            upstream: BTreeMap::from([("b".to_string(), vec!["a".to_string()])]),
            hand_off: None,
        }
    }

    #[test]
    fn test_handlers_in_stage_order() {
        let plan = two_stage_plan();
        assert_eq!(plan.handlers().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(plan.handler_count(), 3);
        assert_eq!(plan.stage_of("c"), Some(1));
        assert_eq!(plan.upstream_of("b"), ["a".to_string()]);
        assert!(plan.upstream_of("c").is_empty());
    }

    #[test]
    fn test_validate_against_registry() {
        let plan = two_stage_plan();
        let registry = HandlerRegistry::from_descriptors(vec![
            HandlerDescriptor::new("a"),
            HandlerDescriptor::new("b"),
        ])
        .unwrap();

        assert_eq!(
            plan.validate(&registry),
            Err(DomainError::UnknownHandler("c".to_string()))
        );
    }

    #[test]
    fn test_pattern_serializes_snake_case() {
        let json = serde_json::to_string(&OrchestrationPattern::HandOff).unwrap();
        assert_eq!(json, "\"hand_off\"");
    }
}
