//! Domain error types

use thiserror::Error;

/// Structural errors raised by the registry, classifier, planner and aggregator.
///
/// Any of these aborts a request before a single handler has run.
/// Per-invocation failures are never represented here; they are captured
/// inside a [`HandlerResult`](crate::execution::result::HandlerResult).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    #[error("No handler matched the request")]
    NoMatch,

    #[error("Cyclic dependency between handlers: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Nothing to aggregate: result sequence is empty")]
    AggregationError,

    #[error("Invalid handler descriptor: {0}")]
    InvalidDescriptor(String),
}

impl DomainError {
    /// Check if this error means classification found nothing
    pub fn is_no_match(&self) -> bool {
        matches!(self, DomainError::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dependency_display() {
        let error = DomainError::CyclicDependency(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Cyclic dependency between handlers: a -> b -> a"
        );
    }

    #[test]
    fn test_is_no_match_check() {
        assert!(DomainError::NoMatch.is_no_match());
        assert!(!DomainError::AggregationError.is_no_match());
        assert!(!DomainError::UnknownHandler("x".to_string()).is_no_match());
    }
}
