//! Domain layer for delegate
//!
//! This crate contains the delegation pipeline's types and pure algorithms.
//! It has no dependencies on a runtime, I/O or presentation concerns.
//!
//! # Pipeline
//!
//! ```text
//! Request ─▶ Classifier ─▶ Match(es) ─▶ ExecutionPlanner ─▶ ExecutionPlan
//!                                                             │
//!     AggregatedResponse ◀─ Aggregator ◀─ HandlerResult(s) ◀──┘ (dispatch)
//! ```
//!
//! - **Handler Registry**: descriptors keyed by unique name, registration order kept
//! - **Classifier**: keyword + domain-hint scoring, ties broken by registration order
//! - **Execution Planner**: Single / Parallel / Sequential / Hierarchical / HandOff
//! - **Aggregator**: overall status, stage-ordered summary, conflict flags
//!
//! Dispatch itself needs a runtime and lives in the application layer.

pub mod aggregation;
pub mod core;
pub mod execution;
pub mod handler;
pub mod planning;
pub mod routing;

// Re-export commonly used types
pub use aggregation::{
    aggregator::Aggregator,
    response::{AggregatedResponse, Conflict, OverallStatus, OversightReport},
};
pub use core::error::DomainError;
pub use execution::{
    context::TaskContext,
    result::{HandlerResult, HandlerStatus},
};
pub use handler::{descriptor::HandlerDescriptor, registry::HandlerRegistry};
pub use planning::{
    plan::{ExecutionPlan, HandOff, OrchestrationPattern, Stage},
    planner::ExecutionPlanner,
};
pub use routing::{
    classifier::{Classifier, DEFAULT_DOMAIN_HINT_WEIGHT, Match},
    request::Request,
};
