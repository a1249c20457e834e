//! Dispatch observation port
//!
//! Defines the interface for reporting progress while a plan executes.

use delegate_domain::{AggregatedResponse, ExecutionPlan, HandlerResult};

/// Callback for progress updates during plan dispatch
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain text, etc.)
pub trait DispatchObserver: Send + Sync {
    /// Called once before the first stage starts
    fn on_plan_start(&self, _plan: &ExecutionPlan) {}

    /// Called when a stage starts
    fn on_stage_start(&self, stage: usize, handlers: &[String]);

    /// Called when a handler invocation is spawned
    fn on_handler_start(&self, _stage: usize, _handler: &str) {}

    /// Called when a handler reaches a terminal state
    fn on_handler_complete(&self, result: &HandlerResult);

    /// Called once every handler of the stage is terminal
    fn on_stage_complete(&self, stage: usize);

    /// Called after aggregation
    fn on_plan_complete(&self, _response: &AggregatedResponse) {}
}

/// No-op observer for when progress reporting is not needed
pub struct NoProgress;

impl DispatchObserver for NoProgress {
    fn on_stage_start(&self, _stage: usize, _handlers: &[String]) {}
    fn on_handler_complete(&self, _result: &HandlerResult) {}
    fn on_stage_complete(&self, _stage: usize) {}
}
