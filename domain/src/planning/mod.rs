//! Execution planning
//!
//! - [`plan::ExecutionPlan`] - ordered stages and orchestration pattern
//! - [`planner::ExecutionPlanner`] - deterministic matches → plan rules

pub mod plan;
pub mod planner;
