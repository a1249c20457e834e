//! Aggregated response value objects - the terminal artifact of a request.

use crate::execution::result::{HandlerResult, HandlerStatus};
use crate::planning::plan::OrchestrationPattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome across all handlers of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every handler succeeded
    Success,
    /// At least one handler succeeded and at least one did not
    Partial,
    /// No handler succeeded
    Failure,
}

impl OverallStatus {
    /// Derive the overall status from individual results.
    pub fn from_results(results: &[HandlerResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        if succeeded == results.len() {
            OverallStatus::Success
        } else if succeeded == 0 {
            OverallStatus::Failure
        } else {
            OverallStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::Partial => "partial",
            OverallStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful result that consumed input from an unsuccessful upstream handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// The handler whose output may be built on incomplete input
    pub handler: String,
    /// The upstream handler that did not succeed
    pub upstream: String,
    pub upstream_status: HandlerStatus,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded but its upstream {} ended with {}",
            self.handler, self.upstream, self.upstream_status
        )
    }
}

/// Final aggregation step for hierarchical plans
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OversightReport {
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
}

impl OversightReport {
    pub fn from_results(results: &[HandlerResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut report, result| {
                match result.status {
                    HandlerStatus::Success => report.succeeded += 1,
                    HandlerStatus::Failure => report.failed += 1,
                    HandlerStatus::Timeout => report.timed_out += 1,
                    HandlerStatus::Cancelled => report.cancelled += 1,
                }
                report
            })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.timed_out + self.cancelled
    }
}

/// Unified response returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub status: OverallStatus,
    /// Pattern the plan ran with
    pub pattern: OrchestrationPattern,
    /// Results in stage-then-dispatch order
    pub results: Vec<HandlerResult>,
    /// Payloads concatenated under handler names
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,
    /// Present when the plan carried an aggregation step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversight: Option<OversightReport>,
}

impl AggregatedResponse {
    /// Whether the plan was cancelled before every handler finished
    pub fn was_cancelled(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.status == HandlerStatus::Cancelled)
    }

    pub fn successful_results(&self) -> impl Iterator<Item = &HandlerResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &HandlerResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}
