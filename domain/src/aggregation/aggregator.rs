//! Aggregator - merges handler results into one [`AggregatedResponse`].

use crate::aggregation::response::{AggregatedResponse, Conflict, OverallStatus, OversightReport};
use crate::core::error::DomainError;
use crate::execution::result::HandlerResult;
use crate::planning::plan::ExecutionPlan;
use std::collections::HashMap;

/// Stateless, payload-agnostic aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate results of `plan`.
    ///
    /// Results are ordered by stage; within a stage the incoming order is
    /// kept. Fails with [`DomainError::AggregationError`] when `results`
    /// is empty.
    pub fn aggregate(
        &self,
        plan: &ExecutionPlan,
        mut results: Vec<HandlerResult>,
    ) -> Result<AggregatedResponse, DomainError> {
        if results.is_empty() {
            return Err(DomainError::AggregationError);
        }

        results.sort_by_key(|r| r.stage);

        let status = OverallStatus::from_results(&results);
        let conflicts = Self::find_conflicts(plan, &results);
        let oversight = plan
            .aggregation_step
            .then(|| OversightReport::from_results(&results));
        let summary = Self::summarize(&results, &conflicts, oversight.as_ref());

        Ok(AggregatedResponse {
            status,
            pattern: plan.pattern,
            results,
            summary,
            conflicts,
            oversight,
        })
    }

    fn find_conflicts(plan: &ExecutionPlan, results: &[HandlerResult]) -> Vec<Conflict> {
        let by_name: HashMap<&str, &HandlerResult> =
            results.iter().map(|r| (r.handler.as_str(), r)).collect();

        results
            .iter()
            .filter(|r| r.is_success())
            .flat_map(|r| {
                plan.upstream_of(&r.handler)
                    .iter()
                    .filter_map(|upstream| by_name.get(upstream.as_str()))
                    .filter(|u| !u.is_success())
                    .map(|u| Conflict {
                        handler: r.handler.clone(),
                        upstream: u.handler.clone(),
                        upstream_status: u.status,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn summarize(
        results: &[HandlerResult],
        conflicts: &[Conflict],
        oversight: Option<&OversightReport>,
    ) -> String {
        let mut sections: Vec<String> = results
            .iter()
            .map(|r| {
                if r.is_success() {
                    format!("## {}\n{}", r.handler, r.payload_text())
                } else {
                    format!(
                        "## {} ({})\n{}",
                        r.handler,
                        r.status,
                        r.error.as_deref().unwrap_or("no detail")
                    )
                }
            })
            .collect();

        if let Some(report) = oversight {
            let mut block = format!(
                "## Oversight\n{}/{} handlers succeeded ({} failed, {} timed out, {} cancelled)",
                report.succeeded,
                report.total(),
                report.failed,
                report.timed_out,
                report.cancelled
            );
            for conflict in conflicts {
                block.push_str(&format!("\n- {}", conflict));
            }
            sections.push(block);
        }

        sections.join("\n\n")
    }
}
