//! Console output formatter for routing results

use colored::Colorize;
use delegate_domain::{
    AggregatedResponse, ExecutionPlan, HandlerDescriptor, HandlerStatus, Match, OverallStatus,
};
use std::sync::Arc;

/// Formats plans and aggregated responses for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Enable or disable colored output globally
    pub fn set_color(enabled: bool) {
        if !enabled {
            colored::control::set_override(false);
        }
    }

    /// Format the complete response
    pub fn format(request: &str, response: &AggregatedResponse) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Delegation Results"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Request:".cyan().bold(), request));
        output.push_str(&format!(
            "{} {}\n",
            "Pattern:".cyan().bold(),
            response.pattern
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::overall_status(response.status)
        ));

        output.push_str(&Self::section_header("Handler Results"));
        for result in &response.results {
            let title = format!(
                "── {} (stage {}, {} ms) ──",
                result.handler, result.stage, result.duration_ms
            );
            if result.is_success() {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    title.yellow().bold(),
                    result.payload_text()
                ));
            } else {
                output.push_str(&format!(
                    "\n{} {}\nError: {}\n",
                    title.red().bold(),
                    Self::handler_status(result.status),
                    result.error.as_deref().unwrap_or("Unknown")
                ));
            }
        }

        if !response.conflicts.is_empty() {
            output.push_str(&format!("\n{}\n", "Conflicts:".yellow().bold()));
            for conflict in &response.conflicts {
                output.push_str(&format!("  * {}\n", conflict));
            }
        }

        if let Some(oversight) = &response.oversight {
            output.push_str(&Self::section_header("Oversight"));
            output.push_str(&format!(
                "{}/{} succeeded, {} failed, {} timed out, {} cancelled\n",
                oversight.succeeded,
                oversight.total(),
                oversight.failed,
                oversight.timed_out,
                oversight.cancelled
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(response: &AggregatedResponse) -> String {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the synthesized summary only (concise output)
    pub fn format_summary(response: &AggregatedResponse) -> String {
        let succeeded = response.successful_results().count();
        let unsuccessful = response
            .failed_results()
            .map(|r| format!("{} ({})", r.handler, r.status))
            .collect::<Vec<_>>();

        let mut output = format!(
            "{} {} ({}/{} handlers succeeded)\n",
            "Status:".bold(),
            Self::overall_status(response.status),
            succeeded,
            response.results.len()
        );
        if !unsuccessful.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Did not succeed:".yellow(),
                unsuccessful.join(", ")
            ));
        }
        output.push_str(&format!("\n{}\n", response.summary));
        output
    }

    /// Format an execution plan (for `--plan-only`)
    pub fn format_plan(plan: &ExecutionPlan, matches: &[Match], used_fallback: bool) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", "=== Execution Plan ===".cyan().bold()));
        output.push_str(&format!("{} {}\n", "Pattern:".bold(), plan.pattern));
        if used_fallback {
            output.push_str(&format!("{}\n", "(no handler matched, using fallback)".dimmed()));
        }

        output.push_str(&format!("\n{}\n", "Matches:".bold()));
        for m in matches {
            let triggers = m
                .matched_triggers
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let skipped = if plan.stage_of(&m.handler).is_none() {
                " (not in plan)"
            } else {
                ""
            };
            output.push_str(&format!(
                "  {} {} {}{}\n",
                m.handler.yellow(),
                format!("score={}", m.score).dimmed(),
                triggers.dimmed(),
                skipped.dimmed()
            ));
        }

        output.push_str(&format!("\n{}\n", "Stages:".bold()));
        for (index, stage) in plan.stages.iter().enumerate() {
            output.push_str(&format!("  {} {}\n", format!("[{}]", index).cyan(), stage.handlers.join(", ")));
            for handler in &stage.handlers {
                let upstream = plan.upstream_of(handler);
                if !upstream.is_empty() {
                    output.push_str(&format!(
                        "      {} <- {}\n",
                        handler,
                        upstream.join(", ")
                    ));
                }
            }
        }

        if plan.aggregation_step {
            output.push_str(&format!("\n{}\n", "Aggregation oversight enabled".dimmed()));
        }

        output
    }

    /// Format registered handlers (for `--list-handlers`)
    pub fn format_handlers<'a, I>(handlers: I) -> String
    where
        I: IntoIterator<Item = &'a Arc<HandlerDescriptor>>,
    {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "=== Registered Handlers ===".cyan().bold()));

        let mut count = 0;
        for handler in handlers {
            count += 1;
            output.push_str(&format!("\n{}\n", handler.name.yellow().bold()));
            output.push_str(&format!(
                "  triggers: {}\n",
                Self::join(handler.triggers.iter())
            ));
            output.push_str(&format!(
                "  domains:  {}\n",
                Self::join(handler.domains.iter())
            ));
            if !handler.depends_on.is_empty() {
                output.push_str(&format!(
                    "  depends:  {}\n",
                    Self::join(handler.depends_on.iter())
                ));
            }
            if let Some(target) = &handler.hand_off_to {
                output.push_str(&format!("  hand-off: {}\n", target));
            }
            if handler.requires_aggregation {
                output.push_str("  requires aggregation\n");
            }
            for capability in &handler.capabilities {
                output.push_str(&format!("  * {}\n", capability));
            }
        }

        if count == 0 {
            output.push_str(&format!("\n{}\n", "(no handlers configured)".dimmed()));
        }
        output
    }

    fn join<'a>(values: impl Iterator<Item = &'a String>) -> String {
        let joined = values.map(String::as_str).collect::<Vec<_>>().join(", ");
        if joined.is_empty() {
            "-".to_string()
        } else {
            joined
        }
    }

    fn overall_status(status: OverallStatus) -> String {
        match status {
            OverallStatus::Success => status.as_str().green().bold().to_string(),
            OverallStatus::Partial => status.as_str().yellow().bold().to_string(),
            OverallStatus::Failure => status.as_str().red().bold().to_string(),
        }
    }

    fn handler_status(status: HandlerStatus) -> String {
        match status {
            HandlerStatus::Success => status.as_str().green().to_string(),
            HandlerStatus::Cancelled => status.as_str().dimmed().to_string(),
            _ => status.as_str().red().to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegate_domain::{HandlerResult, OrchestrationPattern, OversightReport, Stage};
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    fn response() -> AggregatedResponse {
        let results = vec![
            HandlerResult::success("terraform", 0, json!("vpc ready")),
            HandlerResult::failure("kubernetes", 1, "helm exploded"),
        ];
        AggregatedResponse {
            status: OverallStatus::Partial,
            pattern: OrchestrationPattern::Hierarchical,
            oversight: Some(OversightReport::from_results(&results)),
            results,
            summary: "## terraform\nvpc ready".to_string(),
            conflicts: vec![],
        }
    }

    #[test]
    fn test_format_full_lists_results() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format("deploy", &response());

        assert!(text.contains("Request: deploy"));
        assert!(text.contains("Pattern: hierarchical"));
        assert!(text.contains("vpc ready"));
        assert!(text.contains("Error: helm exploded"));
        assert!(text.contains("1/2 succeeded"));
    }

    #[test]
    fn test_format_summary_counts_outcomes() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_summary(&response());

        assert!(text.starts_with("Status: partial (1/2 handlers succeeded)"));
        assert!(text.contains("Did not succeed: kubernetes (failure)"));
        assert!(text.ends_with("## terraform\nvpc ready\n"));
    }

    #[test]
    fn test_format_json_round_trips() {
        let json = ConsoleFormatter::format_json(&response());
        let parsed: AggregatedResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response());
    }

    #[test]
    fn test_format_plan() {
        colored::control::set_override(false);
        let plan = ExecutionPlan {
            pattern: OrchestrationPattern::Sequential,
            stages: vec![Stage::new(["terraform"]), Stage::new(["kubernetes"])],
            aggregation_step: false,
            upstream: BTreeMap::from([(
                "kubernetes".to_string(),
                vec!["terraform".to_string()],
            )]),
            hand_off: None,
        };
        let matches = vec![
            Match {
                handler: "terraform".to_string(),
                score: 2,
                matched_triggers: BTreeSet::from(["terraform".to_string()]),
                matched_domains: BTreeSet::new(),
            },
            Match {
                handler: "docs".to_string(),
                score: 1,
                matched_triggers: BTreeSet::from(["readme".to_string()]),
                matched_domains: BTreeSet::new(),
            },
        ];

        let text = ConsoleFormatter::format_plan(&plan, &matches, false);
        assert!(text.contains("Pattern: sequential"));
        assert!(text.contains("[1] kubernetes"));
        assert!(text.contains("kubernetes <- terraform"));
        assert!(text.contains("score=2"));
        assert!(text.contains("docs score=1 readme (not in plan)"));
        assert!(!text.contains("terraform score=2 terraform (not in plan)"));
    }

    #[test]
    fn test_format_handlers() {
        colored::control::set_override(false);
        let handlers = vec![Arc::new(
            HandlerDescriptor::new("docs")
                .with_trigger("readme")
                .with_capability("Write docs"),
        )];

        let text = ConsoleFormatter::format_handlers(&handlers);
        assert!(text.contains("docs"));
        assert!(text.contains("triggers: readme"));
        assert!(text.contains("domains:  -"));
        assert!(text.contains("* Write docs"));

        let empty: Vec<Arc<HandlerDescriptor>> = Vec::new();
        assert!(ConsoleFormatter::format_handlers(&empty).contains("no handlers configured"));
    }
}
