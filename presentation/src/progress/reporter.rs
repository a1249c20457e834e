//! Progress reporting for plan dispatch

use colored::Colorize;
use delegate_application::DispatchObserver;
use delegate_domain::{ExecutionPlan, HandlerResult, HandlerStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports dispatch progress with one progress bar per stage
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_count: Mutex<usize>,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_count: Mutex::new(0),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn stage_name(stage: usize, total: usize) -> String {
        if total > 0 {
            format!("Stage {}/{}", stage + 1, total)
        } else {
            format!("Stage {}", stage + 1)
        }
    }

    fn status_mark(result: &HandlerResult) -> String {
        match result.status {
            HandlerStatus::Success => format!("{} {}", "v".green(), result.handler),
            HandlerStatus::Timeout => format!("{} {} (timeout)", "!".yellow(), result.handler),
            HandlerStatus::Cancelled => format!("{} {} (cancelled)", "-".dimmed(), result.handler),
            HandlerStatus::Failure => format!("{} {}", "x".red(), result.handler),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchObserver for ProgressReporter {
    fn on_plan_start(&self, plan: &ExecutionPlan) {
        if let Ok(mut count) = self.stage_count.lock() {
            *count = plan.stages.len();
        }
    }

    fn on_stage_start(&self, stage: usize, handlers: &[String]) {
        let total = self.stage_count.lock().map(|c| *c).unwrap_or(0);

        let pb = self.multi.add(ProgressBar::new(handlers.len() as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(Self::stage_name(stage, total));
        pb.set_message(handlers.join(", "));

        if let Ok(mut bar) = self.stage_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_handler_complete(&self, result: &HandlerResult) {
        if let Ok(bar) = self.stage_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            pb.set_message(Self::status_mark(result));
            pb.inc(1);
        }
    }

    fn on_stage_complete(&self, stage: usize) {
        if let Ok(mut bar) = self.stage_bar.lock()
            && let Some(pb) = bar.take()
        {
            pb.finish_with_message(format!("Stage {} complete!", stage + 1).green().to_string());
        }
    }
}

/// Plain line-based progress for non-interactive stderr (pipes, CI logs)
pub struct SimpleProgress;

impl SimpleProgress {
    fn plan_line(plan: &ExecutionPlan) -> String {
        format!(
            "{} {} ({} handlers in {} stages)",
            "->".cyan(),
            plan.pattern.to_string().bold(),
            plan.handler_count(),
            plan.stages.len()
        )
    }

    fn stage_line(stage: usize, handlers: &[String]) -> String {
        format!(
            "{} {} [{}]",
            "->".cyan(),
            ProgressReporter::stage_name(stage, 0).bold(),
            handlers.join(", ")
        )
    }
}

impl DispatchObserver for SimpleProgress {
    fn on_plan_start(&self, plan: &ExecutionPlan) {
        eprintln!("{}", Self::plan_line(plan));
    }

    fn on_stage_start(&self, stage: usize, handlers: &[String]) {
        eprintln!("{}", Self::stage_line(stage, handlers));
    }

    fn on_handler_complete(&self, result: &HandlerResult) {
        eprintln!("  {}", ProgressReporter::status_mark(result));
    }

    fn on_stage_complete(&self, _stage: usize) {}
}
