//! Dispatch Plan use case
//!
//! Executes an [`ExecutionPlan`] stage by stage:
//!
//! - Handlers in one stage run as independent tokio tasks.
//! - The next stage starts only after every handler of the current stage is
//!   terminal (Success, Failure, Timeout or Cancelled).
//! - Each invocation is bounded by the configured per-handler timeout.
//! - A handler error or panic becomes a `Failure` result and never touches
//!   sibling tasks.
//! - Cancellation aborts the running stage, skips later stages, and reports
//!   every unfinished handler as `Cancelled`.

use crate::config::DispatchConfig;
use crate::ports::dispatch_observer::DispatchObserver;
use crate::ports::event_logger::{EventLogger, NoEventLogger, RoutingEvent};
use crate::ports::task_handler::{HandlerError, HandlerSet, TaskHandler};
use delegate_domain::{ExecutionPlan, HandlerResult, Match, Request, TaskContext};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Structural errors detected before any handler runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No implementation bound for handler: {0}")]
    MissingImplementation(String),
}

/// Outcome of a single spawned invocation
enum Invocation {
    Completed(Value),
    Failed(HandlerError),
    TimedOut(Duration),
}

/// Use case for executing a plan against bound handler implementations
pub struct DispatchPlanUseCase {
    handlers: Arc<HandlerSet>,
    handler_timeout: Option<Duration>,
    cancellation_token: Option<CancellationToken>,
    event_logger: Arc<dyn EventLogger>,
}

impl DispatchPlanUseCase {
    pub fn new(handlers: Arc<HandlerSet>, config: &DispatchConfig) -> Self {
        Self {
            handlers,
            handler_timeout: config.handler_timeout,
            cancellation_token: None,
            event_logger: Arc::new(NoEventLogger),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.event_logger = logger;
        self
    }

    /// Run every stage of `plan` and return results in stage-then-dispatch order.
    ///
    /// `matches` supplies the triggers each handler was selected by.
    pub async fn execute(
        &self,
        request: &Request,
        plan: &ExecutionPlan,
        matches: &[Match],
        observer: &dyn DispatchObserver,
    ) -> Result<Vec<HandlerResult>, DispatchError> {
        for name in plan.handlers() {
            if !self.handlers.contains(name) {
                return Err(DispatchError::MissingImplementation(name.to_string()));
            }
        }

        info!(
            pattern = %plan.pattern,
            stages = plan.stages.len(),
            handlers = plan.handler_count(),
            "Dispatching plan"
        );
        observer.on_plan_start(plan);

        let triggers: HashMap<&str, &Match> =
            matches.iter().map(|m| (m.handler.as_str(), m)).collect();
        let mut results: Vec<HandlerResult> = Vec::with_capacity(plan.handler_count());

        for (index, stage) in plan.stages.iter().enumerate() {
            if self.is_cancelled() {
                info!(stage = index, "Plan cancelled, skipping remaining stages");
                self.cancel_remaining(plan, index, &mut results, observer);
                break;
            }

            observer.on_stage_start(index, &stage.handlers);
            debug!(stage = index, handlers = ?stage.handlers, "Stage start");

            let mut join_set = JoinSet::new();
            let mut pending: HashSet<&str> = HashSet::new();

            for name in &stage.handlers {
                let Some(handler) = self.handlers.get(name) else {
                    continue;
                };
                let context = Self::build_context(request, plan, index, name, &results, &triggers);
                let handler = Arc::clone(handler);
                let timeout = self.handler_timeout;
                let task_name = name.clone();

                pending.insert(name.as_str());
                observer.on_handler_start(index, name);
                join_set.spawn(async move {
                    let started = Instant::now();
                    let outcome = Self::invoke(handler, context, timeout).await;
                    (task_name, outcome, started.elapsed())
                });
            }

            let mut stage_results = Vec::with_capacity(stage.len());
            let mut cancelled = false;

            loop {
                let joined = if let Some(ref token) = self.cancellation_token {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            join_set.abort_all();
                            cancelled = true;
                            break;
                        }
                        joined = join_set.join_next() => joined,
                    }
                } else {
                    join_set.join_next().await
                };

                let Some(joined) = joined else {
                    break;
                };

                match joined {
                    Ok((name, outcome, elapsed)) => {
                        pending.remove(name.as_str());
                        let result = Self::to_result(name, index, outcome, elapsed);
                        self.record(&result, observer);
                        stage_results.push(result);
                    }
                    Err(e) => {
                        // The handler name is recovered from `pending` below.
                        warn!(stage = index, "Handler task join error: {}", e);
                    }
                }
            }

            // Handlers that never reported: aborted by cancellation or panicked.
            for name in stage.handlers.iter().filter(|h| pending.contains(h.as_str())) {
                let result = if cancelled {
                    HandlerResult::cancelled(name.as_str(), index)
                } else {
                    HandlerResult::failure(name.as_str(), index, "handler task terminated abnormally")
                };
                self.record(&result, observer);
                stage_results.push(result);
            }

            // Completion order is unspecified; report in dispatch order.
            stage_results.sort_by_key(|r| stage.handlers.iter().position(|h| *h == r.handler));
            results.extend(stage_results);
            observer.on_stage_complete(index);

            if cancelled {
                info!(stage = index, "Plan cancelled during stage");
                self.cancel_remaining(plan, index + 1, &mut results, observer);
                break;
            }
        }

        Ok(results)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    async fn invoke(
        handler: Arc<dyn TaskHandler>,
        context: TaskContext,
        timeout: Option<Duration>,
    ) -> Invocation {
        let call = handler.invoke(context);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Invocation::TimedOut(limit),
            },
            None => call.await,
        };

        match outcome {
            Ok(payload) => Invocation::Completed(payload),
            Err(e) => Invocation::Failed(e),
        }
    }

    fn to_result(name: String, stage: usize, outcome: Invocation, elapsed: Duration) -> HandlerResult {
        let result = match outcome {
            Invocation::Completed(payload) => HandlerResult::success(name, stage, payload),
            Invocation::Failed(e) => HandlerResult::failure(name, stage, e.to_string()),
            Invocation::TimedOut(limit) => {
                HandlerResult::timeout(name, stage, format!("handler timed out after {:?}", limit))
            }
        };
        result.with_duration_ms(elapsed.as_millis() as u64)
    }

    fn build_context(
        request: &Request,
        plan: &ExecutionPlan,
        stage: usize,
        name: &str,
        completed: &[HandlerResult],
        triggers: &HashMap<&str, &Match>,
    ) -> TaskContext {
        let mut context = TaskContext::new(name, stage, request);

        if let Some(m) = triggers.get(name) {
            context = context.with_matched_triggers(m.matched_triggers.clone());
        }

        let hand_off_source = plan
            .hand_off
            .as_ref()
            .filter(|h| h.to == name)
            .map(|h| h.from.as_str());

        if let Some(source) = hand_off_source {
            if let Some(result) = completed.iter().find(|r| r.handler == source) {
                context = context.with_hand_off(result.clone());
            }
        } else {
            let upstream: Vec<HandlerResult> = plan
                .upstream_of(name)
                .iter()
                .filter_map(|u| completed.iter().find(|r| &r.handler == u))
                .cloned()
                .collect();
            context = context.with_upstream(upstream);
        }

        context
    }

    fn record(&self, result: &HandlerResult, observer: &dyn DispatchObserver) {
        if result.is_success() {
            info!(
                handler = %result.handler,
                stage = result.stage,
                elapsed_ms = result.duration_ms,
                "Handler completed"
            );
        } else {
            warn!(
                handler = %result.handler,
                stage = result.stage,
                status = %result.status,
                "Handler did not succeed: {}",
                result.error.as_deref().unwrap_or("no detail")
            );
        }

        observer.on_handler_complete(result);
        self.event_logger.log(RoutingEvent::new(
            "handler_completed",
            json!({
                "handler": result.handler,
                "stage": result.stage,
                "status": result.status,
                "duration_ms": result.duration_ms,
                "error": result.error,
            }),
        ));
    }

    fn cancel_remaining(
        &self,
        plan: &ExecutionPlan,
        from_stage: usize,
        results: &mut Vec<HandlerResult>,
        observer: &dyn DispatchObserver,
    ) {
        for (index, stage) in plan.stages.iter().enumerate().skip(from_stage) {
            for name in &stage.handlers {
                let result = HandlerResult::cancelled(name.as_str(), index);
                self.record(&result, observer);
                results.push(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::dispatch_observer::NoProgress;
    use async_trait::async_trait;
    use delegate_domain::{Aggregator, HandlerStatus, OrchestrationPattern, OverallStatus, Stage};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Sleeps, records start/end into a shared journal, then echoes its context.
    struct ScriptedHandler {
        delay: Duration,
        journal: Journal,
    }

    impl ScriptedHandler {
        fn new(delay_ms: u64, journal: &Journal) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                journal: Arc::clone(journal),
            }
        }
    }

    #[async_trait]
    impl TaskHandler for ScriptedHandler {
        async fn invoke(&self, context: TaskContext) -> Result<Value, HandlerError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("start:{}", context.handler));
            tokio::time::sleep(self.delay).await;
            self.journal
                .lock()
                .unwrap()
                .push(format!("end:{}", context.handler));
            Ok(json!({
                "handler": context.handler,
                "upstream": context.upstream.iter().map(|r| r.payload.clone()).collect::<Vec<_>>(),
                "hand_off": context.hand_off.map(|r| r.payload),
            }))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl TaskHandler for FailingHandler {
        async fn invoke(&self, _context: TaskContext) -> Result<Value, HandlerError> {
            Err(HandlerError::ExecutionFailed("boom".to_string()))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TaskHandler for PanickingHandler {
        async fn invoke(&self, _context: TaskContext) -> Result<Value, HandlerError> {
            panic!("handler bug");
        }
    }

    fn plan(pattern: OrchestrationPattern, stages: Vec<Vec<&str>>) -> ExecutionPlan {
        ExecutionPlan {
            pattern,
            stages: stages.into_iter().map(Stage::new).collect(),
            aggregation_step: false,
            upstream: BTreeMap::new(),
            hand_off: None,
        }
    }

    fn position(journal: &Journal, entry: &str) -> usize {
        journal
            .lock()
            .unwrap()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("missing journal entry {entry}"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_barrier() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("A", ScriptedHandler::new(100, &journal))
            .with("B", ScriptedHandler::new(10, &journal))
            .with("C", ScriptedHandler::new(1, &journal));
        let plan = plan(OrchestrationPattern::Sequential, vec![vec!["A", "B"], vec!["C"]]);

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        assert!(position(&journal, "start:C") > position(&journal, "end:A"));
        assert!(position(&journal, "start:C") > position(&journal, "end:B"));

        let names: Vec<_> = results.iter().map(|r| r.handler.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_block_siblings() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("slow", ScriptedHandler::new(10_000, &journal))
            .with("fast", ScriptedHandler::new(5, &journal));
        let plan = plan(OrchestrationPattern::Parallel, vec![vec!["slow", "fast"]]);
        let config = DispatchConfig::default().with_handler_timeout(Duration::from_millis(50));

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &config)
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        assert_eq!(results[0].handler, "slow");
        assert_eq!(results[0].status, HandlerStatus::Timeout);
        assert_eq!(results[1].handler, "fast");
        assert_eq!(results[1].status, HandlerStatus::Success);
    }

    #[tokio::test]
    async fn test_failure_and_panic_are_isolated() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("bad", FailingHandler)
            .with("buggy", PanickingHandler)
            .with("good", ScriptedHandler::new(1, &journal));
        let plan = plan(
            OrchestrationPattern::Parallel,
            vec![vec!["bad", "buggy", "good"]],
        );

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, HandlerStatus::Failure);
        assert!(results[0].error.as_deref().unwrap().contains("boom"));
        assert_eq!(results[1].status, HandlerStatus::Failure);
        assert_eq!(results[2].status, HandlerStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_results_reach_dependent() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("A", ScriptedHandler::new(1, &journal))
            .with("B", ScriptedHandler::new(1, &journal));
        let mut plan = plan(OrchestrationPattern::Sequential, vec![vec!["A"], vec!["B"]]);
        plan.upstream
            .insert("B".to_string(), vec!["A".to_string()]);

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        let upstream = &results[1].payload["upstream"];
        assert_eq!(upstream[0]["handler"], "A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hand_off_passes_full_result() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("draft", ScriptedHandler::new(1, &journal))
            .with("review", ScriptedHandler::new(1, &journal));
        let mut plan = plan(OrchestrationPattern::HandOff, vec![vec!["draft"], vec!["review"]]);
        plan.hand_off = Some(delegate_domain::HandOff {
            from: "draft".to_string(),
            to: "review".to_string(),
        });

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        assert_eq!(results[1].payload["hand_off"]["handler"], "draft");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_preserves_completed_stages() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("A", ScriptedHandler::new(1, &journal))
            .with("B", ScriptedHandler::new(10_000, &journal))
            .with("C", ScriptedHandler::new(1, &journal));
        let plan = plan(
            OrchestrationPattern::Sequential,
            vec![vec!["A"], vec!["B"], vec!["C"]],
        );

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .with_cancellation(token)
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                HandlerStatus::Success,
                HandlerStatus::Cancelled,
                HandlerStatus::Cancelled
            ]
        );
        assert!(!journal.lock().unwrap().contains(&"start:C".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_mid_stage_keeps_finished_sibling() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("fast", ScriptedHandler::new(10, &journal))
            .with("slow", ScriptedHandler::new(10_000, &journal));
        let plan = plan(OrchestrationPattern::Parallel, vec![vec!["fast", "slow"]]);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .with_cancellation(token)
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        let outcome: Vec<_> = results
            .iter()
            .map(|r| (r.handler.as_str(), r.status))
            .collect();
        assert_eq!(
            outcome,
            vec![
                ("fast", HandlerStatus::Success),
                ("slow", HandlerStatus::Cancelled)
            ]
        );

        let response = Aggregator::new().aggregate(&plan, results).unwrap();
        assert_eq!(response.status, OverallStatus::Partial);
        assert!(response.was_cancelled());
    }

    #[derive(Default)]
    struct EventJournal(Mutex<Vec<(&'static str, Value)>>);

    impl EventLogger for EventJournal {
        fn log(&self, event: RoutingEvent) {
            self.0.lock().unwrap().push((event.event_type, event.payload));
        }
    }

    #[tokio::test]
    async fn test_unstarted_stages_are_logged_as_cancelled() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new()
            .with("A", ScriptedHandler::new(1, &journal))
            .with("B", ScriptedHandler::new(1, &journal));
        let plan = plan(OrchestrationPattern::Sequential, vec![vec!["A"], vec!["B"]]);
        let events = Arc::new(EventJournal::default());

        let token = CancellationToken::new();
        token.cancel();
        let results = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .with_cancellation(token)
            .with_event_logger(events.clone())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.status == HandlerStatus::Cancelled));
        assert!(journal.lock().unwrap().is_empty());

        let logged = events.0.lock().unwrap();
        let completed: Vec<_> = logged
            .iter()
            .filter(|(kind, _)| *kind == "handler_completed")
            .map(|(_, payload)| (payload["handler"].clone(), payload["status"].clone()))
            .collect();
        assert_eq!(
            completed,
            vec![
                (json!("A"), json!("cancelled")),
                (json!("B"), json!("cancelled"))
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_implementation_aborts_before_dispatch() {
        let journal: Journal = Arc::default();
        let handlers = HandlerSet::new().with("A", ScriptedHandler::new(1, &journal));
        let plan = plan(OrchestrationPattern::Parallel, vec![vec!["A", "ghost"]]);

        let result = DispatchPlanUseCase::new(Arc::new(handlers), &DispatchConfig::default())
            .execute(&Request::new("go"), &plan, &[], &NoProgress)
            .await;

        assert_eq!(
            result,
            Err(DispatchError::MissingImplementation("ghost".to_string()))
        );
        assert!(journal.lock().unwrap().is_empty());
    }
}
