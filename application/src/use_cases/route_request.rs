//! Route Request use case
//!
//! Runs the full delegation pipeline for one request:
//! classify → plan → dispatch → aggregate.
//!
//! Structural problems (unknown/duplicate handlers, no match, dependency
//! cycles, nothing to aggregate) abort before any handler runs and come
//! back as [`RouteRequestError`]. Anything that goes wrong inside a handler
//! is reported inside the [`AggregatedResponse`].

use crate::config::DispatchConfig;
use crate::ports::dispatch_observer::{DispatchObserver, NoProgress};
use crate::ports::event_logger::{EventLogger, NoEventLogger, RoutingEvent};
use crate::ports::task_handler::HandlerSet;
use crate::registry::SharedRegistry;
use crate::use_cases::dispatch_plan::{DispatchError, DispatchPlanUseCase};
use delegate_domain::{
    AggregatedResponse, Aggregator, Classifier, DomainError, ExecutionPlan, ExecutionPlanner,
    HandlerRegistry, Match, Request,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors that abort a request before (or instead of) dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteRequestError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Classification and plan for a request, computed against one registry snapshot
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub snapshot: Arc<HandlerRegistry>,
    pub matches: Vec<Match>,
    pub plan: ExecutionPlan,
    /// Whether the configured fallback handler was used
    pub used_fallback: bool,
    /// Matched handlers the plan left out (hand-off plans keep only the pair)
    pub skipped: Vec<String>,
}

/// Use case for routing a request through the delegation pipeline
pub struct RouteRequestUseCase {
    registry: Arc<SharedRegistry>,
    handlers: Arc<HandlerSet>,
    config: DispatchConfig,
    cancellation_token: Option<CancellationToken>,
    event_logger: Arc<dyn EventLogger>,
}

impl RouteRequestUseCase {
    pub fn new(registry: Arc<SharedRegistry>, handlers: Arc<HandlerSet>, config: DispatchConfig) -> Self {
        Self {
            registry,
            handlers,
            config,
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

    /// Classify and plan without dispatching.
    pub fn prepare(&self, request: &Request) -> Result<RoutePlan, RouteRequestError> {
        let snapshot = self.registry.snapshot();
        let classifier = Classifier::new().with_domain_hint_weight(self.config.domain_hint_weight);

        let (matches, used_fallback) = match classifier.classify(request, &snapshot) {
            Ok(matches) => (matches, false),
            Err(e) if e.is_no_match() => match &self.config.fallback_handler {
                Some(fallback) => {
                    snapshot.lookup(fallback)?;
                    info!(handler = %fallback, "No handler matched, using fallback");
                    let fallback_match = Match {
                        handler: fallback.clone(),
                        score: 0,
                        matched_triggers: BTreeSet::new(),
                        matched_domains: BTreeSet::new(),
                    };
                    (vec![fallback_match], true)
                }
                None => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        };

        debug!(
            matches = ?matches.iter().map(|m| (&m.handler, m.score)).collect::<Vec<_>>(),
            "Request classified"
        );
        self.event_logger.log(RoutingEvent::new(
            "request_classified",
            json!({
                "request": request.text(),
                "domain_hints": request.domain_hints(),
                "matches": matches,
                "fallback": used_fallback,
            }),
        ));

        let plan = ExecutionPlanner::new().plan(&matches, &snapshot)?;
        plan.validate(&snapshot)?;

        let skipped: Vec<String> = matches
            .iter()
            .filter(|m| plan.stage_of(&m.handler).is_none())
            .map(|m| m.handler.clone())
            .collect();
        if !skipped.is_empty() {
            info!(pattern = %plan.pattern, skipped = ?skipped, "Matched handlers left out of plan");
        }

        info!(
            pattern = %plan.pattern,
            stages = plan.stages.len(),
            "Execution plan built"
        );
        self.event_logger.log(RoutingEvent::new(
            "plan_built",
            json!({ "plan": plan, "skipped": skipped }),
        ));

        Ok(RoutePlan {
            snapshot,
            matches,
            plan,
            used_fallback,
            skipped,
        })
    }

    /// Execute the pipeline with default (no-op) progress
    pub async fn execute(&self, request: &Request) -> Result<AggregatedResponse, RouteRequestError> {
        self.execute_with_progress(request, &NoProgress).await
    }

    /// Execute the pipeline with progress callbacks
    pub async fn execute_with_progress(
        &self,
        request: &Request,
        observer: &dyn DispatchObserver,
    ) -> Result<AggregatedResponse, RouteRequestError> {
        let route = self.prepare(request)?;

        let mut dispatcher = DispatchPlanUseCase::new(Arc::clone(&self.handlers), &self.config)
            .with_event_logger(Arc::clone(&self.event_logger));
        if let Some(token) = &self.cancellation_token {
            dispatcher = dispatcher.with_cancellation(token.clone());
        }

        let results = dispatcher
            .execute(request, &route.plan, &route.matches, observer)
            .await?;

        let response = Aggregator::new().aggregate(&route.plan, results)?;

        info!(
            status = %response.status,
            handlers = response.results.len(),
            conflicts = response.conflicts.len(),
            "Request aggregated"
        );
        self.event_logger.log(RoutingEvent::new(
            "response_aggregated",
            json!({
                "status": response.status,
                "pattern": response.pattern,
                "conflicts": response.conflicts,
            }),
        ));
        observer.on_plan_complete(&response);

        Ok(response)
    }
}
