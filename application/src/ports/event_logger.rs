//! Port for structured routing event logging.
//!
//! Defines the [`EventLogger`] trait for recording pipeline events
//! (classification, plan, handler completion, aggregation) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable record of every routed request (JSONL).

use serde_json::Value;

/// A structured routing event for logging.
pub struct RoutingEvent {
    /// Event type identifier (e.g., "request_classified", "handler_completed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RoutingEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging routing events.
///
/// `log` is synchronous and non-fallible; logging failures must not
/// disturb dispatch.
pub trait EventLogger: Send + Sync {
    /// Record a routing event.
    fn log(&self, event: RoutingEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoEventLogger;

impl EventLogger for NoEventLogger {
    fn log(&self, _event: RoutingEvent) {}
}
