//! Per-handler invocation results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Terminal state of a single handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerStatus {
    Success,
    Failure,
    Timeout,
    /// The plan was cancelled while this handler was running or before it started
    Cancelled,
}

impl HandlerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerStatus::Success => "success",
            HandlerStatus::Failure => "failure",
            HandlerStatus::Timeout => "timeout",
            HandlerStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HandlerStatus::Success)
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one handler invocation, produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    /// Handler that produced this result
    pub handler: String,
    /// Index of the plan stage the handler ran in
    pub stage: usize,
    pub status: HandlerStatus,
    /// Opaque handler output; `Null` unless the status is `Success`
    #[serde(default)]
    pub payload: Value,
    /// Error detail when the status is not `Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the invocation in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

impl HandlerResult {
    pub fn success(handler: impl Into<String>, stage: usize, payload: Value) -> Self {
        Self {
            handler: handler.into(),
            stage,
            status: HandlerStatus::Success,
            payload,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failure(handler: impl Into<String>, stage: usize, error: impl Into<String>) -> Self {
        Self::unsuccessful(handler, stage, HandlerStatus::Failure, error)
    }

    pub fn timeout(handler: impl Into<String>, stage: usize, error: impl Into<String>) -> Self {
        Self::unsuccessful(handler, stage, HandlerStatus::Timeout, error)
    }

    pub fn cancelled(handler: impl Into<String>, stage: usize) -> Self {
        Self::unsuccessful(handler, stage, HandlerStatus::Cancelled, "plan cancelled")
    }

    fn unsuccessful(
        handler: impl Into<String>,
        stage: usize,
        status: HandlerStatus,
        error: impl Into<String>,
    ) -> Self {
        Self {
            handler: handler.into(),
            stage,
            status,
            payload: Value::Null,
            error: Some(error.into()),
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Payload rendered as text: strings verbatim, anything else as JSON.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
