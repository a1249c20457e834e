//! Task handler port
//!
//! Defines the uniform call/response contract every specialist handler
//! implements. Handler internals are adapters in the infrastructure layer.

use async_trait::async_trait;
use delegate_domain::TaskContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a handler invocation.
///
/// The dispatcher captures it into the handler's result; it never aborts
/// sibling handlers or the plan.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Handler execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid handler output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for invoking a specialist handler
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process one task and return an opaque payload
    async fn invoke(&self, context: TaskContext) -> Result<Value, HandlerError>;
}

/// Handler implementations bound to registry names
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an implementation to a handler name (replaces an existing binding)
    pub fn insert<H: TaskHandler + 'static>(&mut self, name: impl Into<String>, handler: H) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Bind an implementation (Arc version)
    pub fn insert_arc(&mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn with<H: TaskHandler + 'static>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.insert(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
