//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters implement.

pub mod dispatch_observer;
pub mod event_logger;
pub mod task_handler;
