//! Application layer for delegate
//!
//! This crate contains the dispatch and routing use cases, port
//! definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::DispatchConfig;
pub use ports::{
    dispatch_observer::{DispatchObserver, NoProgress},
    event_logger::{EventLogger, NoEventLogger, RoutingEvent},
    task_handler::{HandlerError, HandlerSet, TaskHandler},
};
pub use registry::SharedRegistry;
pub use use_cases::dispatch_plan::{DispatchError, DispatchPlanUseCase};
pub use use_cases::route_request::{RoutePlan, RouteRequestError, RouteRequestUseCase};
