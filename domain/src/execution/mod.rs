//! Dispatch-time value objects
//!
//! - [`context::TaskContext`] - what a handler receives
//! - [`result::HandlerResult`] - what a handler invocation produces

pub mod context;
pub mod result;
