//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch_plan;
pub mod route_request;
