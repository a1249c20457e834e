//! Result aggregation
//!
//! The aggregator is domain-agnostic: it never inspects payload structure.
//! It computes the overall status, concatenates payloads under handler
//! names in stage order, and flags results built on failed upstream input.

pub mod aggregator;
pub mod response;
