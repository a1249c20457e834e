//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: structural errors that abort a request before dispatch

pub mod error;
