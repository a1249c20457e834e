//! Request routing
//!
//! Turns a free-form [`request::Request`] into ranked
//! [`classifier::Match`]es against the handler registry.

pub mod classifier;
pub mod request;
