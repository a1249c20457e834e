//! Handler domain
//!
//! Specialist handlers are described by a [`descriptor::HandlerDescriptor`]
//! and collected in a [`registry::HandlerRegistry`].

pub mod descriptor;
pub mod registry;
