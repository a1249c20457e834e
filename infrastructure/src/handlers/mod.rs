//! Handler implementations backing configured descriptors

pub mod command;
pub mod factory;
pub mod template;

pub use command::CommandHandler;
pub use factory::HandlerFactory;
pub use template::{DEFAULT_TEMPLATE, TemplateHandler};
