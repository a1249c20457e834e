//! Infrastructure layer for delegate
//!
//! This crate contains adapters for the application ports:
//! configuration file loading, handler implementations (templates and
//! external commands), and the JSONL routing event log.

pub mod config;
pub mod handlers;
pub mod logging;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileDispatchConfig, FileHandlerConfig,
    FileHandlerKind, FileLoggingConfig, FileOutputConfig, FileOutputFormat,
};
pub use handlers::{CommandHandler, HandlerFactory, TemplateHandler};
pub use logging::JsonlEventLogger;
