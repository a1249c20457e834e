//! Configuration file loading for delegate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./delegate.toml` or `./.delegate.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/delegate/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDispatchConfig, FileHandlerConfig, FileHandlerKind,
    FileLoggingConfig, FileOutputConfig, FileOutputFormat,
};
pub use loader::ConfigLoader;
