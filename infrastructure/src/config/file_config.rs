//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain/application
//! types once validated.
//!
//! Example configuration:
//!
//! ```toml
//! [dispatch]
//! timeout_seconds = 30
//! fallback_handler = "general"
//!
//! [[handlers]]
//! name = "terraform"
//! triggers = ["terraform", "infrastructure as code"]
//! domains = ["infrastructure"]
//! template = "Plan infrastructure for: {request}"
//!
//! [[handlers]]
//! name = "kubernetes"
//! triggers = ["kubernetes", "aks", "helm"]
//! domains = ["containers"]
//! depends_on = ["infrastructure"]
//! kind = "command"
//! program = "./scripts/k8s-sme.sh"
//! ```

use delegate_application::DispatchConfig;
use delegate_domain::{DEFAULT_DOMAIN_HINT_WEIGHT, HandlerDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("handler name cannot be empty")]
    EmptyHandlerName,

    #[error("handler '{0}' is defined more than once")]
    DuplicateHandlerName(String),

    #[error("handler '{handler}' hands off to unknown handler '{target}'")]
    UnknownHandOffTarget { handler: String, target: String },

    #[error("handler '{0}' cannot hand off to itself")]
    SelfHandOff(String),

    #[error("fallback_handler '{0}' is not a configured handler")]
    UnknownFallback(String),

    #[error("command handler '{0}' has no program")]
    MissingProgram(String),
}

/// Raw dispatch configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    /// Per-handler timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Score bonus per matched domain hint
    pub domain_hint_weight: u32,
    /// Handler used when nothing matches
    pub fallback_handler: Option<String>,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            domain_hint_weight: DEFAULT_DOMAIN_HINT_WEIGHT,
            fallback_handler: None,
        }
    }
}

/// Output format for aggregated responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutputFormat {
    /// Per-handler sections plus status details
    Full,
    /// Only the synthesized summary
    Summary,
    /// JSON output
    Json,
}

/// Raw output configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<FileOutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Path of the JSONL routing event log (disabled when unset)
    pub event_log: Option<String>,
}

/// How a configured handler is implemented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileHandlerKind {
    /// Render a text template
    #[default]
    Template,
    /// Run an external program with the task context on stdin
    Command,
}

/// Raw handler definition from a `[[handlers]]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHandlerConfig {
    pub name: String,
    pub triggers: Vec<String>,
    pub domains: Vec<String>,
    pub capabilities: Vec<String>,
    pub depends_on: Vec<String>,
    pub requires_aggregation: bool,
    pub hand_off_to: Option<String>,
    pub kind: FileHandlerKind,
    /// Template text for `kind = "template"`
    pub template: Option<String>,
    /// Program for `kind = "command"`
    pub program: Option<String>,
    /// Extra program arguments for `kind = "command"`
    pub args: Vec<String>,
}

impl FileHandlerConfig {
    /// Convert into a domain descriptor
    pub fn to_descriptor(&self) -> HandlerDescriptor {
        let mut descriptor = HandlerDescriptor::new(self.name.trim())
            .with_triggers(&self.triggers)
            .with_domains(&self.domains);
        for capability in &self.capabilities {
            descriptor = descriptor.with_capability(capability.clone());
        }
        for domain in &self.depends_on {
            descriptor = descriptor.depends_on(domain);
        }
        if self.requires_aggregation {
            descriptor = descriptor.requiring_aggregation();
        }
        if let Some(target) = &self.hand_off_to {
            descriptor = descriptor.hand_off_to(target.trim());
        }
        descriptor
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Dispatch settings
    pub dispatch: FileDispatchConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Logging settings
    pub logging: FileLoggingConfig,
    /// Handler definitions, in registration order
    pub handlers: Vec<FileHandlerConfig>,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(0) = self.dispatch.timeout_seconds {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        let mut names = HashSet::new();
        for handler in &self.handlers {
            let name = handler.name.trim();
            if name.is_empty() {
                return Err(ConfigValidationError::EmptyHandlerName);
            }
            if !names.insert(name) {
                return Err(ConfigValidationError::DuplicateHandlerName(
                    name.to_string(),
                ));
            }
            if handler.kind == FileHandlerKind::Command
                && handler.program.as_deref().is_none_or(|p| p.trim().is_empty())
            {
                return Err(ConfigValidationError::MissingProgram(name.to_string()));
            }
        }

        for handler in &self.handlers {
            if let Some(target) = &handler.hand_off_to {
                let target = target.trim();
                if target == handler.name.trim() {
                    return Err(ConfigValidationError::SelfHandOff(target.to_string()));
                }
                if !names.contains(target) {
                    return Err(ConfigValidationError::UnknownHandOffTarget {
                        handler: handler.name.trim().to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        if let Some(fallback) = &self.dispatch.fallback_handler
            && !names.contains(fallback.trim())
        {
            return Err(ConfigValidationError::UnknownFallback(fallback.clone()));
        }

        Ok(())
    }

    /// Handler descriptors in declaration order
    pub fn descriptors(&self) -> Vec<HandlerDescriptor> {
        self.handlers
            .iter()
            .map(FileHandlerConfig::to_descriptor)
            .collect()
    }

    /// Application dispatch settings
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            handler_timeout: self.dispatch.timeout_seconds.map(Duration::from_secs),
            domain_hint_weight: self.dispatch.domain_hint_weight,
            fallback_handler: self
                .dispatch
                .fallback_handler
                .as_ref()
                .map(|f| f.trim().to_string()),
        }
    }
}
