//! Builds handler implementations from configuration.

use super::command::CommandHandler;
use super::template::TemplateHandler;
use crate::config::{FileConfig, FileHandlerConfig, FileHandlerKind};
use delegate_application::{HandlerSet, TaskHandler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Creates [`TaskHandler`] implementations for configured handlers
#[derive(Debug, Clone, Default)]
pub struct HandlerFactory {
    /// Working directory for command handlers
    working_dir: Option<PathBuf>,
}

impl HandlerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build one handler implementation.
    ///
    /// Expects a validated config entry; a command entry without a
    /// program falls back to the default template.
    pub fn create(&self, config: &FileHandlerConfig) -> Arc<dyn TaskHandler> {
        match (config.kind, config.program.as_deref()) {
            (FileHandlerKind::Command, Some(program)) => {
                let mut handler = CommandHandler::new(program.trim()).with_args(&config.args);
                if let Some(dir) = &self.working_dir {
                    handler = handler.with_working_dir(dir);
                }
                Arc::new(handler)
            }
            _ => match &config.template {
                Some(template) => Arc::new(TemplateHandler::new(template)),
                None => Arc::new(TemplateHandler::default()),
            },
        }
    }

    /// Build implementations for every configured handler
    pub fn build(&self, config: &FileConfig) -> HandlerSet {
        let mut set = HandlerSet::new();
        for handler in &config.handlers {
            debug!(handler = %handler.name.trim(), kind = ?handler.kind, "Creating handler");
            set.insert_arc(handler.name.trim(), self.create(handler));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegate_domain::{Request, TaskContext};
    use serde_json::json;

    #[tokio::test]
    async fn test_build_template_handlers() {
        let config: FileConfig = toml::from_str(
            r#"
[[handlers]]
name = " docs "
template = "Docs for {request}"

[[handlers]]
name = "plain"
"#,
        )
        .unwrap();

        let set = HandlerFactory::new().build(&config);
        assert_eq!(set.len(), 2);

        let docs = set.get("docs").unwrap();
        let payload = docs
            .invoke(TaskContext::new("docs", 0, &Request::new("the api")))
            .await
            .unwrap();
        assert_eq!(payload, json!("Docs for the api"));

        let plain = set.get("plain").unwrap();
        let payload = plain
            .invoke(TaskContext::new("plain", 0, &Request::new("x")))
            .await
            .unwrap();
        assert_eq!(payload, json!("plain received: x"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_command_handler() {
        let config: FileConfig = toml::from_str(
            r#"
[[handlers]]
name = "echo"
kind = "command"
program = "sh"
args = ["-c", "cat > /dev/null; pwd"]
"#,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();

        let set = HandlerFactory::new()
            .with_working_dir(&expected)
            .build(&config);
        let payload = set
            .get("echo")
            .unwrap()
            .invoke(TaskContext::new("echo", 0, &Request::new("x")))
            .await
            .unwrap();

        assert_eq!(payload, json!(expected.display().to_string()));
    }
}
