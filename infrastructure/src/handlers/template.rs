//! Template handler: renders a fixed text template per task.

use async_trait::async_trait;
use delegate_application::{HandlerError, TaskHandler};
use delegate_domain::TaskContext;
use serde_json::Value;

/// Default template when a handler does not declare one
pub const DEFAULT_TEMPLATE: &str = "{handler} received: {request}";

/// Handler that substitutes task context values into a template.
///
/// Placeholders:
/// - `{request}` - original request text
/// - `{handler}` - handler name
/// - `{stage}` - stage index
/// - `{triggers}` - comma-separated matched triggers
/// - `{upstream}` - upstream / hand-off payloads
pub struct TemplateHandler {
    template: String,
}

impl TemplateHandler {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute placeholders in one pass; substituted text is never re-scanned
    /// and unknown `{...}` sequences are kept verbatim.
    pub fn render(&self, context: &TaskContext) -> String {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let tail = &rest[open..];
            let substituted = tail.find('}').and_then(|close| {
                Self::placeholder(&tail[1..close], context).map(|value| (value, close))
            });
            match substituted {
                Some((value, close)) => {
                    output.push_str(&value);
                    rest = &tail[close + 1..];
                }
                None => {
                    output.push('{');
                    rest = &tail[1..];
                }
            }
        }

        output.push_str(rest);
        output
    }

    fn placeholder(name: &str, context: &TaskContext) -> Option<String> {
        match name {
            "request" => Some(context.request.clone()),
            "handler" => Some(context.handler.clone()),
            "stage" => Some(context.stage.to_string()),
            "triggers" => Some(
                context
                    .matched_triggers
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            "upstream" => Some(context.upstream_text()),
            _ => None,
        }
    }
}

impl Default for TemplateHandler {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

#[async_trait]
impl TaskHandler for TemplateHandler {
    async fn invoke(&self, context: TaskContext) -> Result<Value, HandlerError> {
        Ok(Value::String(self.render(&context)))
    }
}
