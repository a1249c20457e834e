//! Command handler: runs an external program per task.
//!
//! The task context is written to the program's stdin as JSON. Stdout
//! becomes the payload (parsed as JSON when possible, otherwise kept as
//! text). A non-zero exit status is a handler failure carrying stderr.

use async_trait::async_trait;
use delegate_application::{HandlerError, TaskHandler};
use delegate_domain::TaskContext;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Maximum stderr length carried into an error message
const MAX_ERROR_LEN: usize = 2000;

/// Handler backed by an external process
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandHandler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl TaskHandler for CommandHandler {
    async fn invoke(&self, context: TaskContext) -> Result<Value, HandlerError> {
        let input = serde_json::to_vec(&context)
            .map_err(|e| HandlerError::ExecutionFailed(format!("cannot encode context: {}", e)))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Timeouts and cancellation drop this future; take the child with it.
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(handler = %context.handler, program = %self.program, "Spawning handler process");
        let mut child = command.spawn()?;

        // Feed stdin while draining stdout/stderr; a sequential write can
        // deadlock once either pipe buffer fills.
        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                Some(mut stdin) => match stdin.write_all(&input).await {
                    Ok(()) => stdin.shutdown().await,
                    Err(e) => Err(e),
                },
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        // Programs that ignore stdin may exit before reading it.
        if let Err(e) = written
            && e.kind() != ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail: String = stderr.trim().chars().take(MAX_ERROR_LEN).collect();
            return Err(HandlerError::ExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                detail
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| HandlerError::InvalidOutput(format!("stdout is not UTF-8: {}", e)))?;
        let stdout = stdout.trim();

        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}
