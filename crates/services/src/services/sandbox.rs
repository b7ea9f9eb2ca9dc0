//! Runs learner-submitted Python in a child interpreter.

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to start interpreter {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },
    #[error("interpreter i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct RunRequest {
    pub source: String,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Executes source code and captures what it printed.
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    async fn run(&self, source: &str) -> Result<RunOutput, SandboxError>;
}

/// Spawns a fresh interpreter per run and feeds it the source on stdin.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    interpreter: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessSandbox {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            args: vec!["-".to_string()],
            timeout,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn run(&self, source: &str) -> Result<RunOutput, SandboxError> {
        let mut child = Command::new(&self.interpreter)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // The program may exit without reading its input.
                if let Err(e) = stdin.write_all(source.as_bytes()).await {
                    warn!("Failed to write source to interpreter stdin: {}", e);
                }
            }
            child.wait_with_output().await
        };

        // Dropping the run future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| SandboxError::Timeout(self.timeout))??;

        debug!(
            interpreter = %self.interpreter,
            exit_code = ?output.status.code(),
            "Sandbox run finished"
        );

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}
