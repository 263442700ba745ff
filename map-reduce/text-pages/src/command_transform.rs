// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use page_map_reduce_core::collaborators::PageTransform;
use page_map_reduce_core::error::CollaboratorError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Returns every page unchanged
#[derive(Debug, Clone, Default)]
pub struct PassthroughTransform;

#[async_trait]
impl PageTransform for PassthroughTransform {
    async fn transform(&self, _page: u32, content: String) -> Result<String, CollaboratorError> {
        Ok(content)
    }
}

/// Runs an external program once per page.
///
/// The page text is written to the program's stdin and its stdout is the
/// result. `PAGE_NUMBER` is set in the program's environment. A non-zero exit,
/// running past the timeout, or empty output for a page that has text fails
/// the page. A blank page may come back empty.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTransform {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a full command line, program first. `None` if it is empty.
    pub fn from_command_line(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), timeout))
    }

    async fn run(&self, page: u32, content: String) -> Result<String, String> {
        let blank_page = content.trim().is_empty();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("PAGE_NUMBER", page.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start '{}': {}", self.program, e))?;

        // Feed stdin concurrently so a chatty program cannot fill its stdout
        // pipe while we are still writing.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(content.as_bytes()).await;
            });
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {}ms", self.timeout.as_millis()))?
            .map_err(|e| format!("failed to wait for '{}': {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("exited with {}: {}", output.status, stderr.trim()));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| "output is not valid UTF-8".to_string())?;
        let result = stdout.trim();
        if result.is_empty() && !blank_page {
            return Err("empty output".to_string());
        }
        Ok(result.to_string())
    }
}

#[async_trait]
impl PageTransform for CommandTransform {
    async fn transform(&self, page: u32, content: String) -> Result<String, CollaboratorError> {
        debug!(page, program = %self.program, "transform started");
        let result = self
            .run(page, content)
            .await
            .map_err(|reason| CollaboratorError::Transform { page, reason })?;
        debug!(page, bytes = result.len(), "transform done");
        Ok(result)
    }
}
