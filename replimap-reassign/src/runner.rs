//! Admin tool invocation
//!
//! Every cluster side effect goes through the cluster's own admin tooling.
//! Invocations are structured argv (configurable prefix + tool + args) with
//! captured output; the security properties file and any tool input files
//! are materialized under a configured work directory.

use replimap_core::config::ReplimapConfig;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runner errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("Work directory error: {0}")]
    WorkDir(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Captured outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stderr followed by stdout, trimmed; what an operator needs to see
    /// when a tool fails.
    pub fn combined(&self) -> String {
        let mut out = String::new();
        if !self.stderr.trim().is_empty() {
            out.push_str(self.stderr.trim());
        }
        if !self.stdout.trim().is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(self.stdout.trim());
        }
        out
    }
}

/// Invokes the external admin tools with the session settings every call
/// needs (bootstrap server, command-config).
#[derive(Debug, Clone)]
pub struct ToolRunner {
    config: ReplimapConfig,
}

impl ToolRunner {
    pub fn new(config: ReplimapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReplimapConfig {
        &self.config
    }

    /// Run one admin tool with the given arguments, appending the
    /// `--bootstrap-server` and (when security is enabled)
    /// `--command-config` options every tool accepts.
    #[instrument(skip(self, args))]
    pub async fn run(&self, tool: &str, args: &[String]) -> Result<ToolOutput> {
        let mut argv: Vec<String> = self.config.tools.prefix.clone();
        argv.push(tool.to_string());
        argv.extend(args.iter().cloned());
        argv.push("--bootstrap-server".to_string());
        argv.push(self.config.cluster.bootstrap_server.clone());

        if let Some(properties) = self.config.security.to_properties() {
            let path = self.write_input("command-config.properties", &properties)?;
            argv.push("--command-config".to_string());
            argv.push(path.display().to_string());
        }

        debug!(argv = ?argv, "Invoking admin tool");

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            success = result.success,
            code = ?result.code,
            "Admin tool finished"
        );

        Ok(result)
    }

    /// Write a tool input file under the work directory and return its path.
    pub fn write_input(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let dir = &self.config.tools.work_dir;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output_prefers_stderr_first() {
        let output = ToolOutput {
            success: false,
            code: Some(1),
            stdout: "partial result\n".to_string(),
            stderr: "error: no such topic\n".to_string(),
        };
        assert_eq!(output.combined(), "error: no such topic\npartial result");
    }

    #[test]
    fn test_combined_output_empty_streams() {
        let output = ToolOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.combined(), "");
    }

    #[tokio::test]
    async fn test_write_input_creates_work_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ReplimapConfig::default();
        config.tools.work_dir = tmp.path().join("work");

        let runner = ToolRunner::new(config);
        let path = runner.write_input("topics.json", "{}").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}
