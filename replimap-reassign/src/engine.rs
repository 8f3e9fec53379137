//! Reassignment engine port
//!
//! The external engine is what actually moves partition data between
//! brokers; this module defines the structured boundary to it and the
//! adapter driving the stock `kafka-reassign-partitions` tool. The
//! lifecycle controller only ever sees this port, so its state machine is
//! testable with a fake engine.

use replimap_core::model::BrokerId;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::runner::{RunnerError, ToolRunner};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine invocation failed: {0}")]
    Invocation(String),

    #[error("Engine rejected the request: {output}")]
    Rejected { output: String },

    #[error("Unexpected engine output: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<RunnerError> for EngineError {
    fn from(e: RunnerError) -> Self {
        EngineError::Invocation(e.to_string())
    }
}

/// Output of a generate (dry-run) call: the assignment currently in effect
/// and the proposed target assignment, both as the engine's JSON documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAssignments {
    pub current: String,
    pub proposed: String,
}

/// Progress of one partition's reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionProgress {
    Completed,
    InProgress,
    Failed,
}

impl std::fmt::Display for PartitionProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PartitionProgress::Completed => "completed",
            PartitionProgress::InProgress => "in progress",
            PartitionProgress::Failed => "failed",
        })
    }
}

/// Per-partition completion report from a verify call.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// `(partition, progress)` pairs, e.g. `("orders-0", Completed)`
    pub partitions: Vec<(String, PartitionProgress)>,
}

impl VerifyReport {
    /// True when at least one partition was reported and all completed.
    pub fn all_completed(&self) -> bool {
        !self.partitions.is_empty()
            && self
                .partitions
                .iter()
                .all(|(_, p)| *p == PartitionProgress::Completed)
    }

    pub fn summary(&self) -> String {
        let (mut done, mut moving, mut failed) = (0, 0, 0);
        for (_, progress) in &self.partitions {
            match progress {
                PartitionProgress::Completed => done += 1,
                PartitionProgress::InProgress => moving += 1,
                PartitionProgress::Failed => failed += 1,
            }
        }
        format!("{done} completed, {moving} in progress, {failed} failed")
    }
}

/// The external reassignment engine boundary.
#[async_trait::async_trait]
pub trait ReassignmentEngine: Send + Sync {
    /// Dry-run: ask the engine for the current and proposed assignments for
    /// the given plan document and target broker list. No data moves.
    async fn generate(
        &self,
        plan_json: &str,
        broker_list: &[BrokerId],
    ) -> Result<GeneratedAssignments>;

    /// Report per-partition progress of the given assignment document.
    async fn verify(&self, assignment_json: &str) -> Result<VerifyReport>;

    /// Execute the given assignment document against the cluster.
    async fn execute(&self, assignment_json: &str) -> Result<()>;
}

/// Engine adapter driving `kafka-reassign-partitions.sh`.
pub struct ReassignTool {
    runner: ToolRunner,
}

impl ReassignTool {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    fn tool(&self) -> String {
        self.runner.config().tools.reassign_partitions.clone()
    }
}

#[async_trait::async_trait]
impl ReassignmentEngine for ReassignTool {
    #[instrument(skip(self, plan_json))]
    async fn generate(
        &self,
        plan_json: &str,
        broker_list: &[BrokerId],
    ) -> Result<GeneratedAssignments> {
        let plan_path = self.runner.write_input("topics-to-move.json", plan_json)?;
        let brokers = broker_list
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let output = self
            .runner
            .run(
                &self.tool(),
                &[
                    "--topics-to-move-json-file".to_string(),
                    plan_path.display().to_string(),
                    "--broker-list".to_string(),
                    brokers,
                    "--generate".to_string(),
                ],
            )
            .await?;

        if !output.success {
            return Err(EngineError::Rejected {
                output: output.combined(),
            });
        }

        parse_generate_output(&output.stdout)
    }

    #[instrument(skip(self, assignment_json))]
    async fn verify(&self, assignment_json: &str) -> Result<VerifyReport> {
        let path = self
            .runner
            .write_input("verify-reassignment.json", assignment_json)?;

        let output = self
            .runner
            .run(
                &self.tool(),
                &[
                    "--reassignment-json-file".to_string(),
                    path.display().to_string(),
                    "--verify".to_string(),
                ],
            )
            .await?;

        if !output.success {
            return Err(EngineError::Rejected {
                output: output.combined(),
            });
        }

        let report = parse_verify_output(&output.stdout);
        debug!(summary = %report.summary(), "Verify finished");
        Ok(report)
    }

    #[instrument(skip(self, assignment_json))]
    async fn execute(&self, assignment_json: &str) -> Result<()> {
        let path = self
            .runner
            .write_input("execute-reassignment.json", assignment_json)?;

        let output = self
            .runner
            .run(
                &self.tool(),
                &[
                    "--reassignment-json-file".to_string(),
                    path.display().to_string(),
                    "--execute".to_string(),
                ],
            )
            .await?;

        if !output.success {
            return Err(EngineError::Rejected {
                output: output.combined(),
            });
        }

        Ok(())
    }
}

const CURRENT_HEADER: &str = "Current partition replica assignment";
const PROPOSED_HEADER: &str = "Proposed partition reassignment configuration";

/// Split the generate-mode stdout into its two JSON documents. The tool
/// prints each document on the lines following its header, separated by
/// blank lines.
fn parse_generate_output(stdout: &str) -> Result<GeneratedAssignments> {
    enum Section {
        None,
        Current,
        Proposed,
    }

    let mut current = String::new();
    let mut proposed = String::new();
    let mut section = Section::None;

    for line in stdout.lines() {
        if line.contains(CURRENT_HEADER) {
            section = Section::Current;
            continue;
        }
        if line.contains(PROPOSED_HEADER) {
            section = Section::Proposed;
            continue;
        }
        if line.trim().is_empty() {
            section = Section::None;
            continue;
        }
        let target = match section {
            Section::Current => &mut current,
            Section::Proposed => &mut proposed,
            Section::None => continue,
        };
        target.push_str(line);
        target.push('\n');
    }

    if current.trim().is_empty() || proposed.trim().is_empty() {
        return Err(EngineError::Malformed(
            "generate output did not carry both current and proposed assignments".to_string(),
        ));
    }

    Ok(GeneratedAssignments {
        current: current.trim().to_string(),
        proposed: proposed.trim().to_string(),
    })
}

const VERIFY_LINE_PREFIX: &str = "Reassignment of partition ";

/// Classify the per-partition status lines of verify-mode stdout.
fn parse_verify_output(stdout: &str) -> VerifyReport {
    let mut report = VerifyReport::default();

    for line in stdout.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(VERIFY_LINE_PREFIX) else {
            continue;
        };
        let Some(partition) = rest.split_whitespace().next() else {
            continue;
        };

        let progress = if rest.contains("complete") {
            PartitionProgress::Completed
        } else if rest.contains("in progress") {
            PartitionProgress::InProgress
        } else {
            PartitionProgress::Failed
        };

        report.partitions.push((partition.to_string(), progress));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATE_OUTPUT: &str = r#"Current partition replica assignment
{"version":1,"partitions":[{"topic":"orders","partition":0,"replicas":[0,1]}]}

Proposed partition reassignment configuration
{"version":1,"partitions":[{"topic":"orders","partition":0,"replicas":[0,1,2]}]}
"#;

    #[test]
    fn test_parse_generate_output() {
        let assignments = parse_generate_output(GENERATE_OUTPUT).unwrap();
        assert!(assignments.current.contains("\"replicas\":[0,1]"));
        assert!(assignments.proposed.contains("\"replicas\":[0,1,2]"));
    }

    #[test]
    fn test_parse_generate_output_missing_section() {
        let result = parse_generate_output("Proposed partition reassignment configuration\n{}\n");
        assert!(matches!(result, Err(EngineError::Malformed(_))));
    }

    #[test]
    fn test_parse_verify_output() {
        let stdout = "\
Status of partition reassignment:
Reassignment of partition orders-0 is completed
Reassignment of partition orders-1 is still in progress
Reassignment of partition payments-0 failed
";
        let report = parse_verify_output(stdout);
        assert_eq!(
            report.partitions,
            vec![
                ("orders-0".to_string(), PartitionProgress::Completed),
                ("orders-1".to_string(), PartitionProgress::InProgress),
                ("payments-0".to_string(), PartitionProgress::Failed),
            ]
        );
        assert!(!report.all_completed());
        assert_eq!(report.summary(), "1 completed, 1 in progress, 1 failed");
    }

    #[test]
    fn test_all_completed() {
        let report = parse_verify_output("Reassignment of partition orders-0 is complete.\n");
        assert!(report.all_completed());
        assert!(!VerifyReport::default().all_completed());
    }
}
