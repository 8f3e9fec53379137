//! Cluster inspector
//!
//! Read-only view of live broker/topic/partition metadata, behind a port so
//! planning and lifecycle logic never touch real admin tooling in tests.

use replimap_core::model::{BrokerId, PartitionInfo, TopicDescription};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::runner::{RunnerError, ToolRunner};

/// Inspector errors
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Cluster unavailable: {0}")]
    Connectivity(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Unparseable metadata from admin tool: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, InspectorError>;

impl From<RunnerError> for InspectorError {
    fn from(e: RunnerError) -> Self {
        InspectorError::Connectivity(e.to_string())
    }
}

/// Internal/system topics are never planning candidates.
pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with("__")
}

/// Read-only cluster metadata port.
#[async_trait::async_trait]
pub trait ClusterInspector: Send + Sync {
    /// Topic names, internal topics excluded.
    async fn list_topics(&self) -> Result<Vec<String>>;

    /// Ordered partitions with replica assignments for one topic.
    async fn describe_topic(&self, name: &str) -> Result<TopicDescription>;

    /// Live broker id set.
    async fn list_brokers(&self) -> Result<Vec<BrokerId>>;
}

/// Inspector backed by the cluster's stock admin tools.
pub struct AdminToolInspector {
    runner: ToolRunner,
}

impl AdminToolInspector {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

#[async_trait::async_trait]
impl ClusterInspector for AdminToolInspector {
    #[instrument(skip(self))]
    async fn list_topics(&self) -> Result<Vec<String>> {
        let tool = self.runner.config().tools.topics.clone();
        let output = self.runner.run(&tool, &["--list".to_string()]).await?;

        if !output.success {
            return Err(InspectorError::Connectivity(output.combined()));
        }

        let mut topics: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_internal_topic(line))
            .map(str::to_string)
            .collect();
        topics.sort_unstable();

        debug!(count = topics.len(), "Listed topics");
        Ok(topics)
    }

    #[instrument(skip(self))]
    async fn describe_topic(&self, name: &str) -> Result<TopicDescription> {
        let tool = self.runner.config().tools.topics.clone();
        let output = self
            .runner
            .run(
                &tool,
                &["--describe".to_string(), "--topic".to_string(), name.to_string()],
            )
            .await?;

        if !output.success {
            let combined = output.combined();
            if combined.contains("does not exist") {
                return Err(InspectorError::TopicNotFound(name.to_string()));
            }
            return Err(InspectorError::Connectivity(combined));
        }

        parse_describe_output(name, &output.stdout)
    }

    #[instrument(skip(self))]
    async fn list_brokers(&self) -> Result<Vec<BrokerId>> {
        let tool = self.runner.config().tools.broker_api_versions.clone();
        let output = self.runner.run(&tool, &[]).await?;

        if !output.success {
            return Err(InspectorError::Connectivity(output.combined()));
        }

        let brokers = parse_broker_ids(&output.stdout);
        if brokers.is_empty() {
            return Err(InspectorError::Malformed(
                "no broker ids in tool output".to_string(),
            ));
        }

        debug!(count = brokers.len(), "Listed brokers");
        Ok(brokers)
    }
}

/// Parse `kafka-topics.sh --describe` output into a topic description.
///
/// Partition lines look like:
/// `Topic: orders  Partition: 0  Leader: 0  Replicas: 0,1  Isr: 0,1`
fn parse_describe_output(name: &str, stdout: &str) -> Result<TopicDescription> {
    let mut partitions = Vec::new();

    for line in stdout.lines() {
        let Some(index) = parse_labeled_field(line, "Partition:") else {
            continue;
        };
        let index: i32 = index
            .parse()
            .map_err(|_| InspectorError::Malformed(format!("bad partition index in: {line}")))?;

        let replicas_field = parse_labeled_field(line, "Replicas:")
            .ok_or_else(|| InspectorError::Malformed(format!("no replica list in: {line}")))?;

        let replicas = replicas_field
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<BrokerId>()
                    .map_err(|_| InspectorError::Malformed(format!("bad broker id in: {line}")))
            })
            .collect::<Result<Vec<_>>>()?;

        partitions.push(PartitionInfo { index, replicas });
    }

    if partitions.is_empty() {
        return Err(InspectorError::Malformed(format!(
            "describe output for {name} carried no partition lines"
        )));
    }

    partitions.sort_by_key(|p| p.index);
    Ok(TopicDescription {
        name: name.to_string(),
        partitions,
    })
}

/// Value of a whitespace-delimited `Label: value` field within a line.
fn parse_labeled_field<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let start = line.find(label)? + label.len();
    let rest = line[start..].trim_start();
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Extract broker ids from `kafka-broker-api-versions.sh` output, whose
/// header lines look like `kafka-1:9092 (id: 1 rack: null) -> (`.
fn parse_broker_ids(stdout: &str) -> Vec<BrokerId> {
    let mut ids: Vec<BrokerId> = stdout
        .lines()
        .filter_map(|line| {
            let start = line.find("(id: ")? + "(id: ".len();
            let rest = &line[start..];
            let end = rest.find(|c: char| !c.is_ascii_digit() && c != '-')?;
            rest[..end].parse().ok()
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
