//! Desired-state document
//!
//! The declarative target an operator feeds in: per-topic partition and
//! replica counts plus arbitrary tuning parameters, and the users/ACL rules
//! the provisioning commands manage. Loaded once per run and immutable
//! afterwards.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Desired-state document errors
#[derive(Error, Debug)]
pub enum DesiredStateError {
    #[error("Failed to read desired-state file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse desired-state file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Desired-state document has no 'topics' section")]
    NoTopics,
}

/// Top-level desired-state document.
///
/// ```yaml
/// topics:
///   orders:
///     partitions: 6
///     replicas: 3
///     cleanup.policy: compact
/// users:
///   svc-orders:
///     password: "..."
///     acls:
///       - allow: true
///         operation: read
///         topic: orders
///         resource-pattern-type: literal
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub topics: BTreeMap<String, DesiredTopicConfig>,

    #[serde(default)]
    pub users: BTreeMap<String, DesiredUser>,
}

impl DesiredState {
    /// Load the document from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DesiredStateError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Topics section, required to be non-empty for planning.
    pub fn require_topics(
        &self,
    ) -> Result<&BTreeMap<String, DesiredTopicConfig>, DesiredStateError> {
        if self.topics.is_empty() {
            return Err(DesiredStateError::NoTopics);
        }
        Ok(&self.topics)
    }
}

/// Declarative target state for one topic.
#[derive(Debug, Clone, Deserialize)]
pub struct DesiredTopicConfig {
    /// Partition count
    pub partitions: i32,
    /// Desired replica count
    pub replicas: usize,
    /// Arbitrary tuning keys (cleanup.policy, retention.ms, ...), passed
    /// through to the admin tooling verbatim
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

impl DesiredTopicConfig {
    /// Tuning parameters rendered as `key=value` strings, non-scalar values
    /// skipped. Sorted by key (BTreeMap order).
    pub fn tuning_pairs(&self) -> Vec<String> {
        self.params
            .iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| format!("{}={}", key, v)))
            .collect()
    }
}

/// A user the provisioning commands manage.
#[derive(Debug, Clone, Deserialize)]
pub struct DesiredUser {
    pub password: String,
    #[serde(default)]
    pub acls: Vec<AclRule>,
}

/// One ACL rule for a user.
#[derive(Debug, Clone, Deserialize)]
pub struct AclRule {
    /// Allow (true) or deny (false) rule
    #[serde(default = "default_allow")]
    pub allow: bool,
    /// Operation name (read, write, describe, ...)
    pub operation: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    /// Resource pattern type (literal, prefixed)
    #[serde(default = "default_pattern_type", rename = "resource-pattern-type")]
    pub resource_pattern_type: String,
}

impl AclRule {
    /// The resource this rule targets: `(resource kind, resource name)`.
    /// Exactly one of topic/group/cluster is expected; the first one set
    /// wins, `None` means the rule is unusable.
    pub fn resource(&self) -> Option<(&'static str, &str)> {
        if let Some(topic) = self.topic.as_deref() {
            Some(("topic", topic))
        } else if let Some(group) = self.group.as_deref() {
            Some(("group", group))
        } else {
            self.cluster.as_deref().map(|cluster| ("cluster", cluster))
        }
    }
}

fn default_allow() -> bool {
    true
}

fn default_pattern_type() -> String {
    "literal".to_string()
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
topics:
  orders:
    partitions: 6
    replicas: 3
    cleanup.policy: compact
    retention.ms: 604800000
  payments:
    partitions: 3
    replicas: 2
users:
  svc-orders:
    password: secret
    acls:
      - operation: read
        topic: orders
      - allow: false
        operation: write
        group: orders-cg
        resource-pattern-type: prefixed
"#;

    #[test]
    fn test_parse_document() {
        let state: DesiredState = serde_yaml::from_str(DOC).unwrap();
        assert_eq!(state.topics.len(), 2);
        assert_eq!(state.users.len(), 1);

        let orders = &state.topics["orders"];
        assert_eq!(orders.partitions, 6);
        assert_eq!(orders.replicas, 3);
    }

    #[test]
    fn test_tuning_pairs_sorted_scalars() {
        let state: DesiredState = serde_yaml::from_str(DOC).unwrap();
        let pairs = state.topics["orders"].tuning_pairs();
        assert_eq!(
            pairs,
            vec!["cleanup.policy=compact", "retention.ms=604800000"]
        );
        assert!(state.topics["payments"].tuning_pairs().is_empty());
    }

    #[test]
    fn test_acl_defaults_and_resource() {
        let state: DesiredState = serde_yaml::from_str(DOC).unwrap();
        let acls = &state.users["svc-orders"].acls;

        assert!(acls[0].allow);
        assert_eq!(acls[0].resource_pattern_type, "literal");
        assert_eq!(acls[0].resource(), Some(("topic", "orders")));

        assert!(!acls[1].allow);
        assert_eq!(acls[1].resource_pattern_type, "prefixed");
        assert_eq!(acls[1].resource(), Some(("group", "orders-cg")));
    }

    #[test]
    fn test_require_topics_empty() {
        let state: DesiredState = serde_yaml::from_str("users: {}").unwrap();
        assert!(matches!(
            state.require_topics(),
            Err(DesiredStateError::NoTopics)
        ));
    }
}
