//! Reassignment plan artifact
//!
//! The versioned topic-movement descriptor handed to the external
//! reassignment engine. Building is pure; repeated builds over the same
//! input serialize byte-identically, so generation is idempotent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Plan artifact schema version.
pub const PLAN_VERSION: u32 = 1;

/// Plan builder errors
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Refusing to build an empty reassignment plan")]
    Empty,
}

/// One movement descriptor: a topic whose partitions the engine should
/// redistribute. The desired broker set travels separately as the engine's
/// broker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMove {
    pub topic: String,
}

/// The plan artifact: `{ "topics": [ { "topic": .. } ], "version": 1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentPlan {
    pub topics: Vec<TopicMove>,
    pub version: u32,
}

impl ReassignmentPlan {
    /// Build a plan from topic names: deduplicated, blank entries dropped,
    /// ordered by name.
    pub fn build<I, S>(names: I) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(Into::into)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            return Err(PlanError::Empty);
        }

        Ok(Self {
            topics: names
                .into_iter()
                .map(|topic| TopicMove { topic })
                .collect(),
            version: PLAN_VERSION,
        })
    }

    /// Serialize to the artifact JSON document.
    pub fn to_json(&self) -> String {
        // Field order is fixed by the struct, so this cannot fail
        serde_json::to_string_pretty(self).expect("plan serialization is infallible")
    }

    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|m| m.topic.as_str())
    }
}

/// Parse a pre-enumerated topic list file: one topic name per line, blank
/// lines and surrounding whitespace ignored.
pub fn parse_topic_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_orders_by_topic_name() {
        let plan = ReassignmentPlan::build(["payments", "orders", "audit"]).unwrap();
        let names: Vec<_> = plan.topic_names().collect();
        assert_eq!(names, vec!["audit", "orders", "payments"]);
        assert_eq!(plan.version, 1);
    }

    #[test]
    fn test_build_deduplicates() {
        let plan = ReassignmentPlan::build(["orders", "orders", " orders "]).unwrap();
        assert_eq!(plan.topics.len(), 1);
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(matches!(
            ReassignmentPlan::build(Vec::<String>::new()),
            Err(PlanError::Empty)
        ));
        assert!(matches!(
            ReassignmentPlan::build(["", "  "]),
            Err(PlanError::Empty)
        ));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let first = ReassignmentPlan::build(["payments", "orders"]).unwrap();
        let second = ReassignmentPlan::build(["orders", "payments"]).unwrap();
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn test_artifact_document_shape() {
        let plan = ReassignmentPlan::build(["orders"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&plan.to_json()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["topics"][0]["topic"], "orders");
    }

    #[test]
    fn test_parse_topic_list() {
        let topics = parse_topic_list("orders\n\n  payments  \n");
        assert_eq!(topics, vec!["orders", "payments"]);
    }
}
