//! Placement evaluator
//!
//! Decides, per topic, which brokers already hold replicas and which are
//! free to take new ones, and whether the desired replica count is
//! reachable at all. Infeasible targets are rejected, never clamped.

use replimap_core::desired::DesiredTopicConfig;
use replimap_core::model::{BrokerId, TopicDescription};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::inspector::{ClusterInspector, InspectorError};

/// Evaluator errors
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Topic {0} is not present in the cluster")]
    MissingTopic(String),

    #[error("Topic {topic} cannot grow: {have} replicas present, more than {need} required")]
    InsufficientCapacity {
        topic: String,
        have: usize,
        need: usize,
    },

    #[error(transparent)]
    Inspector(#[from] InspectorError),
}

pub type Result<T> = std::result::Result<T, EvaluatorError>;

/// Placement decision for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPlacement {
    /// Brokers currently holding replicas (partition 0, the representative)
    pub current_replicas: Vec<BrokerId>,
    /// Live brokers holding no replica of this topic, ascending id order
    pub free_candidates: Vec<BrokerId>,
    /// Brokers the reassignment should target: current replicas plus the
    /// lowest-id free brokers needed to reach the desired count
    pub desired_brokers: Vec<BrokerId>,
}

/// Outcome of evaluating the desired state against live placement.
#[derive(Debug, Default)]
pub struct PlacementEvaluation {
    /// Topics that can be expanded, keyed by name
    pub placements: BTreeMap<String, TopicPlacement>,
    /// Topics with no free broker left to grow into
    pub ineligible: Vec<String>,
}

impl PlacementEvaluation {
    /// Names of topics that made it into the plan, in name order.
    pub fn eligible_topics(&self) -> impl Iterator<Item = &String> {
        self.placements.keys()
    }

    /// Sorted union of every topic's desired broker set; this is the broker
    /// list handed to the reassignment engine.
    pub fn desired_broker_union(&self) -> Vec<BrokerId> {
        let union: BTreeSet<BrokerId> = self
            .placements
            .values()
            .flat_map(|p| p.desired_brokers.iter().copied())
            .collect();
        union.into_iter().collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} topics eligible, {} ineligible",
            self.placements.len(),
            self.ineligible.len()
        )
    }
}

/// Evaluate every desired topic against live cluster placement.
///
/// Missing topics and already-satisfied replica counts abort the whole
/// evaluation; a topic with no free brokers is recorded as ineligible and
/// the batch continues.
#[instrument(skip(inspector, desired))]
pub async fn evaluate<I: ClusterInspector>(
    inspector: &I,
    desired: &BTreeMap<String, DesiredTopicConfig>,
) -> Result<PlacementEvaluation> {
    let live_topics: BTreeSet<String> = inspector.list_topics().await?.into_iter().collect();
    let brokers = inspector.list_brokers().await?;

    let mut evaluation = PlacementEvaluation::default();

    for (name, config) in desired {
        if !live_topics.contains(name) {
            return Err(EvaluatorError::MissingTopic(name.clone()));
        }

        let description = inspector.describe_topic(name).await?;

        if let Some(partition) = description.first_skewed_partition() {
            warn!(
                topic = %name,
                partition,
                "Replica placement differs from partition 0; planning from partition 0 only"
            );
        }

        match evaluate_topic(name, config, &description, &brokers)? {
            Some(placement) => {
                evaluation.placements.insert(name.clone(), placement);
            }
            None => {
                warn!(topic = %name, "No free brokers left, topic cannot be expanded");
                evaluation.ineligible.push(name.clone());
            }
        }
    }

    info!(summary = %evaluation.summary(), "Placement evaluation complete");
    Ok(evaluation)
}

/// Evaluate a single topic. `Ok(None)` means the topic is ineligible
/// (no free brokers); errors are hard stops for the whole batch.
fn evaluate_topic(
    name: &str,
    config: &DesiredTopicConfig,
    description: &TopicDescription,
    live_brokers: &[BrokerId],
) -> Result<Option<TopicPlacement>> {
    let current: Vec<BrokerId> = description
        .representative_replicas()
        .ok_or_else(|| InspectorError::Malformed(format!("topic {name} has no partitions")))?
        .to_vec();

    if current.len() >= config.replicas {
        return Err(EvaluatorError::InsufficientCapacity {
            topic: name.to_string(),
            have: current.len(),
            need: config.replicas,
        });
    }

    let current_set: BTreeSet<BrokerId> = current.iter().copied().collect();
    let free: Vec<BrokerId> = {
        let mut free: Vec<BrokerId> = live_brokers
            .iter()
            .copied()
            .filter(|id| !current_set.contains(id))
            .collect();
        free.sort_unstable();
        free.dedup();
        free
    };

    if free.is_empty() {
        return Ok(None);
    }

    let additional = config.replicas - current.len();
    if free.len() < additional {
        warn!(
            topic = %name,
            free = free.len(),
            needed = additional,
            "Fewer free brokers than needed, expanding as far as possible"
        );
    }

    let mut desired_brokers = current.clone();
    desired_brokers.extend(free.iter().copied().take(additional));
    desired_brokers.sort_unstable();

    Ok(Some(TopicPlacement {
        current_replicas: current,
        free_candidates: free,
        desired_brokers,
    }))
}
