//! Cluster placement model
//!
//! Plain value types describing current partition placement: which brokers
//! exist and which of them hold each partition's replicas. These types are
//! produced by the cluster inspector and consumed by the placement
//! evaluator; they carry no behavior beyond simple accessors.

use serde::{Deserialize, Serialize};

/// Cluster-unique broker identity.
pub type BrokerId = i32;

/// A single partition's replica placement.
///
/// The replica list is ordered; the first entry is the leader-eligible
/// replica by convention of the underlying reassignment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Partition index within its topic
    pub index: i32,
    /// Brokers holding a replica of this partition
    pub replicas: Vec<BrokerId>,
}

/// Live description of a topic: its ordered partitions with replica
/// assignments, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: String,
    pub partitions: Vec<PartitionInfo>,
}

impl TopicDescription {
    /// Replica set of partition 0, used as the representative placement for
    /// the whole topic when planning.
    pub fn representative_replicas(&self) -> Option<&[BrokerId]> {
        self.partitions
            .iter()
            .find(|p| p.index == 0)
            .map(|p| p.replicas.as_slice())
    }

    /// First partition whose replica broker set differs from partition 0's.
    ///
    /// Planning assumes uniform placement across a topic's partitions; a
    /// `Some` here means that assumption does not hold for this topic.
    pub fn first_skewed_partition(&self) -> Option<i32> {
        let representative = self.representative_replicas()?;
        let mut reference: Vec<BrokerId> = representative.to_vec();
        reference.sort_unstable();

        self.partitions
            .iter()
            .filter(|p| p.index != 0)
            .find(|p| {
                let mut replicas = p.replicas.clone();
                replicas.sort_unstable();
                replicas != reference
            })
            .map(|p| p.index)
    }
}
