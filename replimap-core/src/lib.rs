//! replimap core types
//!
//! Shared building blocks for the reassignment planner:
//! - Cluster placement model (brokers, topics, partitions, replica sets)
//! - Desired-state document (per-topic targets, users, ACL rules)
//! - Tool configuration (cluster session, admin tooling, artifact paths)

pub mod config;
pub mod desired;
pub mod model;

// Re-export main types
pub use config::{
    ArtifactSettings, ClusterSettings, ConfigError, ReplimapConfig, SecuritySettings,
    ToolSettings,
};
pub use desired::{AclRule, DesiredState, DesiredStateError, DesiredTopicConfig, DesiredUser};
pub use model::{BrokerId, PartitionInfo, TopicDescription};
