//! replimap reassignment library
//!
//! Plans and drives replica reassignment for Kafka-like clusters:
//! - Cluster inspection (live broker/topic/partition metadata)
//! - Placement evaluation (which brokers can take new replicas)
//! - Plan building (the versioned topic-movement artifact)
//! - Lifecycle control (generate / verify / apply / rollback)
//!
//! The cluster and the reassignment engine sit behind ports
//! ([`inspector::ClusterInspector`], [`engine::ReassignmentEngine`]); the
//! shipped adapters drive the cluster's stock admin tooling.

pub mod artifacts;
pub mod engine;
pub mod evaluator;
pub mod inspector;
pub mod lifecycle;
pub mod plan;
pub mod runner;

// Re-export main types
pub use artifacts::{ArtifactError, ArtifactStore, LifecycleState, RunLock};
pub use engine::{
    EngineError, GeneratedAssignments, PartitionProgress, ReassignTool, ReassignmentEngine,
    VerifyReport,
};
pub use evaluator::{evaluate, EvaluatorError, PlacementEvaluation, TopicPlacement};
pub use inspector::{AdminToolInspector, ClusterInspector, InspectorError};
pub use lifecycle::{LifecycleController, LifecycleError};
pub use plan::{parse_topic_list, PlanError, ReassignmentPlan, PLAN_VERSION};
pub use runner::{RunnerError, ToolOutput, ToolRunner};
