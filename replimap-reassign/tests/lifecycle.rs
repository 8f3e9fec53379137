//! End-to-end planning and lifecycle tests
//!
//! Drives the full pipeline against fake cluster/engine ports:
//! inspect → evaluate → build plan → generate → apply → verify → rollback.
//!
//! Run with: cargo test --test lifecycle

use replimap_core::desired::DesiredTopicConfig;
use replimap_core::model::{BrokerId, PartitionInfo, TopicDescription};
use replimap_reassign::artifacts::{ArtifactStore, LifecycleState};
use replimap_reassign::engine::{
    EngineError, GeneratedAssignments, PartitionProgress, ReassignmentEngine, VerifyReport,
};
use replimap_reassign::evaluator::{evaluate, EvaluatorError};
use replimap_reassign::inspector::{ClusterInspector, InspectorError};
use replimap_reassign::lifecycle::{LifecycleController, LifecycleError};
use replimap_reassign::plan::ReassignmentPlan;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tempfile::TempDir;

/// Fixed-topology cluster fake.
struct FakeCluster {
    brokers: Vec<BrokerId>,
    topics: Vec<TopicDescription>,
}

impl FakeCluster {
    fn two_topics() -> Self {
        Self {
            brokers: vec![0, 1, 2, 3],
            topics: vec![
                topic("orders", vec![0, 1]),
                topic("payments", vec![0, 1]),
            ],
        }
    }
}

fn topic(name: &str, replicas: Vec<BrokerId>) -> TopicDescription {
    TopicDescription {
        name: name.to_string(),
        partitions: vec![PartitionInfo {
            index: 0,
            replicas,
        }],
    }
}

#[async_trait::async_trait]
impl ClusterInspector for FakeCluster {
    async fn list_topics(&self) -> Result<Vec<String>, InspectorError> {
        Ok(self.topics.iter().map(|t| t.name.clone()).collect())
    }

    async fn describe_topic(&self, name: &str) -> Result<TopicDescription, InspectorError> {
        self.topics
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| InspectorError::TopicNotFound(name.to_string()))
    }

    async fn list_brokers(&self) -> Result<Vec<BrokerId>, InspectorError> {
        Ok(self.brokers.clone())
    }
}

/// Engine fake that echoes the planned topics into its assignments and
/// records every executed document.
#[derive(Default)]
struct RecordingEngine {
    executed: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ReassignmentEngine for RecordingEngine {
    async fn generate(
        &self,
        plan_json: &str,
        broker_list: &[BrokerId],
    ) -> Result<GeneratedAssignments, EngineError> {
        let brokers = broker_list
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Ok(GeneratedAssignments {
            current: format!("current for {}", plan_json.len()),
            proposed: format!("proposed on [{brokers}]"),
        })
    }

    async fn verify(&self, _assignment_json: &str) -> Result<VerifyReport, EngineError> {
        Ok(VerifyReport {
            partitions: vec![
                ("orders-0".to_string(), PartitionProgress::Completed),
                ("payments-0".to_string(), PartitionProgress::Completed),
            ],
        })
    }

    async fn execute(&self, assignment_json: &str) -> Result<(), EngineError> {
        self.executed
            .lock()
            .unwrap()
            .push(assignment_json.to_string());
        Ok(())
    }
}

fn desired(replicas: usize) -> DesiredTopicConfig {
    DesiredTopicConfig {
        partitions: 1,
        replicas,
        params: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_end_to_end_cycle() {
    let cluster = FakeCluster::two_topics();
    let mut targets = BTreeMap::new();
    targets.insert("orders".to_string(), desired(3));
    targets.insert("payments".to_string(), desired(2));

    // Evaluate placement: both topics grow, free candidates exclude {0,1}
    let evaluation = evaluate(&cluster, &targets).await.unwrap();
    assert!(evaluation.ineligible.is_empty());
    assert_eq!(
        evaluation.placements["orders"].free_candidates,
        vec![2, 3]
    );
    assert_eq!(
        evaluation.placements["payments"].free_candidates,
        vec![2, 3]
    );

    // Build the plan from the eligible topics
    let plan = ReassignmentPlan::build(evaluation.eligible_topics().cloned()).unwrap();
    assert_eq!(
        plan.topic_names().collect::<Vec<_>>(),
        vec!["orders", "payments"]
    );

    // Walk the whole lifecycle against the fake engine
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::open(tmp.path()).unwrap();
    let controller = LifecycleController::new(store, RecordingEngine::default());

    controller
        .generate(&plan, &evaluation.desired_broker_union())
        .await
        .unwrap();
    assert_eq!(controller.state().unwrap(), LifecycleState::Generated);

    controller.apply().await.unwrap();
    let report = controller.verify().await.unwrap();
    assert!(report.all_completed());
    assert_eq!(controller.state().unwrap(), LifecycleState::Completed);
}

#[tokio::test]
async fn test_verify_before_generate_fails_with_no_plan() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::open(tmp.path()).unwrap();
    let controller = LifecycleController::new(store, RecordingEngine::default());

    assert!(matches!(
        controller.verify().await.unwrap_err(),
        LifecycleError::NoPlan
    ));
}

#[tokio::test]
async fn test_rollback_consumes_artifacts_across_process_runs() {
    let tmp = TempDir::new().unwrap();
    let plan = ReassignmentPlan::build(["orders"]).unwrap();

    // First run: generate and apply
    {
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let controller = LifecycleController::new(store, RecordingEngine::default());
        controller.generate(&plan, &[0, 1, 2]).await.unwrap();
        controller.apply().await.unwrap();
    }

    // Second run: roll back
    {
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let controller = LifecycleController::new(store, RecordingEngine::default());
        controller.rollback().await.unwrap();
    }

    // Third run: apply without a fresh generate must fail
    let store = ArtifactStore::open(tmp.path()).unwrap();
    let controller = LifecycleController::new(store, RecordingEngine::default());
    assert!(matches!(
        controller.apply().await.unwrap_err(),
        LifecycleError::InvalidTransition {
            op: "apply",
            state: LifecycleState::RolledBack,
        }
    ));
}

#[tokio::test]
async fn test_missing_desired_topic_aborts_evaluation() {
    let cluster = FakeCluster::two_topics();
    let mut targets = BTreeMap::new();
    targets.insert("audit".to_string(), desired(2));

    match evaluate(&cluster, &targets).await {
        Err(EvaluatorError::MissingTopic(name)) => assert_eq!(name, "audit"),
        other => panic!("expected MissingTopic, got {other:?}"),
    }
}

#[tokio::test]
async fn test_already_satisfied_replica_count_aborts_evaluation() {
    let cluster = FakeCluster::two_topics();
    let mut targets = BTreeMap::new();
    targets.insert("orders".to_string(), desired(2)); // already at 2 replicas

    assert!(matches!(
        evaluate(&cluster, &targets).await,
        Err(EvaluatorError::InsufficientCapacity { .. })
    ));
}
