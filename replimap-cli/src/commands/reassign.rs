//! Lifecycle commands
//!
//! One lifecycle transition per process run. The cluster session is probed
//! at startup and retried exactly once before the run is abandoned.

use anyhow::{Context, Result};
use replimap_core::config::ReplimapConfig;
use replimap_core::desired::{DesiredState, DesiredTopicConfig};
use replimap_reassign::{
    evaluate, AdminToolInspector, ArtifactStore, ClusterInspector, LifecycleController,
    ReassignTool, ReassignmentPlan, ToolRunner,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Establish the cluster session, retrying once on failure.
pub async fn connect(config: &ReplimapConfig) -> Result<AdminToolInspector> {
    let inspector = AdminToolInspector::new(ToolRunner::new(config.clone()));

    if let Err(e) = inspector.list_brokers().await {
        warn!(error = %e, "Cluster session unavailable, retrying once");
        inspector
            .list_brokers()
            .await
            .context("cluster unreachable after reconnect attempt")?;
    }

    info!("Cluster session established");
    Ok(inspector)
}

fn controller(config: &ReplimapConfig) -> Result<LifecycleController<ReassignTool>> {
    let store = ArtifactStore::open(&config.artifacts.dir)
        .with_context(|| format!("opening artifact dir {}", config.artifacts.dir.display()))?;
    let engine = ReassignTool::new(ToolRunner::new(config.clone()));
    Ok(LifecycleController::new(store, engine))
}

pub async fn generate(
    config: &ReplimapConfig,
    desired: &DesiredState,
    topics_file: Option<&Path>,
) -> Result<()> {
    let inspector = connect(config).await?;
    let targets = desired.require_topics()?;

    // A topic-list file replaces the desired document as the enumeration
    // source, but every listed topic still needs a target replica count
    let selection: BTreeMap<String, DesiredTopicConfig> = match topics_file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading topic list {}", path.display()))?;
            let mut selection = BTreeMap::new();
            for name in replimap_reassign::parse_topic_list(&contents) {
                let target = targets
                    .get(&name)
                    .with_context(|| format!("topic {name} has no desired-state entry"))?;
                selection.insert(name, target.clone());
            }
            selection
        }
        None => targets.clone(),
    };

    let evaluation = evaluate(&inspector, &selection).await?;
    for topic in &evaluation.ineligible {
        warn!(topic = %topic, "Skipped: no free brokers to expand into");
    }

    let plan = ReassignmentPlan::build(evaluation.eligible_topics().cloned())
        .context("no eligible topics left to plan")?;

    controller(config)?
        .generate(&plan, &evaluation.desired_broker_union())
        .await?;

    info!(
        topics = plan.topics.len(),
        artifact_dir = %config.artifacts.dir.display(),
        "Plan and backup artifacts generated"
    );
    Ok(())
}

pub async fn verify(config: &ReplimapConfig) -> Result<()> {
    let report = controller(config)?.verify().await?;

    for (partition, progress) in &report.partitions {
        println!("{partition}: {progress}");
    }
    println!("{}", report.summary());
    Ok(())
}

pub async fn apply(config: &ReplimapConfig) -> Result<()> {
    controller(config)?.apply().await?;
    info!("Reassignment plan applied; run verify to track progress");
    Ok(())
}

pub async fn rollback(config: &ReplimapConfig) -> Result<()> {
    controller(config)?.rollback().await?;
    info!("Backup assignment applied; plan and backup are consumed");
    Ok(())
}

/// Write the live topic list document (the plan artifact shape) to a file.
pub async fn export_topics(config: &ReplimapConfig, out: &Path) -> Result<()> {
    let inspector = connect(config).await?;
    let topics = inspector.list_topics().await?;

    let document = ReassignmentPlan::build(topics).context("cluster has no user topics")?;
    std::fs::write(out, document.to_json())
        .with_context(|| format!("writing {}", out.display()))?;

    info!(path = %out.display(), "Topic list document written");
    Ok(())
}
