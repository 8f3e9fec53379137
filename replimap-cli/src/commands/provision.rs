//! Provisioning commands
//!
//! Topic creation, user credentials and ACL rules from the desired-state
//! document. Every loop here is per-item best-effort: a failed item is
//! logged and the run continues, since each item is independent and the
//! operations are idempotent on the cluster side.

use anyhow::Result;
use replimap_core::config::ReplimapConfig;
use replimap_core::desired::DesiredState;
use replimap_reassign::ToolRunner;
use tracing::{info, warn};

const SCRAM_MECHANISM: &str = "SCRAM-SHA-512";

/// Create every topic from the desired-state document.
pub async fn topics(config: &ReplimapConfig, desired: &DesiredState) -> Result<()> {
    let runner = ToolRunner::new(config.clone());
    let tool = config.tools.topics.clone();
    let (mut created, mut failed) = (0, 0);

    for (name, topic) in &desired.topics {
        let mut args = vec![
            "--create".to_string(),
            "--topic".to_string(),
            name.clone(),
            "--partitions".to_string(),
            topic.partitions.to_string(),
            "--replication-factor".to_string(),
            topic.replicas.to_string(),
        ];
        for pair in topic.tuning_pairs() {
            args.push("--config".to_string());
            args.push(pair);
        }

        let output = runner.run(&tool, &args).await?;
        if output.success {
            info!(topic = %name, "Topic created");
            created += 1;
        } else {
            warn!(topic = %name, output = %output.combined(), "Topic creation failed");
            failed += 1;
        }
    }

    info!(created, failed, "Topic provisioning finished");
    Ok(())
}

/// Create SCRAM credentials for every user in the document.
pub async fn users(config: &ReplimapConfig, desired: &DesiredState) -> Result<()> {
    let runner = ToolRunner::new(config.clone());
    let tool = config.tools.configs.clone();
    let (mut created, mut failed) = (0, 0);

    for (name, user) in &desired.users {
        if name.is_empty() || user.password.is_empty() {
            warn!("Skipping user entry with missing name or password");
            continue;
        }

        let args = vec![
            "--alter".to_string(),
            "--add-config".to_string(),
            format!("{SCRAM_MECHANISM}=[password={}]", user.password),
            "--entity-type".to_string(),
            "users".to_string(),
            "--entity-name".to_string(),
            name.clone(),
        ];

        let output = runner.run(&tool, &args).await?;
        if output.success {
            info!(user = %name, "User created");
            created += 1;
        } else {
            warn!(user = %name, output = %output.combined(), "User creation failed");
            failed += 1;
        }
    }

    info!(created, failed, "User provisioning finished");
    Ok(())
}

/// Grant the per-user ACL rules from the document.
pub async fn grant_acls(config: &ReplimapConfig, desired: &DesiredState) -> Result<()> {
    let runner = ToolRunner::new(config.clone());
    let tool = config.tools.acls.clone();
    let (mut granted, mut failed) = (0, 0);

    for (name, user) in &desired.users {
        let principal = format!("User:{name}");

        for rule in &user.acls {
            let Some((kind, resource)) = rule.resource() else {
                warn!(user = %name, "Skipping ACL rule with no resource");
                continue;
            };

            let principal_flag = if rule.allow {
                "--allow-principal"
            } else {
                "--deny-principal"
            };

            let args = vec![
                "--add".to_string(),
                principal_flag.to_string(),
                principal.clone(),
                "--operation".to_string(),
                rule.operation.to_uppercase(),
                "--resource-pattern-type".to_string(),
                rule.resource_pattern_type.to_lowercase(),
                format!("--{kind}"),
                resource.to_string(),
            ];

            let output = runner.run(&tool, &args).await?;
            if output.success {
                info!(
                    user = %name,
                    operation = %rule.operation,
                    resource = %resource,
                    "ACL granted"
                );
                granted += 1;
            } else {
                warn!(
                    user = %name,
                    operation = %rule.operation,
                    output = %output.combined(),
                    "ACL grant failed"
                );
                failed += 1;
            }
        }
    }

    info!(granted, failed, "ACL provisioning finished");
    Ok(())
}

/// List ACLs, optionally filtered by principal.
pub async fn list_acls(config: &ReplimapConfig, principal: Option<&str>) -> Result<()> {
    let runner = ToolRunner::new(config.clone());
    let tool = config.tools.acls.clone();

    let mut args = vec!["--list".to_string()];
    if let Some(principal) = principal {
        args.push("--principal".to_string());
        args.push(format!("User:{principal}"));
    }

    let output = runner.run(&tool, &args).await?;
    if !output.success {
        anyhow::bail!("ACL listing failed: {}", output.combined());
    }

    print!("{}", output.stdout);
    Ok(())
}
