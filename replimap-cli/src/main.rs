//! replimap
//!
//! One-shot operator CLI for replica reassignment on Kafka-like clusters.
//! Each invocation performs exactly one lifecycle transition (or one
//! provisioning pass) and exits.
//!
//! # Commands
//! - `generate` - Build a reassignment plan and its rollback backup
//! - `verify` - Report per-partition progress of the current plan
//! - `apply` - Execute the current plan
//! - `rollback` - Execute the backup assignment, undoing the plan
//! - `provision topics|users` - Create topics/users from the desired state
//! - `acl grant|list` - Manage ACL rules
//! - `topics export` - Write the live topic list document to a file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use replimap_core::config::ReplimapConfig;
use replimap_core::desired::DesiredState;

mod commands;

#[derive(Parser)]
#[command(name = "replimap")]
#[command(about = "Replica reassignment planner for Kafka-like clusters")]
#[command(version)]
struct Cli {
    /// Tool configuration file
    #[arg(long, global = true, default_value = "replimap.toml")]
    config: PathBuf,

    /// Desired-state document
    #[arg(long, global = true, default_value = "topics.yaml")]
    desired: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a reassignment plan and its rollback backup (engine dry-run)
    Generate {
        /// Pre-enumerated topic list (one name per line) used instead of
        /// the live cluster's topic enumeration
        #[arg(long)]
        topics_file: Option<PathBuf>,
    },

    /// Report per-partition progress of the current plan
    Verify,

    /// Execute the current plan against the cluster
    Apply,

    /// Execute the backup assignment, undoing the current plan
    Rollback,

    /// Create resources from the desired-state document
    Provision {
        #[command(subcommand)]
        target: ProvisionTarget,
    },

    /// ACL management
    Acl {
        #[command(subcommand)]
        action: AclAction,
    },

    /// Topic list utilities
    Topics {
        #[command(subcommand)]
        action: TopicsAction,
    },
}

#[derive(Subcommand)]
enum ProvisionTarget {
    /// Create every topic from the desired-state document
    Topics,
    /// Create SCRAM credentials for every user in the document
    Users,
}

#[derive(Subcommand)]
enum AclAction {
    /// Grant the per-user ACL rules from the desired-state document
    Grant,
    /// List ACLs, optionally filtered by principal
    List {
        /// Principal name (without the User: prefix)
        #[arg(long)]
        principal: Option<String>,
    },
}

#[derive(Subcommand)]
enum TopicsAction {
    /// Write the live topic list document to a file
    Export {
        /// Output path
        #[arg(long, default_value = "topics.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = ReplimapConfig::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    tokio::select! {
        result = run(&cli, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    }
}

async fn run(cli: &Cli, config: &ReplimapConfig) -> Result<()> {
    match &cli.command {
        Commands::Generate { topics_file } => {
            let desired = load_desired(&cli.desired)?;
            commands::reassign::generate(config, &desired, topics_file.as_deref()).await
        }
        Commands::Verify => commands::reassign::verify(config).await,
        Commands::Apply => commands::reassign::apply(config).await,
        Commands::Rollback => commands::reassign::rollback(config).await,
        Commands::Provision { target } => {
            let desired = load_desired(&cli.desired)?;
            match target {
                ProvisionTarget::Topics => commands::provision::topics(config, &desired).await,
                ProvisionTarget::Users => commands::provision::users(config, &desired).await,
            }
        }
        Commands::Acl { action } => match action {
            AclAction::Grant => {
                let desired = load_desired(&cli.desired)?;
                commands::provision::grant_acls(config, &desired).await
            }
            AclAction::List { principal } => {
                commands::provision::list_acls(config, principal.as_deref()).await
            }
        },
        Commands::Topics { action } => match action {
            TopicsAction::Export { out } => commands::reassign::export_topics(config, out).await,
        },
    }
}

fn load_desired(path: &std::path::Path) -> Result<DesiredState> {
    DesiredState::from_file(path)
        .with_context(|| format!("loading desired state from {}", path.display()))
}
