//! Tool configuration
//!
//! Loaded once from a TOML file and threaded explicitly into every
//! component constructor; nothing reads configuration from process-global
//! state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Complete tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplimapConfig {
    /// Cluster session settings
    #[serde(default)]
    pub cluster: ClusterSettings,

    /// Security settings for the admin tooling
    #[serde(default)]
    pub security: SecuritySettings,

    /// External admin tooling invocation
    #[serde(default)]
    pub tools: ToolSettings,

    /// Reassignment artifact storage
    #[serde(default)]
    pub artifacts: ArtifactSettings,
}

impl ReplimapConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ReplimapConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.bootstrap_server.is_empty() {
            return Err(ConfigError::Validation(
                "cluster.bootstrap_server must not be empty".to_string(),
            ));
        }
        if self.security.enabled
            && (self.security.username.is_empty() || self.security.password.is_empty())
        {
            return Err(ConfigError::Validation(
                "security.username and security.password are required when security is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Cluster session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Bootstrap server handed to every admin tool invocation
    #[serde(default = "default_bootstrap")]
    pub bootstrap_server: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            bootstrap_server: default_bootstrap(),
        }
    }
}

/// SASL/TLS settings rendered into the admin tooling's command-config
/// properties file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Whether a command-config file is rendered at all
    #[serde(default)]
    pub enabled: bool,

    /// Security protocol (SASL_PLAINTEXT, SASL_SSL, ...)
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// SASL mechanism (SCRAM-SHA-256, SCRAM-SHA-512, PLAIN)
    #[serde(default = "default_mechanism")]
    pub mechanism: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            protocol: default_protocol(),
            mechanism: default_mechanism(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl SecuritySettings {
    /// Render the `--command-config` properties file contents, or `None`
    /// when security is disabled.
    pub fn to_properties(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        Some(format!(
            "security.protocol={}\n\
             sasl.mechanism={}\n\
             sasl.jaas.config=org.apache.kafka.common.security.scram.ScramLoginModule \
             required username=\"{}\" password=\"{}\";\n",
            self.protocol, self.mechanism, self.username, self.password
        ))
    }
}

/// External admin tooling invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Argv prefix prepended to every tool invocation, e.g.
    /// `["docker", "exec", "kafka"]` when the tooling lives in a container
    #[serde(default)]
    pub prefix: Vec<String>,

    #[serde(default = "default_reassign_tool")]
    pub reassign_partitions: String,

    #[serde(default = "default_topics_tool")]
    pub topics: String,

    #[serde(default = "default_configs_tool")]
    pub configs: String,

    #[serde(default = "default_acls_tool")]
    pub acls: String,

    #[serde(default = "default_broker_versions_tool")]
    pub broker_api_versions: String,

    /// Directory for tool input files (topic lists, command-config)
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            prefix: Vec::new(),
            reassign_partitions: default_reassign_tool(),
            topics: default_topics_tool(),
            configs: default_configs_tool(),
            acls: default_acls_tool(),
            broker_api_versions: default_broker_versions_tool(),
            work_dir: default_work_dir(),
        }
    }
}

/// Reassignment artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    /// Directory holding the plan/backup pair, lifecycle state and lock
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

fn default_bootstrap() -> String {
    "localhost:9092".to_string()
}

fn default_protocol() -> String {
    "SASL_PLAINTEXT".to_string()
}

fn default_mechanism() -> String {
    "SCRAM-SHA-512".to_string()
}

fn default_reassign_tool() -> String {
    "kafka-reassign-partitions.sh".to_string()
}

fn default_topics_tool() -> String {
    "kafka-topics.sh".to_string()
}

fn default_configs_tool() -> String {
    "kafka-configs.sh".to_string()
}

fn default_acls_tool() -> String {
    "kafka-acls.sh".to_string()
}

fn default_broker_versions_tool() -> String {
    "kafka-broker-api-versions.sh".to_string()
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("replimap")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("reassignment")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReplimapConfig::default();
        assert_eq!(config.cluster.bootstrap_server, "localhost:9092");
        assert!(!config.security.enabled);
        assert!(config.tools.prefix.is_empty());
        assert_eq!(config.artifacts.dir, PathBuf::from("reassignment"));
    }

    #[test]
    fn test_parse_full_config() {
        let config: ReplimapConfig = toml::from_str(
            r#"
            [cluster]
            bootstrap_server = "kafka-0:9092"

            [security]
            enabled = true
            mechanism = "SCRAM-SHA-256"
            username = "admin"
            password = "admin-secret"

            [tools]
            prefix = ["docker", "exec", "kafka"]

            [artifacts]
            dir = "/var/lib/replimap"
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.bootstrap_server, "kafka-0:9092");
        assert_eq!(config.tools.prefix, vec!["docker", "exec", "kafka"]);
        assert_eq!(config.tools.topics, "kafka-topics.sh");
        assert_eq!(config.artifacts.dir, PathBuf::from("/var/lib/replimap"));
    }

    #[test]
    fn test_properties_rendering() {
        let security = SecuritySettings {
            enabled: true,
            username: "admin".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };

        let props = security.to_properties().unwrap();
        assert!(props.contains("security.protocol=SASL_PLAINTEXT"));
        assert!(props.contains("sasl.mechanism=SCRAM-SHA-512"));
        assert!(props.contains("username=\"admin\" password=\"secret\";"));
    }

    #[test]
    fn test_properties_disabled() {
        assert!(SecuritySettings::default().to_properties().is_none());
    }

    #[test]
    fn test_validation_rejects_enabled_security_without_credentials() {
        let config = ReplimapConfig {
            security: SecuritySettings {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }
}
