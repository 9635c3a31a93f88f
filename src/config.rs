use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

const BASE_CONFIG: &str = include_str!("config/base.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownHostsPolicy {
    Strict,
    Add,
    Accept,
}

impl From<KnownHostsPolicy> for openssh::KnownHosts {
    fn from(policy: KnownHostsPolicy) -> Self {
        match policy {
            KnownHostsPolicy::Strict => openssh::KnownHosts::Strict,
            KnownHostsPolicy::Add => openssh::KnownHosts::Add,
            KnownHostsPolicy::Accept => openssh::KnownHosts::Accept,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshSettings {
    pub user: Option<String>,
    pub port: u16,
    pub known_hosts: KnownHostsPolicy,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: Option<u64>,
}

impl SshSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BecomeSettings {
    pub enabled: bool,
    pub user: String,
}

impl BecomeSettings {
    /// The user to escalate to, if escalation is enabled.
    pub fn target_user(&self) -> Option<&str> {
        self.enabled.then_some(self.user.as_str())
    }
}

/// Defaults handed to precheck constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecheckDefaults {
    pub config_file: String,
    pub remediation_command: String,
}

impl Default for PrecheckDefaults {
    fn default() -> Self {
        PrecheckDefaults {
            config_file: String::from("/etc/kafka/server.properties"),
            remediation_command: String::from("run-puppet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub ssh: SshSettings,
    #[serde(rename = "become")]
    pub become_: BecomeSettings,
    pub precheck: PrecheckDefaults,
}

impl Settings {
    /// Loads the built-in defaults, with `path` merged over them when given.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let mut value = parse_yaml(BASE_CONFIG).context("built-in configuration is invalid")?;

        if let Some(path) = path {
            debug!("Reading configuration file: {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let overrides = parse_yaml(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            merge(&mut value, overrides);
        }

        serde_yaml::from_value(value).context("configuration does not match the expected layout")
    }
}

fn parse_yaml(content: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(content)?;
    match value {
        Value::Mapping(_) => Ok(value),
        // an empty file
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        _ => Err(anyhow!("YAML root is not a mapping")),
    }
}

/// Merges `overrides` into `base`: nested mappings merge key by key, anything
/// else replaces the base value.
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
