use super::{Precheck, PrecheckError};
use crate::config::PrecheckDefaults;
use crate::executor::RemoteExecutor;
use crate::host::Host;
use async_trait::async_trait;
use clap::Parser;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsString;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ConfigPrecheck", no_binary_name = true)]
struct RawArgs {
    /// kafka configs which need to be ensured to be present, comma separated
    #[arg(long, value_name = "CONFIGS")]
    ensure_configs: String,

    /// location of the config file
    #[arg(long, value_name = "FILE")]
    config_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPrecheckArgs {
    pub ensure_configs: BTreeSet<String>,
    pub config_file: String,
}

impl ConfigPrecheckArgs {
    fn inspect_command(&self) -> Result<String, PrecheckError> {
        let path = shlex::try_quote(&self.config_file).map_err(|_| {
            PrecheckError::Argument(format!("unusable config file path {:?}", self.config_file))
        })?;
        Ok(format!("cat {}", path))
    }
}

/// Checks that every required line is present in a broker's config file and
/// re-runs provisioning when it is not.
pub struct ConfigPrecheck {
    args: ConfigPrecheckArgs,
    executor: Arc<dyn RemoteExecutor>,
    remediation_command: String,
}

impl ConfigPrecheck {
    pub fn new(
        args: ConfigPrecheckArgs,
        executor: Arc<dyn RemoteExecutor>,
        defaults: &PrecheckDefaults,
    ) -> Self {
        ConfigPrecheck {
            args,
            executor,
            remediation_command: defaults.remediation_command.to_owned(),
        }
    }

    /// Parses `--ensure-configs` and `--config-file`. Touches no host.
    pub fn parse_args<I, T>(
        raw_args: I,
        defaults: &PrecheckDefaults,
    ) -> Result<ConfigPrecheckArgs, PrecheckError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let raw = RawArgs::try_parse_from(raw_args)
            .map_err(|e| PrecheckError::Argument(e.to_string()))?;

        let ensure_configs: BTreeSet<String> = raw
            .ensure_configs
            .split(',')
            .filter(|config| !config.is_empty())
            .map(String::from)
            .collect();

        if ensure_configs.is_empty() {
            return Err(PrecheckError::Argument(String::from(
                "--ensure-configs must name at least one config",
            )));
        }

        let args = ConfigPrecheckArgs {
            ensure_configs,
            config_file: raw
                .config_file
                .unwrap_or_else(|| defaults.config_file.to_owned()),
        };
        args.inspect_command()?;

        Ok(args)
    }

    async fn assert_configs_present(&self, host: &Host) -> Result<(), PrecheckError> {
        let command = self.args.inspect_command()?;
        let output = self
            .executor
            .execute_one(&command, host)
            .await
            .map_err(|source| PrecheckError::Unverifiable {
                host: host.clone(),
                source,
            })?;

        let config_on_host: HashSet<&str> = output.stdout.lines().collect();
        let missing = self
            .args
            .ensure_configs
            .iter()
            .filter(|config| !config_on_host.contains(config.as_str()))
            .count();

        if missing > 0 {
            debug!(
                "{} of {} required configs missing from {} on {}",
                missing,
                self.args.ensure_configs.len(),
                self.args.config_file,
                host
            );
            return Err(PrecheckError::Failed { host: host.clone() });
        }

        Ok(())
    }

    async fn remediate(&self, host: &Host) {
        info!("Attempting to get latest configuration on {}", host);
        match self.executor.execute_one(&self.remediation_command, host).await {
            Ok(output) if output.success() => {
                info!("'{}' completed on {}", self.remediation_command, host);
            }
            Ok(output) => warn!(
                "'{}' exited with {:?} on {}",
                self.remediation_command, output.exit_status, host
            ),
            Err(e) => warn!("could not run '{}': {}", self.remediation_command, e),
        }
    }
}

#[async_trait]
impl Precheck for ConfigPrecheck {
    fn name(&self) -> &str {
        "ConfigPrecheck"
    }

    async fn run(&self, host: &Host) -> Result<(), PrecheckError> {
        self.assert_configs_present(host).await
    }

    async fn success(&self, host: &Host) {
        info!("Precheck for configs is successful on {}", host);
    }

    async fn failure(&self, host: &Host) {
        warn!("Precheck failed for configs on {}", host);
        self.remediate(host).await;
    }
}
