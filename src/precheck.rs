pub mod config;
pub mod registry;

use crate::executor::ExecutionError;
use crate::host::Host;
use async_trait::async_trait;
use log::{debug, error, info};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub use config::{ConfigPrecheck, ConfigPrecheckArgs};
pub use registry::PrecheckKind;

#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("invalid precheck arguments: {0}")]
    Argument(String),
    #[error("precheck failed on {host}")]
    Failed { host: Host },
    #[error("precheck could not be verified on {host}: {source}")]
    Unverifiable {
        host: Host,
        #[source]
        source: ExecutionError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckOutcome {
    Satisfied,
    Unsatisfied,
}

impl fmt::Display for PrecheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecheckOutcome::Satisfied => write!(f, "satisfied"),
            PrecheckOutcome::Unsatisfied => write!(f, "unsatisfied"),
        }
    }
}

/// A gate evaluated against one host before it is restarted.
///
/// Arguments are parsed before an implementation is constructed and are
/// read-only afterwards, so one instance can be shared across hosts.
#[async_trait]
pub trait Precheck: Send + Sync {
    fn name(&self) -> &str;

    /// Returns an error when the condition does not hold on `host` or
    /// cannot be verified.
    async fn run(&self, host: &Host) -> Result<(), PrecheckError>;

    /// Called after `run` succeeded.
    async fn success(&self, host: &Host);

    /// Called after `run` failed. May attempt remediation; must not fail.
    async fn failure(&self, host: &Host);
}

/// Runs `precheck` against a single host, routing to exactly one of
/// `success` or `failure`.
pub async fn check_host(precheck: &dyn Precheck, host: &Host) -> PrecheckOutcome {
    debug!("running {} on {}", precheck.name(), host);
    match precheck.run(host).await {
        Ok(()) => {
            precheck.success(host).await;
            PrecheckOutcome::Satisfied
        }
        Err(e) => {
            info!("{}: {}", precheck.name(), e);
            precheck.failure(host).await;
            PrecheckOutcome::Unsatisfied
        }
    }
}

/// Runs `precheck` against every host, at most `forks` at a time.
///
/// Results are returned in the order of `hosts`. A failing host does not
/// stop the others.
pub async fn check_hosts(
    precheck: Arc<dyn Precheck>,
    hosts: &[Host],
    forks: usize,
) -> Vec<(Host, PrecheckOutcome)> {
    let semaphore = Arc::new(Semaphore::new(forks.max(1)));
    let mut tasks = JoinSet::new();

    for (index, host) in hosts.iter().cloned().enumerate() {
        let precheck = precheck.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = check_host(precheck.as_ref(), &host).await;
            (index, outcome)
        });
    }

    let mut outcomes = vec![PrecheckOutcome::Unsatisfied; hosts.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = outcome,
            Err(e) => error!("precheck task panicked: {:?}", e),
        }
    }

    hosts.iter().cloned().zip(outcomes).collect()
}
