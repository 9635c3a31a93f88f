pub mod privilege;
pub mod ssh;

use crate::host::Host;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub use ssh::SshExecutor;

/// Captured result of a command that actually ran on a host.
///
/// A non-zero exit status is not an error here; callers inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub fn new(stdout: String, stderr: String, exit_status: Option<i32>) -> Self {
        CommandOutput {
            stdout,
            stderr,
            exit_status,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// The command could not be run at all.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: Host,
        #[source]
        source: openssh::Error,
    },
    #[error("privilege escalation to '{user}' was rejected on {host}")]
    PrivilegeDenied { host: Host, user: String },
    #[error("transport error on {host}: {source}")]
    Transport {
        host: Host,
        #[source]
        source: openssh::Error,
    },
    #[error("command on {host} timed out after {after:?}")]
    Timeout { host: Host, after: Duration },
    #[error("output from {host} was not valid UTF-8")]
    InvalidOutput { host: Host },
    #[error("no output was returned for {host}")]
    MissingHost { host: Host },
    #[error("command cannot be quoted for {host}: {command:?}")]
    InvalidCommand { host: Host, command: String },
}

impl ExecutionError {
    pub fn host(&self) -> &Host {
        match self {
            ExecutionError::Connect { host, .. }
            | ExecutionError::PrivilegeDenied { host, .. }
            | ExecutionError::Transport { host, .. }
            | ExecutionError::Timeout { host, .. }
            | ExecutionError::InvalidOutput { host }
            | ExecutionError::MissingHost { host }
            | ExecutionError::InvalidCommand { host, .. } => host,
        }
    }
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Runs `command` under elevated privilege on every host in `hosts`.
    ///
    /// Either every host yields an output or the whole call fails; there is
    /// no partial mapping. No retries are attempted.
    async fn execute(
        &self,
        command: &str,
        hosts: &[Host],
    ) -> Result<HashMap<Host, CommandOutput>, ExecutionError>;

    /// Runs `command` on a single host. A host absent from the result is
    /// reported as [`ExecutionError::MissingHost`].
    async fn execute_one(&self, command: &str, host: &Host) -> Result<CommandOutput, ExecutionError> {
        let mut outputs = self.execute(command, std::slice::from_ref(host)).await?;
        outputs
            .remove(host)
            .ok_or_else(|| ExecutionError::MissingHost { host: host.clone() })
    }
}
