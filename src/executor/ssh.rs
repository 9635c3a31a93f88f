use super::privilege::PrivilegeContext;
use super::{CommandOutput, ExecutionError, RemoteExecutor};
use crate::config::{BecomeSettings, SshSettings};
use crate::host::Host;
use async_trait::async_trait;
use log::{debug, info, warn};
use openssh::{Session, SessionBuilder};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Executes commands over SSH, one multiplexed session per host per command.
pub struct SshExecutor {
    ssh: SshSettings,
    become_: BecomeSettings,
}

impl SshExecutor {
    pub fn new(ssh: SshSettings, become_: BecomeSettings) -> Self {
        SshExecutor { ssh, become_ }
    }

    fn builder(&self) -> SessionBuilder {
        let mut builder = SessionBuilder::default();
        builder
            .known_hosts_check(self.ssh.known_hosts.clone().into())
            .connect_timeout(self.ssh.connect_timeout())
            .port(self.ssh.port);
        if let Some(user) = &self.ssh.user {
            builder.user(user.to_owned());
        }
        builder
    }

    async fn connect(&self, host: &Host) -> Result<Session, ExecutionError> {
        debug!("connecting to {}", host);
        self.builder()
            .connect_mux(host.name())
            .await
            .map_err(|source| ExecutionError::Connect {
                host: host.clone(),
                source,
            })
    }

    async fn execute_on_host(&self, command: &str, host: &Host) -> Result<CommandOutput, ExecutionError> {
        let session = self.connect(host).await?;

        let result = self.run_in_session(&session, command, host).await;

        // the session is released whatever happened to the command
        if let Err(e) = session.close().await {
            warn!("failed to close session to {}: {}", host, e);
        }

        result
    }

    async fn run_in_session(
        &self,
        session: &Session,
        command: &str,
        host: &Host,
    ) -> Result<CommandOutput, ExecutionError> {
        let become_user = self.become_.target_user();
        with_timeout(self.ssh.command_timeout(), host, async {
            let context = PrivilegeContext::acquire(session, host, become_user).await?;
            context.run(command).await
        })
        .await
    }
}

async fn with_timeout<F>(
    limit: Option<Duration>,
    host: &Host,
    future: F,
) -> Result<CommandOutput, ExecutionError>
where
    F: Future<Output = Result<CommandOutput, ExecutionError>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, future)
            .await
            .unwrap_or_else(|_| {
                Err(ExecutionError::Timeout {
                    host: host.clone(),
                    after,
                })
            }),
        None => future.await,
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(
        &self,
        command: &str,
        hosts: &[Host],
    ) -> Result<HashMap<Host, CommandOutput>, ExecutionError> {
        let mut outputs = HashMap::new();

        for host in hosts {
            if outputs.contains_key(host) {
                continue;
            }
            info!("executing on host: {}", host);
            let output = self.execute_on_host(command, host).await?;
            if !output.success() {
                debug!(
                    "command on {} exited with {:?}: {}",
                    host,
                    output.exit_status,
                    output.stderr.trim_end()
                );
            }
            outputs.insert(host.clone(), output);
        }

        Ok(outputs)
    }
}
