use super::{CommandOutput, ExecutionError};
use crate::host::Host;
use log::{debug, trace};
use openssh::Session;

/// Elevated execution context bound to one open session.
///
/// Acquiring the context verifies that `sudo` accepts the target user without
/// prompting. The context borrows the session, so it is released before the
/// session is closed.
pub struct PrivilegeContext<'s> {
    session: &'s Session,
    host: &'s Host,
    become_user: Option<&'s str>,
}

impl<'s> PrivilegeContext<'s> {
    pub async fn acquire(
        session: &'s Session,
        host: &'s Host,
        become_user: Option<&'s str>,
    ) -> Result<PrivilegeContext<'s>, ExecutionError> {
        let context = PrivilegeContext {
            session,
            host,
            become_user,
        };

        if let Some(user) = become_user {
            debug!("acquiring privilege context for '{}' on {}", user, host);
            let probe = format!("sudo -n -u {} true", quote(host, user)?);
            let output = context.raw(&probe).await?;
            if !output.success() {
                trace!("sudo probe on {} said: {}", host, output.stderr.trim_end());
                return Err(ExecutionError::PrivilegeDenied {
                    host: host.clone(),
                    user: user.to_string(),
                });
            }
        }

        Ok(context)
    }

    /// Runs `command` inside the context. Non-zero exit status is returned as data.
    pub async fn run(&self, command: &str) -> Result<CommandOutput, ExecutionError> {
        let line = wrap_command(command, self.become_user).map_err(|_| {
            ExecutionError::InvalidCommand {
                host: self.host.clone(),
                command: command.to_string(),
            }
        })?;
        self.raw(&line).await
    }

    async fn raw(&self, line: &str) -> Result<CommandOutput, ExecutionError> {
        trace!("{}: {}", self.host, line);
        let output = self
            .session
            .raw_command(line)
            .output()
            .await
            .map_err(|source| ExecutionError::Transport {
                host: self.host.clone(),
                source,
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| ExecutionError::InvalidOutput {
            host: self.host.clone(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        Ok(CommandOutput::new(stdout, stderr, output.status.code()))
    }
}

fn quote(host: &Host, value: &str) -> Result<String, ExecutionError> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| ExecutionError::InvalidCommand {
            host: host.clone(),
            command: value.to_string(),
        })
}

/// Builds the remote command line, wrapping `command` in `sudo` when a
/// become user is given.
pub fn wrap_command(command: &str, become_user: Option<&str>) -> Result<String, shlex::QuoteError> {
    let script = shlex::try_quote(command)?;
    match become_user {
        Some(user) => Ok(format!(
            "sudo -n -u {} -- sh -c {}",
            shlex::try_quote(user)?,
            script
        )),
        None => Ok(format!("sh -c {}", script)),
    }
}
