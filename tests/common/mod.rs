use async_trait::async_trait;
use restart_precheck::{CommandOutput, ExecutionError, Host, RemoteExecutor};
use std::collections::HashMap;
use std::sync::Mutex;

/// What a scripted host answers to every command.
#[derive(Clone)]
pub enum Reply {
    Stdout(String),
    Exit(i32),
    Unreachable,
}

/// In-memory executor keyed by host that records every command it receives.
pub struct ScriptedExecutor {
    replies: HashMap<Host, Reply>,
    remediation: Reply,
    remediation_command: String,
    commands: Mutex<Vec<(Host, String)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        ScriptedExecutor {
            replies: HashMap::new(),
            remediation: Reply::Exit(0),
            remediation_command: String::from("run-puppet"),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, host: &str, contents: &str) -> Self {
        self.replies
            .insert(Host::new(host), Reply::Stdout(contents.to_string()));
        self
    }

    pub fn with_reply(mut self, host: &str, reply: Reply) -> Self {
        self.replies.insert(Host::new(host), reply);
        self
    }

    pub fn with_remediation(mut self, reply: Reply) -> Self {
        self.remediation = reply;
        self
    }

    pub fn commands(&self) -> Vec<(Host, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_matching(&self, host: &str, command: &str) -> usize {
        self.commands()
            .iter()
            .filter(|(h, c)| h.name() == host && c == command)
            .count()
    }

    fn reply(&self, host: &Host, command: &str) -> Result<CommandOutput, ExecutionError> {
        let reply = if command == self.remediation_command {
            match self.replies.get(host) {
                Some(Reply::Unreachable) => Reply::Unreachable,
                _ => self.remediation.clone(),
            }
        } else {
            self.replies.get(host).cloned().unwrap_or(Reply::Unreachable)
        };

        match reply {
            Reply::Stdout(stdout) => Ok(CommandOutput::new(stdout, String::new(), Some(0))),
            Reply::Exit(code) => Ok(CommandOutput::new(
                String::new(),
                String::from("command failed"),
                Some(code),
            )),
            Reply::Unreachable => Err(ExecutionError::MissingHost { host: host.clone() }),
        }
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        command: &str,
        hosts: &[Host],
    ) -> Result<HashMap<Host, CommandOutput>, ExecutionError> {
        let mut outputs = HashMap::new();
        for host in hosts {
            self.commands
                .lock()
                .unwrap()
                .push((host.clone(), command.to_string()));
            outputs.insert(host.clone(), self.reply(host, command)?);
        }
        Ok(outputs)
    }
}
