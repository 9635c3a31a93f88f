use crate::config::Settings;
use crate::host::Host;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// name of the precheck to run, e.g. `config`
    pub precheck: String,

    /// arguments handed to the precheck, after `--`
    #[arg(last = true, value_name = "PRECHECK_ARGS")]
    pub precheck_args: Vec<String>,

    /// comma separated list of hosts to check
    #[arg(long, value_delimiter = ',', value_name = "HOSTS")]
    pub hosts: Vec<String>,

    /// specify inventory host path
    #[arg(short, long, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// host pattern applied to the inventory
    #[arg(long, default_value = "all")]
    pub pattern: String,

    /// YAML configuration merged over the built-in defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// connect as this user
    #[arg(short, long)]
    pub user: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// run commands without sudo
    #[arg(long, action)]
    pub no_become: bool,

    #[arg(long, value_name = "USER")]
    pub become_user: Option<String>,

    #[arg(long, value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,

    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,

    /// number of hosts checked in parallel
    #[arg(short, long, default_value = "1")]
    pub forks: usize,

    /// outputs a list of matching hosts; does not execute anything else
    #[arg(long, action)]
    pub list_hosts: bool,
}

impl Cli {
    /// Applies command line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(user) = &self.user {
            settings.ssh.user = Some(user.to_owned());
        }
        if let Some(port) = self.port {
            settings.ssh.port = port;
        }
        if let Some(timeout) = self.connect_timeout {
            settings.ssh.connect_timeout_secs = timeout;
        }
        if let Some(timeout) = self.command_timeout {
            settings.ssh.command_timeout_secs = Some(timeout);
        }
        if self.no_become {
            settings.become_.enabled = false;
        }
        if let Some(user) = &self.become_user {
            settings.become_.user = user.to_owned();
        }
    }

    pub fn explicit_hosts(&self) -> Vec<Host> {
        self.hosts
            .iter()
            .filter(|host| !host.is_empty())
            .map(|host| Host::new(host))
            .collect()
    }
}
