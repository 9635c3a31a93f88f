use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use restart_precheck::cli::Cli;
use restart_precheck::config::Settings;
use restart_precheck::executor::SshExecutor;
use restart_precheck::inventory::{filter_hosts, load_inventory};
use restart_precheck::precheck::{check_hosts, PrecheckKind, PrecheckOutcome};
use restart_precheck::Host;
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);

    let hosts = resolve_hosts(&cli)?;

    if cli.list_hosts {
        for host in hosts {
            println!("{}", host);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if hosts.is_empty() {
        bail!("no hosts selected, pass --hosts or --inventory");
    }

    let kind: PrecheckKind = cli.precheck.parse()?;
    let executor = Arc::new(SshExecutor::new(
        settings.ssh.clone(),
        settings.become_.clone(),
    ));
    let precheck = kind.build(&cli.precheck_args, executor, &settings.precheck)?;

    info!("running {} on {} host(s)", precheck.name(), hosts.len());
    let results = check_hosts(precheck, &hosts, cli.forks).await;

    let mut unsatisfied = 0;
    for (host, outcome) in &results {
        println!("{}: {}", host, outcome);
        if *outcome == PrecheckOutcome::Unsatisfied {
            unsatisfied += 1;
        }
    }

    if unsatisfied > 0 {
        warn!("{} of {} host(s) failed the precheck", unsatisfied, results.len());
        return Ok(ExitCode::from(2));
    }

    Ok(ExitCode::SUCCESS)
}

fn resolve_hosts(cli: &Cli) -> Result<Vec<Host>> {
    let mut hosts = cli.explicit_hosts();

    if let Some(path) = &cli.inventory {
        let file = File::open(path)
            .with_context(|| format!("could not open inventory file {}", path.display()))?;
        let inventory = load_inventory(file)
            .with_context(|| format!("could not parse inventory file {}", path.display()))?;
        for host in filter_hosts(&inventory, &cli.pattern)? {
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
    }

    Ok(hosts)
}
