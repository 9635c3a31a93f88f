mod common;

use common::{Reply, ScriptedExecutor};
use restart_precheck::config::PrecheckDefaults;
use restart_precheck::precheck::{ConfigPrecheck, PrecheckKind};
use restart_precheck::{check_host, check_hosts, Host, Precheck, PrecheckError, PrecheckOutcome};
use rstest::rstest;
use std::sync::Arc;

const HOST: &str = "kafka-1.example.com";

fn build(executor: Arc<ScriptedExecutor>, ensure_configs: &str) -> ConfigPrecheck {
    let defaults = PrecheckDefaults::default();
    let args = ConfigPrecheck::parse_args(["--ensure-configs", ensure_configs], &defaults).unwrap();
    ConfigPrecheck::new(args, executor, &defaults)
}

fn inspections(executor: &ScriptedExecutor) -> usize {
    executor
        .commands()
        .iter()
        .filter(|(_, command)| command.starts_with("cat "))
        .count()
}

#[rstest]
#[case::exact("a,b", "a\nb", true)]
#[case::subset("a,b", "a\nb\nc", true)]
#[case::order_independent("c,a", "a\nb\nc", true)]
#[case::duplicates("a,a", "a\na\nb", true)]
#[case::crlf("a,b", "a\r\nb\r\n", true)]
#[case::missing_one("a,b,d", "a\nb\nc", false)]
#[case::whitespace_differs("a", " a\nb", false)]
#[case::case_differs("A", "a", false)]
#[case::prefix_only("log.dirs=/data", "log.dirs=/data/kafka", false)]
#[case::empty_file("a", "", false)]
#[tokio::test]
async fn test_run_is_set_containment(
    #[case] ensure_configs: &str,
    #[case] contents: &str,
    #[case] satisfied: bool,
) {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, contents));
    let precheck = build(executor.clone(), ensure_configs);

    let result = precheck.run(&Host::new(HOST)).await;

    assert_eq!(result.is_ok(), satisfied);
    if !satisfied {
        assert!(matches!(result, Err(PrecheckError::Failed { .. })));
    }
    assert_eq!(inspections(&executor), 1);
}

#[tokio::test]
async fn test_run_reads_configured_file_on_target_host_only() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_config(HOST, "a")
            .with_config("kafka-2.example.com", "a"),
    );
    let defaults = PrecheckDefaults::default();
    let args = ConfigPrecheck::parse_args(
        ["--ensure-configs", "a", "--config-file", "/opt/kafka/config/server.properties"],
        &defaults,
    )
    .unwrap();
    let precheck = ConfigPrecheck::new(args, executor.clone(), &defaults);

    precheck.run(&Host::new(HOST)).await.unwrap();

    let commands = executor.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, Host::new(HOST));
    assert_eq!(
        shlex::split(&commands[0].1).unwrap(),
        ["cat", "/opt/kafka/config/server.properties"]
    );
}

#[tokio::test]
async fn test_run_is_idempotent() {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, "a\nb\nc"));
    let satisfied = build(executor.clone(), "a,b");
    let unsatisfied = build(executor.clone(), "a,d");
    let host = Host::new(HOST);

    assert!(satisfied.run(&host).await.is_ok());
    assert!(satisfied.run(&host).await.is_ok());
    assert!(unsatisfied.run(&host).await.is_err());
    assert!(unsatisfied.run(&host).await.is_err());
}

#[tokio::test]
async fn test_run_unreachable_is_unverifiable() {
    let executor = Arc::new(ScriptedExecutor::new().with_reply(HOST, Reply::Unreachable));
    let precheck = build(executor, "a");

    let result = precheck.run(&Host::new(HOST)).await;

    assert!(matches!(result, Err(PrecheckError::Unverifiable { .. })));
}

#[tokio::test]
async fn test_run_missing_file_fails() {
    let executor = Arc::new(ScriptedExecutor::new().with_reply(HOST, Reply::Exit(1)));
    let precheck = build(executor, "a");

    let result = precheck.run(&Host::new(HOST)).await;

    assert!(matches!(result, Err(PrecheckError::Failed { .. })));
}

#[tokio::test]
async fn test_satisfied_host_issues_no_remediation() {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, "a\nb\nc"));
    let precheck = build(executor.clone(), "a,b");

    let outcome = check_host(&precheck, &Host::new(HOST)).await;

    assert_eq!(outcome, PrecheckOutcome::Satisfied);
    assert_eq!(executor.commands_matching(HOST, "run-puppet"), 0);
}

#[tokio::test]
async fn test_missing_configs_remediate_once() {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, "a\nb\nc"));
    let precheck = build(executor.clone(), "a,b,d,e,f");

    let outcome = check_host(&precheck, &Host::new(HOST)).await;

    assert_eq!(outcome, PrecheckOutcome::Unsatisfied);
    assert_eq!(executor.commands_matching(HOST, "run-puppet"), 1);
    // no re-check after remediation
    assert_eq!(inspections(&executor), 1);
}

#[tokio::test]
async fn test_unreachable_host_takes_failure_path() {
    let executor = Arc::new(ScriptedExecutor::new().with_reply(HOST, Reply::Unreachable));
    let precheck = build(executor.clone(), "a");

    let outcome = check_host(&precheck, &Host::new(HOST)).await;

    assert_eq!(outcome, PrecheckOutcome::Unsatisfied);
    // remediation is attempted even though the host cannot be reached
    assert_eq!(executor.commands_matching(HOST, "run-puppet"), 1);
}

#[tokio::test]
async fn test_failed_remediation_is_swallowed() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_config(HOST, "a")
            .with_remediation(Reply::Exit(3)),
    );
    let precheck = build(executor.clone(), "b");

    let outcome = check_host(&precheck, &Host::new(HOST)).await;

    assert_eq!(outcome, PrecheckOutcome::Unsatisfied);
    assert_eq!(executor.commands_matching(HOST, "run-puppet"), 1);
}

#[tokio::test]
async fn test_custom_remediation_command() {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, "a"));
    let defaults = PrecheckDefaults {
        config_file: String::from("/etc/kafka/server.properties"),
        remediation_command: String::from("converge-now"),
    };
    let args = ConfigPrecheck::parse_args(["--ensure-configs", "b"], &defaults).unwrap();
    let precheck = ConfigPrecheck::new(args, executor.clone(), &defaults);

    check_host(&precheck, &Host::new(HOST)).await;

    assert_eq!(executor.commands_matching(HOST, "converge-now"), 1);
    assert_eq!(executor.commands_matching(HOST, "run-puppet"), 0);
}

#[tokio::test]
async fn test_missing_ensure_configs_touches_no_host() {
    let executor = Arc::new(ScriptedExecutor::new().with_config(HOST, "a"));

    let result = PrecheckKind::Config.build(
        ["--config-file", "/etc/kafka/server.properties"],
        executor.clone(),
        &PrecheckDefaults::default(),
    );

    assert!(matches!(result, Err(PrecheckError::Argument(_))));
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn test_shared_precheck_across_hosts() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_config("kafka-1", "a\nb")
            .with_config("kafka-2", "a")
            .with_reply("kafka-3", Reply::Unreachable)
            .with_config("kafka-4", "b\na\nc"),
    );
    let precheck = PrecheckKind::Config
        .build(
            ["--ensure-configs", "a,b"],
            executor.clone(),
            &PrecheckDefaults::default(),
        )
        .unwrap();
    let hosts: Vec<Host> = ["kafka-1", "kafka-2", "kafka-3", "kafka-4"]
        .into_iter()
        .map(Host::from)
        .collect();

    let results = check_hosts(precheck, &hosts, 2).await;

    let outcomes: Vec<PrecheckOutcome> = results.iter().map(|(_, outcome)| *outcome).collect();
    assert_eq!(
        outcomes,
        [
            PrecheckOutcome::Satisfied,
            PrecheckOutcome::Unsatisfied,
            PrecheckOutcome::Unsatisfied,
            PrecheckOutcome::Satisfied,
        ]
    );
    assert_eq!(executor.commands_matching("kafka-1", "run-puppet"), 0);
    assert_eq!(executor.commands_matching("kafka-2", "run-puppet"), 1);
    assert_eq!(executor.commands_matching("kafka-3", "run-puppet"), 1);
    assert_eq!(executor.commands_matching("kafka-4", "run-puppet"), 0);
}
