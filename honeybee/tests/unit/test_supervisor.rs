#![cfg(unix)]

use std::time::Duration;

use tempfile::TempDir;

use honeybee::deploy::fsm::DeployState;
use honeybee::deploy::supervisor::{DeployEvent, DeployStatus, DeploySupervisor};
use honeybee::errors::HoneybeeError;

use honeybee::deploy::compose::ComposeCommand;

use crate::support::{
    supervisor_options, CRASHING_COMPOSE, FAKE_COMPOSE, INTERLEAVED_COMPOSE, STUBBORN_COMPOSE,
};

const COMPOSE_YAML: &str = "services:\n  web:\n    image: \"nginx\"\n";

async fn wait_for<F>(supervisor: &DeploySupervisor, predicate: F) -> DeployStatus
where
    F: Fn(&DeployStatus) -> bool,
{
    for _ in 0..200 {
        let status = supervisor.status().await;
        if predicate(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("deploy never reached the expected status");
}

fn position(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|line| line == needle)
        .unwrap_or_else(|| panic!("{:?} not in {:?}", needle, lines))
}

#[tokio::test]
async fn test_start_stream_stop() {
    let tmp = TempDir::new().unwrap();
    let supervisor = DeploySupervisor::new(supervisor_options(FAKE_COMPOSE, tmp.path()));
    let mut events = supervisor.subscribe();

    let working_dir = supervisor.start(COMPOSE_YAML).await.unwrap();
    assert!(working_dir.starts_with(tmp.path()));
    assert_eq!(
        std::fs::read_to_string(working_dir.join("docker-compose.yaml")).unwrap(),
        COMPOSE_YAML
    );

    let status = wait_for(&supervisor, |status| {
        status.output.iter().any(|line| line == "web-1 | ready")
            && status.output.iter().any(|line| line == "warning on stderr")
    })
    .await;
    assert_eq!(status.state, DeployState::Running);
    assert_eq!(status.working_dir.as_deref(), Some(working_dir.as_path()));
    // `up` runs inside the working directory
    assert!(status.output.iter().any(|line| line == "    image: \"nginx\""));
    assert!(status.output.iter().all(|line| !line.is_empty()));

    let transcript = supervisor.stop().await.unwrap();

    let created = position(&transcript, "container web-1 created");
    let ready = position(&transcript, "web-1 | ready");
    let graceful = position(&transcript, "gracefully stopping");
    let removed = position(&transcript, "container web-1 removed");
    let network = position(&transcript, "network removed");
    assert!(created < ready);
    assert!(ready < graceful);
    assert!(graceful < removed);
    assert!(graceful < network);
    assert!(transcript.iter().all(|line| !line.is_empty()));

    assert!(!working_dir.exists());
    let status = supervisor.status().await;
    assert_eq!(status.state, DeployState::Idle);
    assert!(status.output.is_empty());
    assert!(status.working_dir.is_none());
    assert_eq!(supervisor.last_transcript().await, transcript);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&DeployEvent::State(DeployState::Running)));
    assert!(seen.contains(&DeployEvent::State(DeployState::Stopping)));
    assert!(seen.contains(&DeployEvent::Line("web-1 | ready".to_string())));
    assert_eq!(seen.last(), Some(&DeployEvent::State(DeployState::Idle)));
}

#[tokio::test]
async fn test_single_active_session() {
    let tmp = TempDir::new().unwrap();
    let supervisor = DeploySupervisor::new(supervisor_options(FAKE_COMPOSE, tmp.path()));

    assert!(matches!(
        supervisor.stop().await,
        Err(HoneybeeError::NoActiveDeploy)
    ));

    supervisor.start(COMPOSE_YAML).await.unwrap();
    assert!(matches!(
        supervisor.start(COMPOSE_YAML).await,
        Err(HoneybeeError::DeployActive(_))
    ));

    supervisor.stop().await.unwrap();
    assert!(matches!(
        supervisor.stop().await,
        Err(HoneybeeError::NoActiveDeploy)
    ));

    // The slot is free again
    supervisor.start(COMPOSE_YAML).await.unwrap();
    supervisor.shutdown().await.unwrap();
    assert_eq!(supervisor.state().await, DeployState::Idle);
}

#[tokio::test]
async fn test_crash_is_torn_down() {
    let tmp = TempDir::new().unwrap();
    let supervisor = DeploySupervisor::new(supervisor_options(CRASHING_COMPOSE, tmp.path()));

    let working_dir = supervisor.start(COMPOSE_YAML).await.unwrap();
    let status = wait_for(&supervisor, |status| {
        status.state == DeployState::Idle && status.last_exit_code == Some(3)
    })
    .await;

    assert!(status.output.is_empty());
    assert!(!working_dir.exists());

    let transcript = supervisor.last_transcript().await;
    assert!(transcript.contains(&"starting".to_string()));
    assert!(transcript.contains(&"fatal: port is already allocated".to_string()));
    assert_eq!(transcript.last(), Some(&"container web-1 removed".to_string()));

    assert!(matches!(
        supervisor.stop().await,
        Err(HoneybeeError::NoActiveDeploy)
    ));

    // A crashed session does not block the next one
    let next = supervisor.start(COMPOSE_YAML).await.unwrap();
    assert_ne!(next, working_dir);
}

#[tokio::test]
async fn test_crash_without_teardown_leaves_dir_for_reaping() {
    let tmp = TempDir::new().unwrap();
    let mut options = supervisor_options(CRASHING_COMPOSE, tmp.path());
    options.teardown_on_exit = false;
    let supervisor = DeploySupervisor::new(options);

    let working_dir = supervisor.start(COMPOSE_YAML).await.unwrap();
    wait_for(&supervisor, |status| {
        status.state == DeployState::Idle && status.last_exit_code == Some(3)
    })
    .await;

    assert!(working_dir.exists());
    assert!(!supervisor
        .last_transcript()
        .await
        .contains(&"container web-1 removed".to_string()));

    assert_eq!(supervisor.reap_stray_sessions().await.unwrap(), 1);
    assert!(!working_dir.exists());
}

#[tokio::test]
async fn test_support_check() {
    let tmp = TempDir::new().unwrap();
    let supervisor = DeploySupervisor::new(supervisor_options(FAKE_COMPOSE, tmp.path()));
    assert!(supervisor.is_supported().await);

    let script = "exit 1";
    let supervisor = DeploySupervisor::new(supervisor_options(script, tmp.path()));
    assert!(!supervisor.is_supported().await);
}

#[tokio::test]
async fn test_stdout_and_stderr_keep_their_order() {
    let tmp = TempDir::new().unwrap();
    let supervisor = DeploySupervisor::new(supervisor_options(INTERLEAVED_COMPOSE, tmp.path()));

    supervisor.start(COMPOSE_YAML).await.unwrap();
    wait_for(&supervisor, |status| {
        status.output.iter().any(|line| line == "all written")
    })
    .await;
    let transcript = supervisor.stop().await.unwrap();

    let written: Vec<&str> = transcript
        .iter()
        .map(String::as_str)
        .filter(|line| line.starts_with("out ") || line.starts_with("err "))
        .collect();
    let expected: Vec<String> = (0..200)
        .flat_map(|i| [format!("out {}", i), format!("err {}", i)])
        .collect();
    assert_eq!(written, expected);
    assert_eq!(transcript.last(), Some(&"container web-1 removed".to_string()));
}

#[tokio::test]
async fn test_unresponsive_up_is_killed_and_drained() {
    let tmp = TempDir::new().unwrap();
    let mut options = supervisor_options(STUBBORN_COMPOSE, tmp.path());
    options.stop_timeout = Duration::from_millis(500);
    let supervisor = DeploySupervisor::new(options);

    let working_dir = supervisor.start(COMPOSE_YAML).await.unwrap();
    wait_for(&supervisor, |status| {
        status.output.iter().any(|line| line == "web-1 | ready")
    })
    .await;

    let transcript = supervisor.stop().await.unwrap();
    let ready = position(&transcript, "web-1 | ready");
    let ignored = position(&transcript, "interrupt ignored");
    let removed = position(&transcript, "container web-1 removed");
    assert!(ready < ignored);
    assert!(ignored < removed);
    assert!(!working_dir.exists());
    assert_eq!(supervisor.state().await, DeployState::Idle);
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    let mut options = supervisor_options(FAKE_COMPOSE, tmp.path());
    options.compose = ComposeCommand::new(&["honeybee-no-such-compose".to_string()]).unwrap();
    let supervisor = DeploySupervisor::new(options);

    let err = supervisor.start(COMPOSE_YAML).await.unwrap_err();
    assert!(matches!(err, HoneybeeError::Subprocess(_)));

    let status = supervisor.status().await;
    assert_eq!(status.state, DeployState::Idle);
    assert!(status.error.unwrap().contains("honeybee-no-such-compose"));
    // The prepared working directory is not left behind
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

    // A successful launch clears the error
    let supervisor = DeploySupervisor::new(supervisor_options(FAKE_COMPOSE, tmp.path()));
    supervisor.start(COMPOSE_YAML).await.unwrap();
    assert!(supervisor.status().await.error.is_none());
    supervisor.stop().await.unwrap();
}
