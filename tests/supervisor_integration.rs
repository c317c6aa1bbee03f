//! End-to-end lifecycle tests against real OS processes.
//!
//! A throwaway shell script in a tempdir stands in for the server
//! executable, so the tests exercise the full start, observe, and stop
//! path without a real game server installed.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use grid_core::config::Settings;
use grid_core::configuration::{FileConfigurationStore, JsonMaterializer};
use grid_core::supervisor::error::SupervisorError;
use grid_core::supervisor::Supervisor;
use tempfile::TempDir;

const CONFIGURATIONS: &str = r#"[
    {"id": 42, "payload": {"server": {"track": "test"}, "roster": {"slots": 4}}},
    {"id": 43, "payload": {"server": {"track": "other"}}}
]"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Supervisor wired to a fake server in `tmp`. The server script ignores
/// its `-c`/`-r` arguments and runs `server_body`.
fn test_supervisor(tmp: &TempDir, server_body: &str) -> Supervisor {
    init_tracing();

    let server_folder = tmp.path().join("install");
    fs::create_dir_all(&server_folder).unwrap();
    write_executable(&server_folder.join("server"), server_body);

    let store_path = tmp.path().join("configurations.json");
    fs::write(&store_path, CONFIGURATIONS).unwrap();

    let settings = Settings {
        log_dir: tmp.path().join("logs"),
        server_folder,
        server_executable: "server".to_string(),
    };

    Supervisor::new(
        settings,
        Arc::new(FileConfigurationStore::new(store_path)),
        Arc::new(JsonMaterializer::new(tmp.path().join("cfg"))),
    )
}

/// Poll until the pid disappears from the registry. The removal window is
/// bounded by OS scheduling, not by the supervisor, so give it a few
/// seconds before declaring failure.
async fn wait_until_gone(supervisor: &Supervisor, pid: u32) -> bool {
    for _ in 0..100 {
        if !supervisor.get_all_instances().iter().any(|i| i.pid == pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn started_instance_is_visible_exactly_once() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    supervisor.start_instance("race1", 42, "", "").await.unwrap();

    let instances = supervisor.get_all_instances();
    assert_eq!(instances.len(), 1);
    let pid = instances[0].pid;
    assert!(pid > 0);
    assert_eq!(instances[0].name, "race1");
    assert_eq!(instances[0].configuration_id, 42);
    assert_eq!(
        instances.iter().filter(|i| i.pid == pid).count(),
        1,
        "pid must appear exactly once"
    );

    supervisor.stop_instance(pid).unwrap();
    assert!(wait_until_gone(&supervisor, pid).await);
}

#[tokio::test]
async fn self_exiting_instance_is_eventually_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "exit 0");

    supervisor.start_instance("sprint", 42, "", "").await.unwrap();

    // the process may already be gone; only eventual absence is guaranteed
    let pids: Vec<u32> = supervisor.get_all_instances().iter().map(|i| i.pid).collect();
    for pid in pids {
        assert!(wait_until_gone(&supervisor, pid).await);
    }
    assert!(supervisor.get_all_instances().is_empty());
}

#[tokio::test]
async fn crashing_instance_is_eventually_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "exit 3");

    supervisor.start_instance("crash", 42, "", "").await.unwrap();

    let pids: Vec<u32> = supervisor.get_all_instances().iter().map(|i| i.pid).collect();
    for pid in pids {
        assert!(wait_until_gone(&supervisor, pid).await);
    }
}

#[tokio::test]
async fn stop_unknown_pid_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    let err = supervisor.stop_instance(999_999_999).unwrap_err();
    assert!(matches!(err, SupervisorError::NotFound { pid: 999_999_999 }));
    assert!(supervisor.get_all_instances().is_empty());
}

#[tokio::test]
async fn concurrent_starts_are_both_registered() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    let (a, b) = tokio::join!(
        supervisor.start_instance("race1", 42, "", ""),
        supervisor.start_instance("race2", 43, "", "")
    );
    a.unwrap();
    b.unwrap();

    let instances = supervisor.get_all_instances();
    assert_eq!(instances.len(), 2);
    assert_ne!(instances[0].pid, instances[1].pid);

    for instance in instances {
        supervisor.stop_instance(instance.pid).unwrap();
        assert!(wait_until_gone(&supervisor, instance.pid).await);
    }
}

#[tokio::test]
async fn empty_name_fails_before_any_side_effect() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    for name in ["", "   ", "\t\n"] {
        let err = supervisor.start_instance(name, 42, "", "").await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidArgument));
    }

    assert!(supervisor.get_all_instances().is_empty());
    // validation happens before the log directory stage
    assert!(!tmp.path().join("logs").exists());
}

#[tokio::test]
async fn unknown_configuration_fails_without_registering() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    let err = supervisor.start_instance("race1", 999, "", "").await.unwrap_err();
    assert_eq!(err.error_code(), "CONFIGURATION_READ");
    assert!(supervisor.get_all_instances().is_empty());

    // the log directory is created in an earlier stage, but no log file is
    let log_dir = tmp.path().join("logs");
    assert!(log_dir.exists());
    assert_eq!(fs::read_dir(&log_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn stopping_one_instance_leaves_the_other_running() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    supervisor.start_instance("first", 42, "", "").await.unwrap();
    supervisor.start_instance("second", 43, "", "").await.unwrap();

    let instances = supervisor.get_all_instances();
    let first = instances.iter().find(|i| i.name == "first").unwrap().pid;
    let second = instances.iter().find(|i| i.name == "second").unwrap().pid;

    supervisor.stop_instance(first).unwrap();
    assert!(wait_until_gone(&supervisor, first).await);

    let remaining = supervisor.get_all_instances();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].pid, second);

    supervisor.stop_instance(second).unwrap();
    assert!(wait_until_gone(&supervisor, second).await);
}

#[tokio::test]
async fn log_file_follows_the_naming_convention() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "exit 0");

    supervisor.start_instance("race1", 42, "", "").await.unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path().join("logs"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);

    // <YYYYMMDD_HHMMSS>_42_race1.log
    let name = &names[0];
    assert!(name.ends_with("_42_race1.log"), "unexpected name: {}", name);
    let stamp = &name[..name.len() - "_42_race1.log".len()];
    assert_eq!(stamp.len(), 15, "unexpected timestamp in: {}", name);
    assert_eq!(stamp.as_bytes()[8], b'_');
    assert!(stamp
        .chars()
        .enumerate()
        .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() }));
}

#[tokio::test]
async fn hook_scripts_receive_the_pid_and_share_the_log_file() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    let hooks = tmp.path().join("hooks");
    fs::create_dir_all(&hooks).unwrap();
    write_executable(&hooks.join("before.sh"), "echo \"before $1\"");
    write_executable(&hooks.join("after.sh"), "echo \"after $1\"");

    supervisor
        .start_instance(
            "hooked",
            42,
            hooks.join("before.sh").to_str().unwrap(),
            hooks.join("after.sh").to_str().unwrap(),
        )
        .await
        .unwrap();

    let pid = supervisor.get_all_instances()[0].pid;

    // hooks are fire-and-forget; poll the log until both lines landed
    let log_dir = tmp.path().join("logs");
    let mut content = String::new();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let entry = fs::read_dir(&log_dir).unwrap().next().unwrap().unwrap();
        content = fs::read_to_string(entry.path()).unwrap();
        if content.contains("before 0") && content.contains(&format!("after {}", pid)) {
            break;
        }
    }
    assert!(content.contains("before 0"), "log was: {:?}", content);
    assert!(
        content.contains(&format!("after {}", pid)),
        "log was: {:?}",
        content
    );

    supervisor.stop_instance(pid).unwrap();
    assert!(wait_until_gone(&supervisor, pid).await);
}

#[tokio::test]
async fn failing_hook_script_does_not_abort_the_start() {
    let tmp = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(&tmp, "sleep 30");

    supervisor
        .start_instance("resilient", 42, "/nonexistent/before.sh", "/nonexistent/after.sh")
        .await
        .unwrap();

    let instances = supervisor.get_all_instances();
    assert_eq!(instances.len(), 1);

    supervisor.stop_instance(instances[0].pid).unwrap();
    assert!(wait_until_gone(&supervisor, instances[0].pid).await);
}

#[tokio::test]
async fn materialized_configuration_reaches_the_server() {
    let tmp = tempfile::tempdir().unwrap();
    // echo the -c argument's contents into the log, then wait
    let supervisor = test_supervisor(&tmp, "cat \"$2\"; sleep 30");

    supervisor.start_instance("configured", 42, "", "").await.unwrap();
    let pid = supervisor.get_all_instances()[0].pid;

    let log_dir = tmp.path().join("logs");
    let mut content = String::new();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let entry = fs::read_dir(&log_dir).unwrap().next().unwrap().unwrap();
        content = fs::read_to_string(entry.path()).unwrap();
        if content.contains("track") {
            break;
        }
    }
    assert!(content.contains("\"track\": \"test\""), "log was: {:?}", content);

    supervisor.stop_instance(pid).unwrap();
    assert!(wait_until_gone(&supervisor, pid).await);
}
