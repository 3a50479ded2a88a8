use super::*;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn echo_script(tmp: &TempDir) -> PathBuf {
    let path = tmp.path().join("fake_server.sh");
    std::fs::write(
        &path,
        "#!/bin/sh\nwhile IFS= read -r line; do\n  echo \"echo: $line\"\n  if [ \"$line\" = \"stop\" ]; then\n    exit 0\n  fi\ndone\n",
    )
    .expect("write fixture script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod fixture script");
    path
}

fn config(tmp: &TempDir) -> SupervisorConfig {
    SupervisorConfig {
        java_path: echo_script(tmp).to_string_lossy().to_string(),
        jar_path: tmp.path().join("server.jar"),
        working_dir: tmp.path().to_path_buf(),
        min_memory: "1G".to_string(),
        max_memory: "2G".to_string(),
        extra_args: vec![],
    }
}

#[test]
fn check_jar_fails_when_missing() {
    let tmp = TempDir::new().expect("tempdir");
    let supervisor = ChildSupervisor::new(config(&tmp));
    assert!(matches!(supervisor.check_jar(), Err(SupervisorError::JarNotFound(_))));
}

#[test]
fn check_jar_succeeds_when_present() {
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(&tmp);
    std::fs::write(&cfg.jar_path, b"fake jar").expect("write fixture jar");
    let supervisor = ChildSupervisor::new(cfg);
    assert!(supervisor.check_jar().is_ok());
}

#[test]
fn check_java_succeeds_for_runnable_executable() {
    let tmp = TempDir::new().expect("tempdir");
    let mut cfg = config(&tmp);
    cfg.java_path = "true".to_string();
    let supervisor = ChildSupervisor::new(cfg);
    assert!(supervisor.check_java().is_ok());
}

#[test]
fn check_java_fails_for_missing_executable() {
    let tmp = TempDir::new().expect("tempdir");
    let mut cfg = config(&tmp);
    cfg.java_path = "/no/such/binary/holdfast-test".to_string();
    let supervisor = ChildSupervisor::new(cfg);
    assert!(supervisor.check_java().is_err());
}

#[test]
fn start_spawns_process_and_reports_running() {
    let tmp = TempDir::new().expect("tempdir");
    let supervisor = ChildSupervisor::new(config(&tmp));
    let pid = supervisor.start().expect("start succeeds");
    assert!(pid > 0);
    assert!(supervisor.is_running());
    supervisor.kill();
}

#[test]
fn send_command_and_read_line_round_trip() {
    let tmp = TempDir::new().expect("tempdir");
    let supervisor = ChildSupervisor::new(config(&tmp));
    supervisor.start().expect("start succeeds");

    assert!(supervisor.send_command("hello"));
    let line = supervisor.read_line(Duration::from_secs(2));
    assert_eq!(line.as_deref(), Some("echo: hello"));

    supervisor.kill();
}

#[test]
fn stop_sends_stop_command_and_waits_for_clean_exit() {
    let tmp = TempDir::new().expect("tempdir");
    let supervisor = ChildSupervisor::new(config(&tmp));
    supervisor.start().expect("start succeeds");

    let clean = supervisor.stop(Duration::from_secs(5));
    assert!(clean, "fixture script exits cleanly on stop");
    assert!(!supervisor.is_running());
}

#[test]
fn read_line_returns_none_on_timeout_with_no_output() {
    let tmp = TempDir::new().expect("tempdir");
    let supervisor = ChildSupervisor::new(config(&tmp));
    supervisor.start().expect("start succeeds");

    let line = supervisor.read_line(Duration::from_millis(50));
    assert!(line.is_none());

    supervisor.kill();
}
