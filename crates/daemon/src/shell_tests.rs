use super::*;
use crate::supervisor::SupervisorConfig;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tempfile::TempDir;

struct FakeHost {
    backup_result: Result<String, String>,
    shutdown_called: AtomicBool,
}

impl FakeHost {
    fn ok() -> Self {
        Self { backup_result: Ok("snapshot created: backup_2026-01-01_00-00-00.zip".to_string()), shutdown_called: AtomicBool::new(false) }
    }

    fn failing() -> Self {
        Self { backup_result: Err("world folder missing".to_string()), shutdown_called: AtomicBool::new(false) }
    }
}

impl ShellHost for FakeHost {
    fn create_backup(&self) -> Result<String, String> {
        self.backup_result.clone()
    }

    fn status_summary(&self) -> String {
        "server: running, lock: owned, sync: paused".to_string()
    }

    fn request_shutdown(&self) {
        self.shutdown_called.store(true, AtomicOrdering::SeqCst);
    }
}

fn shell(host: Arc<FakeHost>) -> Shell<FakeHost> {
    let tmp = TempDir::new().expect("tempdir");
    let config = SupervisorConfig {
        java_path: "true".to_string(),
        jar_path: tmp.path().join("server.jar"),
        working_dir: tmp.path().to_path_buf(),
        min_memory: "1G".to_string(),
        max_memory: "1G".to_string(),
        extra_args: vec![],
    };
    let supervisor = Arc::new(ChildSupervisor::new(config));
    Shell::new(supervisor, host)
}

#[test]
fn parse_recognizes_builtins_case_insensitively() {
    assert_eq!(parse_command("QUIT"), ShellCommand::Quit);
    assert_eq!(parse_command("exit"), ShellCommand::Quit);
    assert_eq!(parse_command("Backup"), ShellCommand::Backup);
    assert_eq!(parse_command("status"), ShellCommand::Status);
    assert_eq!(parse_command("Help"), ShellCommand::Help);
    assert_eq!(parse_command("stop"), ShellCommand::Stop);
}

#[test]
fn parse_treats_blank_input_as_empty() {
    assert_eq!(parse_command("   "), ShellCommand::Empty);
    assert_eq!(parse_command(""), ShellCommand::Empty);
}

#[test]
fn parse_passes_through_unknown_verbs_trimmed() {
    assert_eq!(parse_command("  say hello world  \n"), ShellCommand::Passthrough("say hello world".to_string()));
}

#[test]
fn quit_requests_shutdown_and_exits_loop() {
    let host = Arc::new(FakeHost::ok());
    let sh = shell(Arc::clone(&host));
    let mut out = Vec::new();
    let exit = sh.dispatch(ShellCommand::Quit, &mut out, || "n".to_string());
    assert!(exit);
    assert!(host.shutdown_called.load(AtomicOrdering::SeqCst));
}

#[test]
fn backup_success_is_reported_and_does_not_exit() {
    let host = Arc::new(FakeHost::ok());
    let sh = shell(host);
    let mut out = Vec::new();
    let exit = sh.dispatch(ShellCommand::Backup, &mut out, || "n".to_string());
    assert!(!exit);
    let text = String::from_utf8(out).expect("utf8 output");
    assert!(text.contains("snapshot created"));
}

#[test]
fn backup_failure_is_reported_without_panicking() {
    let host = Arc::new(FakeHost::failing());
    let sh = shell(host);
    let mut out = Vec::new();
    sh.dispatch(ShellCommand::Backup, &mut out, || "n".to_string());
    let text = String::from_utf8(out).expect("utf8 output");
    assert!(text.contains("backup failed"));
}

#[test]
fn status_prints_host_summary() {
    let host = Arc::new(FakeHost::ok());
    let sh = shell(host);
    let mut out = Vec::new();
    sh.dispatch(ShellCommand::Status, &mut out, || "n".to_string());
    let text = String::from_utf8(out).expect("utf8 output");
    assert!(text.contains("server: running"));
}

#[test]
fn stop_declined_by_default_does_not_exit_or_shutdown() {
    let host = Arc::new(FakeHost::ok());
    let sh = shell(Arc::clone(&host));
    let mut out = Vec::new();
    let exit = sh.dispatch(ShellCommand::Stop, &mut out, || "".to_string());
    assert!(!exit);
    assert!(!host.shutdown_called.load(AtomicOrdering::SeqCst));
    let text = String::from_utf8(out).expect("utf8 output");
    assert!(text.contains("warning"));
}

#[test]
fn stop_confirmed_with_y_does_not_call_request_shutdown() {
    // confirmed raw stop bypasses the orchestrated shutdown entirely;
    // it only reaches the child process, never ShellHost::request_shutdown.
    let host = Arc::new(FakeHost::ok());
    let sh = shell(Arc::clone(&host));
    let mut out = Vec::new();
    let exit = sh.dispatch(ShellCommand::Stop, &mut out, || "y".to_string());
    assert!(!exit);
    assert!(!host.shutdown_called.load(AtomicOrdering::SeqCst));
}

#[test]
fn empty_line_is_a_no_op() {
    let host = Arc::new(FakeHost::ok());
    let sh = shell(Arc::clone(&host));
    let mut out = Vec::new();
    let exit = sh.dispatch(ShellCommand::Empty, &mut out, || "n".to_string());
    assert!(!exit);
    assert!(out.is_empty());
    assert!(!host.shutdown_called.load(AtomicOrdering::SeqCst));
}
