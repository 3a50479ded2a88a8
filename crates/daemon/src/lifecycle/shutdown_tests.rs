use super::*;
use crate::lifecycle::{AutoDecline, Orchestrator};
use crate::lock::LockManager;
use crate::supervisor::{ChildSupervisor, SupervisorConfig};
use holdfast_core::{BackupConfig, Config, FakeClock, LoggingConfig, RetentionPolicy, SafetyConfig, ServerConfig, SyncConfig};
use holdfast_storage::SnapshotEngine;
use holdfast_sync::SyncClient;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn echo_script(tmp: &TempDir) -> PathBuf {
    let path = tmp.path().join("fake_server.sh");
    std::fs::write(&path, "#!/bin/sh\nwhile IFS= read -r line; do\n  echo \"echo: $line\"\n  if [ \"$line\" = \"stop\" ]; then\n    exit 0\n  fi\ndone\n")
        .expect("write fixture script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod fixture script");
    path
}

fn build(tmp: &TempDir) -> Orchestrator<FakeClock> {
    let server_dir = tmp.path().join("server");
    let backup_dir = tmp.path().join("backups");
    std::fs::create_dir_all(&server_dir).expect("mkdir server");
    std::fs::write(server_dir.join("a.txt"), b"hello").expect("write fixture file");

    let config = Config {
        server: ServerConfig {
            folder: server_dir.clone(),
            jar_name: "server.jar".to_string(),
            java_path: "true".to_string(),
            min_memory: "1G".to_string(),
            max_memory: "1G".to_string(),
            extra_args: vec![],
        },
        backup: BackupConfig { folder: backup_dir.clone(), auto_prune: true, retention: RetentionPolicy { keep_minimum: 1, keep_days: 30 } },
        sync: SyncConfig { url: "http://127.0.0.1:0".to_string(), folder_id: "test".to_string() },
        safety: SafetyConfig { heartbeat_interval_secs: 1, stale_threshold_secs: 2, race_wait_secs: 0, sync_wait_timeout_secs: 1 },
        logging: LoggingConfig::default(),
    };
    std::fs::write(config.server_jar(), b"fake jar").expect("write jar");

    let supervisor_config = SupervisorConfig {
        java_path: echo_script(tmp).to_string_lossy().to_string(),
        jar_path: config.server_jar(),
        working_dir: server_dir.clone(),
        min_memory: "1G".to_string(),
        max_memory: "1G".to_string(),
        extra_args: vec![],
    };

    let clock = FakeClock::new();
    let lock = LockManager::new(config.lock_file(), "host-a", clock.clone());
    let supervisor = ChildSupervisor::new(supervisor_config);
    let sync = SyncClient::new(config.sync.url.clone(), "", config.sync.folder_id.clone());
    let snapshots = SnapshotEngine::new(server_dir, backup_dir);

    Orchestrator::new(config, clock, lock, supervisor, sync, snapshots)
}

#[test]
fn shutdown_after_successful_startup_is_clean_and_releases_everything() {
    let tmp = TempDir::new().expect("tempdir");
    let orch = build(&tmp);
    run_startup(&orch, &AutoDecline).expect("startup succeeds");

    let report = run_shutdown(&orch);

    assert!(report.is_clean(), "expected a clean shutdown, got {report:?}");
    assert!(!orch.supervisor.is_running());
    assert!(!orch.lock.is_locked());
    // The fake clock doesn't advance between the pre-start (S3) and
    // post-stop (T2) snapshots, so both share the same filename and the
    // second overwrites the first on disk.
    let snapshots = orch.snapshots.list().expect("list succeeds");
    assert_eq!(snapshots.len(), 1, "post-stop snapshot should have been created");
}

#[test]
fn shutdown_is_idempotent_when_run_twice() {
    let tmp = TempDir::new().expect("tempdir");
    let orch = build(&tmp);
    run_startup(&orch, &AutoDecline).expect("startup succeeds");

    let first = run_shutdown(&orch);
    let second = run_shutdown(&orch);

    assert!(first.is_clean());
    assert!(second.is_clean(), "second shutdown on an already-torn-down orchestrator must also be clean");
    assert!(!orch.lock.is_locked());
}

#[test]
fn shutdown_with_no_prior_startup_does_not_panic() {
    let tmp = TempDir::new().expect("tempdir");
    let orch = build(&tmp);
    let report = run_shutdown(&orch);
    assert!(report.is_clean());
}
