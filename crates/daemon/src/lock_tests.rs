use super::*;
use chrono::Utc;
use holdfast_core::FakeClock;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn manager(tmp: &TempDir, hostname: &str) -> LockManager<FakeClock> {
    LockManager::new(tmp.path().join("server.lock"), hostname, FakeClock::new())
}

#[test]
fn free_when_no_lock_file_exists() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let (status, record) = m.check_lock_status(60.0).expect("status check succeeds");
    assert_eq!(status, LockStatus::Free);
    assert!(record.is_none());
}

#[test]
fn owned_when_lock_belongs_to_self() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let now = m.clock.utc_now();
    m.write_lock(&LockRecord::new("host-a", now, 42)).expect("write succeeds");
    let (status, _) = m.check_lock_status(60.0).expect("status check succeeds");
    assert_eq!(status, LockStatus::Owned);
}

#[test]
fn other_active_when_foreign_heartbeat_is_fresh() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let now = m.clock.utc_now();
    m.write_lock(&LockRecord::new("host-b", now, 42)).expect("write succeeds");
    let (status, _) = m.check_lock_status(60.0).expect("status check succeeds");
    assert_eq!(status, LockStatus::OtherActive);
}

#[test]
fn other_stale_when_foreign_heartbeat_exceeds_threshold() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let now = m.clock.utc_now();
    let old = now - chrono::Duration::seconds(120);
    m.write_lock(&LockRecord::new("host-b", old, 42)).expect("write succeeds");
    let (status, _) = m.check_lock_status(60.0).expect("status check succeeds");
    assert_eq!(status, LockStatus::OtherStale);
}

#[test]
fn acquire_succeeds_when_no_contender_overwrites_lock() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let won = m.acquire(1234, StdDuration::from_millis(5)).expect("acquire succeeds");
    assert!(won);
    let record = m.read_lock().expect("read succeeds").expect("lock exists");
    assert_eq!(record.hostname, "host-a");
}

#[test]
fn acquire_loses_when_another_host_overwrites_during_race_window() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    // Simulate a concurrent winner by overwriting the lock file with a
    // foreign hostname immediately, before the re-read.
    let lock_path = tmp.path().join("server.lock");
    let contender = LockManager::new(&lock_path, "host-b", FakeClock::new());

    m.begin_acquire(1).expect("initial claim succeeds");
    contender.write_lock(&LockRecord::new("host-b", contender.clock.utc_now(), 2)).expect("contender write succeeds");

    let won = m.confirm_acquire();
    assert!(!won);
}

#[test]
fn update_heartbeat_refreshes_timestamp_when_owned() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let now = m.clock.utc_now();
    m.write_lock(&LockRecord::new("host-a", now, 1)).expect("write succeeds");

    m.clock.advance(StdDuration::from_secs(30));
    m.update_heartbeat().expect("heartbeat updates");

    let record = m.read_lock().expect("read succeeds").expect("lock exists");
    let age = record.heartbeat_age(m.clock.utc_now());
    assert!(age < 1.0, "heartbeat should be fresh after update, got age {age}");
}

#[test]
fn update_heartbeat_fails_when_lock_taken_by_another_host() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    m.write_lock(&LockRecord::new("host-b", m.clock.utc_now(), 1)).expect("write succeeds");
    let result = m.update_heartbeat();
    assert!(matches!(result, Err(LockError::OwnedByOther(_))));
}

#[test]
fn update_pid_rewrites_pid_without_touching_other_fields() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    let now = m.clock.utc_now();
    m.write_lock(&LockRecord::new("host-a", now, 0)).expect("write succeeds");

    m.update_pid(4321).expect("pid update succeeds");

    let record = m.read_lock().expect("read succeeds").expect("lock exists");
    assert_eq!(record.pid, 4321);
    assert_eq!(record.hostname, "host-a");
    assert_eq!(record.started_at, holdfast_core::format_iso(now));
}

#[test]
fn update_pid_fails_when_lock_taken_by_another_host() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    m.write_lock(&LockRecord::new("host-b", m.clock.utc_now(), 1)).expect("write succeeds");
    let result = m.update_pid(999);
    assert!(matches!(result, Err(LockError::OwnedByOther(_))));
}

#[test]
fn delete_lock_is_idempotent() {
    let tmp = TempDir::new().expect("tempdir");
    let m = manager(&tmp, "host-a");
    m.delete_lock().expect("delete on missing file succeeds");
    m.write_lock(&LockRecord::new("host-a", m.clock.utc_now(), 1)).expect("write succeeds");
    m.delete_lock().expect("delete succeeds");
    m.delete_lock().expect("second delete is a no-op");
    assert!(!m.is_locked());
}

#[test]
fn serialize_and_parse_round_trip_unknown_keys_are_ignored() {
    let record = LockRecord::new("host-a", Utc::now(), 7);
    let raw = serialize_lock_record(&record) + "extra_field=ignored\n";
    let parsed = parse_lock_record(&raw);
    assert_eq!(parsed.hostname, record.hostname);
    assert_eq!(parsed.pid, record.pid);
}

#[test]
fn parse_lock_record_defaults_missing_fields() {
    let parsed = parse_lock_record("");
    assert_eq!(parsed.hostname, "unknown");
    assert_eq!(parsed.pid, 0);
    assert_eq!(parsed.heartbeat_age(Utc::now()), f64::INFINITY);
}
