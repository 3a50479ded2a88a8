// SPDX-License-Identifier: MIT

//! Replicated lock file manager: read/write the lock record, run a
//! background heartbeat, detect staleness, and implement the
//! write-then-reread race-window acquisition protocol.
//!
//! This is cooperative, not OS-level, locking: the file lives inside
//! the sync-daemon-replicated folder, so "write it and see who wins"
//! is the only primitive available across hosts.

use holdfast_core::{Clock, LockRecord, LockStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock is held by another host: {0}")]
    OwnedByOther(String),
}

struct HeartbeatHandle {
    stop_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

/// Manages one replicated lock file for one host.
pub struct LockManager<C: Clock + 'static> {
    path: PathBuf,
    hostname: String,
    clock: C,
    heartbeat: parking_lot::Mutex<Option<HeartbeatHandle>>,
}

impl<C: Clock + 'static> LockManager<C> {
    pub fn new(path: impl Into<PathBuf>, hostname: impl Into<String>, clock: C) -> Self {
        Self { path: path.into(), hostname: hostname.into(), clock, heartbeat: parking_lot::Mutex::new(None) }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    pub fn read_lock(&self) -> std::io::Result<Option<LockRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(parse_lock_record(&raw)))
    }

    pub fn get_raw_contents(&self) -> std::io::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    pub fn write_lock(&self, record: &LockRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serialize_lock_record(record))
    }

    pub fn delete_lock(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Classifies the current lock state relative to this host and a
    /// staleness threshold. See [`LockStatus`] for the branch meanings.
    pub fn check_lock_status(&self, stale_threshold_secs: f64) -> std::io::Result<(LockStatus, Option<LockRecord>)> {
        let Some(record) = self.read_lock()? else {
            return Ok((LockStatus::Free, None));
        };
        let now = self.clock.utc_now();
        let status = if record.is_owned_by(&self.hostname) {
            LockStatus::Owned
        } else if record.is_stale(now, stale_threshold_secs) {
            LockStatus::OtherStale
        } else {
            LockStatus::OtherActive
        };
        Ok((status, Some(record)))
    }

    /// Writes a fresh lock record, waits `race_wait` for the sync
    /// daemon to propagate any concurrent write, then re-reads. Returns
    /// true only if this host still owns the lock after the window.
    pub fn acquire(&self, pid: u32, race_wait: Duration) -> Result<bool, LockError> {
        self.begin_acquire(pid)?;
        std::thread::sleep(race_wait);
        Ok(self.confirm_acquire())
    }

    /// Phase one of acquisition: write our claim. Split out from
    /// [`acquire`] so tests can inject a concurrent write during the
    /// race window without a real sleep.
    pub fn begin_acquire(&self, pid: u32) -> Result<LockRecord, LockError> {
        let record = LockRecord::new(self.hostname.clone(), self.clock.utc_now(), pid);
        self.write_lock(&record)?;
        Ok(record)
    }

    /// Phase two of acquisition: re-read and check we still own it.
    pub fn confirm_acquire(&self) -> bool {
        matches!(self.read_lock(), Ok(Some(after)) if after.is_owned_by(&self.hostname))
    }

    /// Re-reads the lock, confirms we still own it, and rewrites `pid`
    /// to the child's real process id. Called once, right after the
    /// child spawns: acquisition itself always writes a placeholder
    /// `pid=0`, since at that point there is no child yet.
    pub fn update_pid(&self, pid: u32) -> Result<(), LockError> {
        let Some(current) = self.read_lock()? else {
            return Err(LockError::OwnedByOther("lock file missing".to_string()));
        };
        if !current.is_owned_by(&self.hostname) {
            return Err(LockError::OwnedByOther(current.hostname));
        }
        let updated = LockRecord { pid, ..current };
        self.write_lock(&updated)?;
        Ok(())
    }

    /// Re-reads the lock, confirms we still own it, and rewrites
    /// `last_heartbeat`. Returns `OwnedByOther` (never panics, never
    /// kills the process) if another host has since taken the lock,
    /// so the caller's heartbeat loop can log and keep going.
    pub fn update_heartbeat(&self) -> Result<(), LockError> {
        let Some(current) = self.read_lock()? else {
            return Err(LockError::OwnedByOther("lock file missing".to_string()));
        };
        if !current.is_owned_by(&self.hostname) {
            return Err(LockError::OwnedByOther(current.hostname));
        }
        let updated = LockRecord {
            last_heartbeat: holdfast_core::format_iso(self.clock.utc_now()),
            ..current
        };
        self.write_lock(&updated)?;
        Ok(())
    }

    /// Starts a background thread that calls [`update_heartbeat`] every
    /// `interval`. A failed update is logged, not escalated: the main
    /// orchestrator is the one that decides what a lost lock means.
    pub fn start_heartbeat(self: &Arc<Self>, interval: Duration) {
        let (stop_tx, stop_rx) = mpsc::channel();
        let manager = Arc::clone(self);
        let join = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Err(e) = manager.update_heartbeat() {
                        tracing::error!(error = %e, "heartbeat update failed");
                    }
                }
            }
        });
        *self.heartbeat.lock() = Some(HeartbeatHandle { stop_tx, join });
    }

    /// Signals the heartbeat thread to stop and waits up to
    /// `interval + 5s` for it to exit. A timed-out join is logged, not
    /// an error: the lock file will be deleted regardless.
    pub fn stop_heartbeat(&self, interval: Duration) {
        let Some(handle) = self.heartbeat.lock().take() else { return };
        let _ = handle.stop_tx.send(());
        let deadline = interval + Duration::from_secs(5);
        let (done_tx, done_rx) = mpsc::channel();
        let join = handle.join;
        std::thread::spawn(move || {
            let _ = join.join();
            let _ = done_tx.send(());
        });
        if done_rx.recv_timeout(deadline).is_err() {
            tracing::warn!("heartbeat thread did not stop within the expected window");
        }
    }
}

fn serialize_lock_record(record: &LockRecord) -> String {
    format!(
        "hostname={}\nstarted_at={}\nlast_heartbeat={}\npid={}\n",
        record.hostname, record.started_at, record.last_heartbeat, record.pid
    )
}

fn parse_lock_record(raw: &str) -> LockRecord {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in raw.lines() {
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim(), value.trim());
        }
    }
    LockRecord {
        hostname: fields.get("hostname").map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()),
        started_at: fields.get("started_at").map(|s| s.to_string()).unwrap_or_default(),
        last_heartbeat: fields.get("last_heartbeat").map(|s| s.to_string()).unwrap_or_default(),
        pid: fields.get("pid").and_then(|s| s.parse().ok()).unwrap_or(0),
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
