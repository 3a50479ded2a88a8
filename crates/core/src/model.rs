// SPDX-License-Identifier: MIT

//! Shared data types passed between the lock manager, snapshot engine,
//! sync client, and orchestrator. None of these types know how to
//! persist themselves to disk or the network; that's each component's
//! own job. This module only defines the shapes and their invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The replicated lock file's contents.
///
/// Unknown keys are ignored on read; missing keys fall back to the
/// defaults below rather than failing the read, because a lock file
/// written by an older or foreign build should still be interpretable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub last_heartbeat: String,
    #[serde(default)]
    pub pid: u32,
}

fn default_hostname() -> String {
    "unknown".to_string()
}

impl LockRecord {
    pub fn new(hostname: impl Into<String>, now: DateTime<Utc>, pid: u32) -> Self {
        let ts = crate::clock::format_iso(now);
        Self { hostname: hostname.into(), started_at: ts.clone(), last_heartbeat: ts, pid }
    }

    /// Age of the last heartbeat, in seconds. Infinite if the timestamp
    /// can't be parsed, which callers treat as "certainly stale".
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> f64 {
        crate::clock::age_seconds(&self.last_heartbeat, now)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, threshold_secs: f64) -> bool {
        self.heartbeat_age(now) > threshold_secs
    }

    pub fn is_owned_by(&self, hostname: &str) -> bool {
        self.hostname == hostname
    }
}

/// Outcome of consulting the lock file against the current host and a
/// staleness threshold. See the lock manager for the acquisition and
/// takeover flows that consume this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// No lock file present; free to acquire.
    Free,
    /// Lock file present and owned by this host. May be a crash-recovery
    /// of our own prior run, or (more rarely) a second concurrent
    /// instance on the same host; the two cases are not distinguished.
    Owned,
    /// Lock file present, owned by another host, heartbeat still fresh.
    OtherActive,
    /// Lock file present, owned by another host, heartbeat past the
    /// stale threshold.
    OtherStale,
}

/// A snapshot archive discovered on disk, derived entirely from its
/// filename — `backup_YYYY-MM-DD_HH-MM-SS.zip` — never from filesystem
/// metadata, so replication touching the file's own mtime can't affect
/// how the engine orders or prunes snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// State reported by the sync daemon for the managed folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderStatus {
    pub state: String,
    #[serde(rename = "globalBytes")]
    pub global_bytes: u64,
    #[serde(rename = "localBytes")]
    pub local_bytes: u64,
    #[serde(rename = "needBytes")]
    pub need_bytes: u64,
    #[serde(rename = "needFiles")]
    pub need_files: u64,
    pub errors: u64,
    #[serde(rename = "pullErrors")]
    pub pull_errors: u64,
}

const SYNCING_STATES: &[&str] = &["syncing", "sync-preparing", "sync-waiting"];

impl FolderStatus {
    pub fn is_synced(&self) -> bool {
        self.state == "idle" && self.need_bytes == 0 && self.need_files == 0
    }

    pub fn is_syncing(&self) -> bool {
        SYNCING_STATES.contains(&self.state.as_str())
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0 || self.pull_errors > 0
    }
}

/// One issue found while scanning a region file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionIssueKind {
    ZeroByte,
    Truncated,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionIssue {
    pub path: PathBuf,
    pub kind: RegionIssueKind,
    pub details: String,
}

/// Result of scanning all region files under a world folder.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub checked_files: usize,
    pub issues: Vec<RegionIssue>,
    /// Set when the scan itself couldn't run — the world folder is
    /// missing or has no region folders at all — as opposed to running
    /// and finding per-file issues. A report with an error is never
    /// healthy, even if `issues` happens to be empty.
    pub error: Option<String>,
}

impl IntegrityReport {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn is_healthy(&self) -> bool {
        !self.has_issues() && self.error.is_none()
    }

    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!("integrity scan could not run: {error}");
        }
        if self.is_healthy() {
            format!("{} region files checked, no issues found", self.checked_files)
        } else {
            format!(
                "{} region files checked, {} issue(s) found",
                self.checked_files,
                self.issues.len()
            )
        }
    }
}

/// How many snapshots to retain after pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub keep_minimum: usize,
    pub keep_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { keep_minimum: 5, keep_days: 30 }
    }
}
