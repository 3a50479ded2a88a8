// SPDX-License-Identifier: MIT

//! S0-S7: preflight, sync consultation, lock-status branch, pre-start
//! snapshot, race-window acquisition, pause, spawn, heartbeat.
//!
//! The order is load-bearing (see the module-level docs on shutdown
//! for the mirrored reasoning): the lock is written *while sync is
//! still running* so it propagates, and sync is only paused after the
//! race window confirms this host won.

use super::{LifecycleError, OperatorPrompt, Orchestrator};
use crate::lock::LockError;
use holdfast_core::{Clock, LockStatus};
use std::time::Duration;

pub fn run_startup<C: Clock + 'static>(orch: &Orchestrator<C>, prompt: &dyn OperatorPrompt) -> Result<(), LifecycleError> {
    // S0 PRE
    orch.supervisor.check_jar()?;
    orch.supervisor.check_java()?;
    orch.config
        .ensure_directories()
        .map_err(|e| LifecycleError::Preflight(format!("could not create configured directories: {e}")))?;

    // S1 SYNC
    if orch.sync.enabled() {
        match orch.sync.get_folder_status() {
            Ok(status) if status.is_syncing() => {
                let timeout = Duration::from_secs(orch.config.safety.sync_wait_timeout_secs);
                let finished = orch.sync.wait_for_sync(timeout, Duration::from_secs(2));
                if !finished && !prompt.confirm("sync daemon did not finish syncing before the timeout. Proceed anyway?") {
                    return Err(LifecycleError::Declined("sync wait timed out".to_string()));
                }
            }
            Ok(_) => {}
            Err(e) => {
                if !prompt.confirm(&format!("sync daemon reported an issue ({e}). Proceed anyway?")) {
                    return Err(LifecycleError::Declined(format!("sync daemon issue: {e}")));
                }
            }
        }
    }

    // S2 LOCK
    let (status, record) =
        orch.lock.check_lock_status(orch.config.safety.stale_threshold_secs as f64).map_err(LockError::from)?;
    match status {
        LockStatus::Free => {}
        LockStatus::OtherActive => {
            let holder = record.map(|r| r.hostname).unwrap_or_else(|| "unknown".to_string());
            return Err(LifecycleError::LockContentionActive(holder));
        }
        LockStatus::Owned | LockStatus::OtherStale => {
            let holder = record.map(|r| r.hostname).unwrap_or_else(|| "unknown".to_string());
            let question = if status == LockStatus::Owned {
                format!("this host ('{holder}') already holds the lock; this looks like a crash recovery. Recover and continue?")
            } else {
                format!("the lock is held by '{holder}' but its heartbeat is stale. Take over?")
            };
            if !prompt.confirm(&question) {
                return Err(LifecycleError::Declined(question));
            }
            let report = holdfast_storage::check_world_integrity(&orch.config.world_folder());
            tracing::info!(summary = %report.summary(), "integrity check before recovery");
            orch.lock.delete_lock().map_err(LockError::from)?;
        }
    }

    // S3 PREBK
    match orch.snapshots.world_changed_since_backup() {
        Ok(true) => match orch.snapshots.create(orch.clock.utc_now(), |n| tracing::debug!(files = n, "snapshot progress")) {
            Ok(snapshot) => tracing::info!(path = %snapshot.path.display(), "pre-start snapshot created"),
            Err(e) => {
                if !prompt.confirm(&format!("pre-start snapshot failed ({e}). Proceed without a fresh snapshot?")) {
                    return Err(LifecycleError::Declined(format!("snapshot failure: {e}")));
                }
            }
        },
        Ok(false) => {}
        Err(e) => {
            if !prompt.confirm(&format!("could not tell whether the world changed since the last backup ({e}). Proceed?")) {
                return Err(LifecycleError::Declined(format!("backup-check failure: {e}")));
            }
        }
    }

    // S4 ACQ. pid=0 is a placeholder: there is no child yet, and the
    // lock's pid field is informational only, never trusted across
    // hosts. S6 rewrites it with the real child pid once spawned.
    let race_wait = Duration::from_secs(orch.config.safety.race_wait_secs);
    let won = orch.lock.acquire(0, race_wait)?;
    if !won {
        return Err(LifecycleError::RaceLost);
    }

    // S5 PAUSE. If this fails, the lock we just wrote must come back
    // down: a paused-less foreign host must not see a lock it can
    // never actually enforce sync quiescence against.
    if let Err(e) = orch.sync.pause_folder() {
        let _ = orch.lock.delete_lock();
        return Err(LifecycleError::Sync(e));
    }

    // S6 SPAWN
    let pid = match orch.supervisor.start() {
        Ok(pid) => pid,
        Err(e) => {
            let _ = orch.sync.resume_folder();
            let _ = orch.lock.delete_lock();
            return Err(LifecycleError::Supervisor(e));
        }
    };
    if let Err(e) = orch.lock.update_pid(pid) {
        tracing::warn!(error = %e, "failed to record child pid in lock file");
    }

    // S7 HB
    orch.lock.start_heartbeat(Duration::from_secs(orch.config.safety.heartbeat_interval_secs));

    Ok(())
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
