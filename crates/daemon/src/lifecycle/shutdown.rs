// SPDX-License-Identifier: MIT

//! T0-T6: stop the child, stop the heartbeat, snapshot, delete the
//! lock, prune, resume sync, release pipes.
//!
//! Every step catches and logs its own failure and the sequence always
//! runs to completion: shutdown must never abort partway, because each
//! later step undoes something load-bearing the earlier ones left
//! behind (a paused sync daemon, a held lock, a running heartbeat).

use super::Orchestrator;
use holdfast_core::Clock;
use std::time::Duration;

/// What happened during shutdown, for the CLI to turn into an exit code.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub child_forced: bool,
    pub errors: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        !self.child_forced && self.errors.is_empty()
    }
}

pub fn run_shutdown<C: Clock + 'static>(orch: &Orchestrator<C>) -> ShutdownReport {
    let mut report = ShutdownReport::default();

    // T0 stop child
    if orch.supervisor.is_running() {
        let clean = orch.supervisor.stop(Duration::from_secs(60));
        if !clean {
            report.child_forced = true;
            tracing::warn!("child did not stop gracefully; forced");
        }
    }

    // T1 stop heartbeat
    orch.lock.stop_heartbeat(Duration::from_secs(orch.config.safety.heartbeat_interval_secs));

    // T2 post-stop snapshot
    match orch.snapshots.create(orch.clock.utc_now(), |n| tracing::debug!(files = n, "snapshot progress")) {
        Ok(snapshot) => tracing::info!(path = %snapshot.path.display(), "post-stop snapshot created"),
        Err(e) => {
            tracing::error!(error = %e, "post-stop snapshot failed");
            report.errors.push(format!("snapshot: {e}"));
        }
    }

    // T3 delete lock
    if let Err(e) = orch.lock.delete_lock() {
        tracing::error!(error = %e, "failed to delete lock file");
        report.errors.push(format!("lock delete: {e}"));
    }

    // T4 prune
    if orch.config.backup.auto_prune {
        let policy = orch.config.backup.retention;
        match orch.snapshots.prune(orch.clock.utc_now(), policy.keep_minimum, policy.keep_days) {
            Ok(deleted) => {
                if !deleted.is_empty() {
                    tracing::info!(count = deleted.len(), "pruned old snapshots");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "snapshot pruning failed");
                report.errors.push(format!("prune: {e}"));
            }
        }
    }

    // T5 resume sync
    if let Err(e) = orch.sync.resume_folder() {
        tracing::error!(error = %e, "failed to resume sync daemon");
        report.errors.push(format!("sync resume: {e}"));
    }

    // T6 release pipes
    orch.supervisor.cleanup();

    report
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
