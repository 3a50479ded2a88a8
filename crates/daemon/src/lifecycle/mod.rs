// SPDX-License-Identifier: MIT

//! The startup/shutdown state machine (S0-S7, T0-T6) that composes the
//! lock manager, snapshot engine, integrity scanner, sync client, and
//! child supervisor in the order the safety protocol requires.

pub mod shutdown;
pub mod startup;

use crate::lock::{LockError, LockManager};
use crate::supervisor::{ChildSupervisor, SupervisorError};
use holdfast_core::Clock;
use holdfast_storage::{SnapshotEngine, SnapshotError};
use holdfast_sync::{SyncClient, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub use shutdown::{run_shutdown, ShutdownReport};
pub use startup::run_startup;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another host ('{0}') is actively running the server; refusing to start")]
    LockContentionActive(String),
    #[error("operator declined to proceed past: {0}")]
    Declined(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("preflight check failed: {0}")]
    Preflight(String),
    #[error("race window lost: another host now owns the lock")]
    RaceLost,
}

/// Confirmation gate for steps the operator must explicitly authorize
/// (crash recovery, proceeding despite a sync-daemon fault). A real CLI
/// reads a terminal line; tests supply a scripted answer.
pub trait OperatorPrompt: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Always answers the same way. Useful for `--status`/non-interactive
/// contexts where any confirmation-gated path should simply fail closed.
pub struct AutoDecline;

impl OperatorPrompt for AutoDecline {
    fn confirm(&self, _question: &str) -> bool {
        false
    }
}

/// Owns every component the state machine composes. Constructed once
/// per run; outlives both the startup and shutdown sequences.
pub struct Orchestrator<C: Clock + 'static> {
    pub config: holdfast_core::Config,
    pub clock: C,
    pub lock: Arc<LockManager<C>>,
    pub supervisor: Arc<ChildSupervisor>,
    pub sync: SyncClient,
    pub snapshots: SnapshotEngine,
    shutdown_in_progress: AtomicBool,
}

impl<C: Clock + 'static> Orchestrator<C> {
    pub fn new(
        config: holdfast_core::Config,
        clock: C,
        lock: LockManager<C>,
        supervisor: ChildSupervisor,
        sync: SyncClient,
        snapshots: SnapshotEngine,
    ) -> Self {
        Self {
            config,
            clock,
            lock: Arc::new(lock),
            supervisor: Arc::new(supervisor),
            sync,
            snapshots,
            shutdown_in_progress: AtomicBool::new(false),
        }
    }

    /// Flips the shutdown guard exactly once. Returns true only for the
    /// caller that won the race, so a signal handler firing twice (or
    /// racing a normal `quit`) runs the shutdown sequence a single time.
    pub fn begin_shutdown(&self) -> bool {
        self.shutdown_in_progress.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_in_progress.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
