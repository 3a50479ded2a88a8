// SPDX-License-Identifier: MIT

//! holdfast-daemon: the lock manager, child supervisor, interactive
//! shell adapter, and the startup/shutdown orchestrator that composes
//! them with the sync client and snapshot engine from the other
//! `holdfast` crates.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod lock;
pub mod logging;
pub mod shell;
pub mod supervisor;

pub use lifecycle::{run_shutdown, run_startup, AutoDecline, LifecycleError, OperatorPrompt, Orchestrator, ShutdownReport};
pub use lock::{LockError, LockManager};
pub use logging::LoggingError;
pub use shell::{parse_command, Shell, ShellCommand, ShellHost};
pub use supervisor::{ChildSupervisor, SupervisorConfig, SupervisorError};
