// SPDX-License-Identifier: MIT

//! Small environment-variable overrides for knobs that are a property
//! of the running environment rather than the managed server, so they
//! don't belong in the TOML config file.

use std::time::Duration;

/// Override for how long the interactive shell's output drainer waits
/// to join on shutdown, default 2s.
pub fn shell_drain_timeout() -> Duration {
    std::env::var("HOLDFAST_SHELL_DRAIN_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// Poll interval used while waiting for child stdout lines, default
/// 100ms, matching the readiness-poll cadence of the process supervisor.
pub fn read_line_poll_interval() -> Duration {
    std::env::var("HOLDFAST_READ_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(100))
}
