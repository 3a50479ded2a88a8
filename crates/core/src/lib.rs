// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! holdfast-core: clock, host identity, configuration, and the shared
//! data model used by every other `holdfast` crate.

pub mod clock;
pub mod config;
pub mod model;

pub use clock::{age_seconds, backup_timestamp, format_iso, host_id, parse_iso, Clock, FakeClock, SystemClock};
pub use config::{load_config, BackupConfig, Config, ConfigError, LoggingConfig, SafetyConfig, ServerConfig, SyncConfig};
pub use model::{
    FolderStatus, IntegrityReport, LockRecord, LockStatus, RegionIssue, RegionIssueKind, RetentionPolicy,
    SnapshotRecord,
};
