// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! holdfast-storage: snapshot archival/restore and the region-file
//! integrity scanner.

pub mod integrity;
pub mod snapshot;

pub use integrity::{check_world_integrity, find_region_folders, world_stats, WorldStats};
pub use snapshot::{SnapshotEngine, SnapshotError};
