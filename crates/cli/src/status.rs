// SPDX-License-Identifier: MIT

//! `--status`: a read-only report of lock, sync, and snapshot state.
//! Never writes the lock file, never pauses sync, never spawns the
//! child — every call here is a pure observation.

use crate::color;
use holdfast_core::{Config, LockStatus, SystemClock};
use holdfast_daemon::lock::LockManager;
use holdfast_storage::SnapshotEngine;
use holdfast_sync::SyncClient;

pub fn print_status(config: &Config, hostname: &str, api_key: &str) -> anyhow::Result<bool> {
    println!("{}", color::header(&format!("holdfast status (host: {hostname})")));

    let lock = LockManager::new(config.lock_file(), hostname.to_string(), SystemClock);
    match lock.check_lock_status(config.safety.stale_threshold_secs as f64) {
        Ok((LockStatus::Free, _)) => println!("  lock: {}", color::context("free")),
        Ok((status, record)) => {
            let holder = record.map(|r| r.hostname).unwrap_or_else(|| "unknown".to_string());
            let label = match status {
                LockStatus::Owned => "owned by this host",
                LockStatus::OtherActive => "held by another host (active)",
                LockStatus::OtherStale => "held by another host (stale)",
                LockStatus::Free => "free",
            };
            println!("  lock: {} ({holder})", color::context(label));
        }
        Err(e) => println!("  lock: {} ({e})", color::header("error reading lock file")),
    }

    let sync = SyncClient::new(config.sync.url.clone(), api_key.to_string(), config.sync.folder_id.clone());
    if sync.enabled() {
        match sync.get_folder_status() {
            Ok(status) => println!(
                "  sync: {} (need {} files, {} bytes, errors {})",
                color::context(&status.state),
                status.need_files,
                status.need_bytes,
                status.errors + status.pull_errors
            ),
            Err(e) => println!("  sync: {} ({e})", color::header("unavailable")),
        }
    } else {
        println!("  sync: {}", color::muted("disabled (no API key configured)"));
    }

    let snapshots = SnapshotEngine::new(config.world_folder(), config.backup.folder.clone());
    match snapshots.latest() {
        Ok(Some(snap)) => println!("  latest snapshot: {} ({} bytes)", snap.timestamp, snap.size_bytes),
        Ok(None) => println!("  latest snapshot: {}", color::muted("none")),
        Err(e) => println!("  latest snapshot: {} ({e})", color::header("error listing snapshots")),
    }

    let world_stats = holdfast_storage::world_stats(&config.world_folder());
    println!(
        "  world: {} region folder(s), {} region file(s), {} bytes",
        world_stats.region_folders, world_stats.region_files, world_stats.total_bytes
    );

    Ok(true)
}
