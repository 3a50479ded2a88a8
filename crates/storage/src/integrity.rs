// SPDX-License-Identifier: MIT

//! Integrity scanner for the fixed-sector region file format used by
//! the child process's world storage. This is a cheap liveness check
//! run after a suspected crash, not a chunk-level validator: it never
//! parses headers or checksums, only file size against the sector grid.

use holdfast_core::{IntegrityReport, RegionIssue, RegionIssueKind};
use std::path::{Path, PathBuf};

const SECTOR_SIZE: u64 = 4096;

fn check_region_file(path: &Path) -> Option<RegionIssue> {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => {
            return Some(RegionIssue {
                path: path.to_path_buf(),
                kind: RegionIssueKind::Unreadable,
                details: "failed to stat file".to_string(),
            })
        }
    };
    if size == 0 {
        return Some(RegionIssue {
            path: path.to_path_buf(),
            kind: RegionIssueKind::ZeroByte,
            details: "file is empty".to_string(),
        });
    }
    if size < SECTOR_SIZE * 2 {
        return Some(RegionIssue {
            path: path.to_path_buf(),
            kind: RegionIssueKind::Truncated,
            details: format!("{size} bytes is smaller than two sectors"),
        });
    }
    if size % SECTOR_SIZE != 0 {
        return Some(RegionIssue {
            path: path.to_path_buf(),
            kind: RegionIssueKind::Truncated,
            details: format!("{size} bytes is not a multiple of {SECTOR_SIZE}"),
        });
    }
    None
}

/// Finds every region folder under a world folder: the overworld's
/// `region/`, the nether's `DIM-1/region/`, the end's `DIM1/region/`,
/// and any modded dimension's `DIM*/region/`.
pub fn find_region_folders(world_folder: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for fixed in ["region", "DIM-1/region", "DIM1/region"] {
        let candidate = world_folder.join(fixed);
        if candidate.is_dir() {
            found.push(candidate);
        }
    }
    let pattern = world_folder.join("DIM*/region");
    if let Some(pattern_str) = pattern.to_str() {
        if let Ok(paths) = glob::glob(pattern_str) {
            for path in paths.flatten() {
                if path.is_dir() && !found.contains(&path) {
                    found.push(path);
                }
            }
        }
    }
    found
}

/// Scans every `.mca` region file under every region folder discovered
/// beneath `world_folder`. A missing world folder or a world with no
/// region folders at all is a scan error, not a clean bill of health.
pub fn check_world_integrity(world_folder: &Path) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    if !world_folder.is_dir() {
        report.error = Some(format!("world folder does not exist: {}", world_folder.display()));
        return report;
    }

    let folders = find_region_folders(world_folder);
    if folders.is_empty() {
        report.error = Some(format!("no region folders found under {}", world_folder.display()));
        return report;
    }

    for folder in folders {
        let entries = match std::fs::read_dir(&folder) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "skipping unreadable region folder");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mca") {
                continue;
            }
            report.checked_files += 1;
            if let Some(issue) = check_region_file(&path) {
                report.issues.push(issue);
            }
        }
    }
    report
}

/// Region-folder count, region-file count, and total byte size, used
/// by the status display independent of whether any issues exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub region_folders: usize,
    pub region_files: usize,
    pub total_bytes: u64,
}

pub fn world_stats(world_folder: &Path) -> WorldStats {
    let folders = find_region_folders(world_folder);
    let mut stats = WorldStats { region_folders: folders.len(), ..Default::default() };
    for folder in folders {
        let Ok(entries) = std::fs::read_dir(&folder) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mca") {
                continue;
            }
            stats.region_files += 1;
            stats.total_bytes += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        }
    }
    stats
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
