// SPDX-License-Identifier: MIT

//! Snapshot engine: zip archival of a working directory, change
//! detection by filename-embedded timestamp rather than file mtime,
//! safety-rename rollback on restore, and retention pruning.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use holdfast_core::SnapshotRecord;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("no snapshots found in {0}")]
    NoSnapshots(PathBuf),
    #[error("restore target {0} already has a pending .old rollback directory")]
    RollbackConflict(PathBuf),
}

const NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Filenames embed local time, seconds precision, so an operator
/// glancing at a backup directory listing sees wall-clock times that
/// match their own. The parsed-back instant is what every other
/// comparison (retention cutoffs, `world_changed_since_backup`) uses,
/// never the archive file's own mtime.
fn parse_snapshot_name(path: &Path) -> Option<DateTime<Utc>> {
    let stem = path.file_stem()?.to_str()?;
    let ts_part = stem.strip_prefix("backup_")?;
    let naive = NaiveDateTime::parse_from_str(ts_part, NAME_FORMAT).ok()?;
    let as_utc = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc());
    Some(as_utc)
}

/// Lists, creates, restores, and prunes the zip snapshots of one
/// working directory into one backup directory.
pub struct SnapshotEngine {
    working_dir: PathBuf,
    backup_dir: PathBuf,
}

impl SnapshotEngine {
    pub fn new(working_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self { working_dir: working_dir.into(), backup_dir: backup_dir.into() }
    }

    /// Snapshots sorted newest first. Filenames that don't match the
    /// exact `backup_YYYY-MM-DD_HH-MM-SS.zip` pattern are silently
    /// skipped, never deleted.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("zip") {
                continue;
            }
            let Some(timestamp) = parse_snapshot_name(&path) else { continue };
            let size_bytes = entry.metadata()?.len();
            records.push(SnapshotRecord { timestamp, path, size_bytes });
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub fn latest(&self) -> Result<Option<SnapshotRecord>, SnapshotError> {
        Ok(self.list()?.into_iter().next())
    }

    /// True iff there is no prior snapshot, or any regular file under
    /// the working directory has an mtime newer than the latest
    /// snapshot's *name-derived* timestamp. Unreadable files are
    /// skipped rather than counted as a change.
    pub fn world_changed_since_backup(&self) -> Result<bool, SnapshotError> {
        let Some(latest) = self.latest()? else { return Ok(true) };
        Ok(walk_files(&self.working_dir)?.into_iter().any(|path| match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified) > latest.timestamp,
            Err(_) => false,
        }))
    }

    /// Creates a deflate-compressed zip archive of every regular file
    /// under the working directory, storing entries relative to the
    /// working directory's *parent* so restoring recreates its
    /// basename as the first path component. Progress is reported
    /// every 100 files; a partial archive is removed on failure.
    pub fn create(&self, now: DateTime<Utc>, mut progress: impl FnMut(usize)) -> Result<SnapshotRecord, SnapshotError> {
        fs::create_dir_all(&self.backup_dir)?;
        let name = format!("backup_{}.zip", holdfast_core::backup_timestamp(now));
        let archive_path = self.backup_dir.join(&name);

        let result = self.write_archive(&archive_path, &mut progress);
        if let Err(err) = result {
            let _ = fs::remove_file(&archive_path);
            return Err(err);
        }

        let size_bytes = fs::metadata(&archive_path)?.len();
        Ok(SnapshotRecord { timestamp: now, path: archive_path, size_bytes })
    }

    fn write_archive(&self, archive_path: &Path, progress: &mut impl FnMut(usize)) -> Result<(), SnapshotError> {
        let wd_name = self.working_dir.file_name().ok_or_else(|| {
            SnapshotError::Io(io::Error::new(io::ErrorKind::InvalidInput, "working directory has no basename"))
        })?;

        let file = File::create(archive_path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (count, path) in walk_files(&self.working_dir)?.into_iter().enumerate() {
            let relative = Path::new(wd_name).join(path.strip_prefix(&self.working_dir).unwrap_or(&path));
            let name = relative.to_string_lossy().replace('\\', "/");
            zip.start_file(name, options)?;
            let mut f = File::open(&path)?;
            io::copy(&mut f, &mut zip)?;
            if (count + 1) % 100 == 0 {
                progress(count + 1);
            }
        }
        zip.finish()?;
        Ok(())
    }

    /// Extracts `snapshot` into `target`'s parent directory. If
    /// `target` exists it is first renamed to `<target>.old` (removing
    /// any stale `.old` from a previous failed restore); on success the
    /// rollback directory is removed, on failure it is moved back.
    pub fn restore(&self, snapshot: &SnapshotRecord, target: &Path) -> Result<(), SnapshotError> {
        let rollback = target.with_extension("old");
        let had_target = target.exists();
        if had_target {
            if rollback.exists() {
                fs::remove_dir_all(&rollback)?;
            }
            fs::rename(target, &rollback)?;
        }

        match self.extract(snapshot, target) {
            Ok(()) => {
                if had_target {
                    let _ = fs::remove_dir_all(&rollback);
                }
                Ok(())
            }
            Err(err) => {
                if target.exists() {
                    let _ = fs::remove_dir_all(target);
                }
                if had_target {
                    fs::rename(&rollback, target)?;
                }
                Err(err)
            }
        }
    }

    fn extract(&self, snapshot: &SnapshotRecord, target: &Path) -> Result<(), SnapshotError> {
        let parent = target.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;
        let file = File::open(&snapshot.path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(enclosed) = entry.enclosed_name() else { continue };
            let out_path = parent.join(enclosed);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(p) = out_path.parent() {
                fs::create_dir_all(p)?;
            }
            let mut out = File::create(&out_path)?;
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            out.write_all(&buf)?;
        }
        Ok(())
    }

    /// Deletes snapshots older than `keep_days` while always retaining
    /// at least `keep_minimum` of the newest. The delete set is
    /// computed directly from this invariant rather than by an
    /// iterate-and-skip walk, which is equivalent and easier to reason
    /// about: sort newest first, keep the first `keep_minimum`
    /// unconditionally, then drop anything past `keep_days` among the
    /// rest.
    pub fn prune(&self, now: DateTime<Utc>, keep_minimum: usize, keep_days: u32) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        let all = self.list()?;
        let cutoff = now - chrono::Duration::days(keep_days as i64);
        let mut deleted = Vec::new();
        for (idx, record) in all.into_iter().enumerate() {
            if idx < keep_minimum {
                continue;
            }
            if record.timestamp < cutoff {
                fs::remove_file(&record.path)?;
                deleted.push(record);
            }
        }
        Ok(deleted)
    }
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
