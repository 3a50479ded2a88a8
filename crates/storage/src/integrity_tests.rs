use super::*;
use tempfile::TempDir;

fn write_sized(path: &Path, size: usize) {
    std::fs::write(path, vec![0u8; size]).expect("write fixture region file");
}

#[test]
fn find_region_folders_discovers_overworld_nether_end_and_modded() {
    let tmp = TempDir::new().expect("tempdir");
    let world = tmp.path();
    std::fs::create_dir_all(world.join("region")).expect("mkdir");
    std::fs::create_dir_all(world.join("DIM-1/region")).expect("mkdir");
    std::fs::create_dir_all(world.join("DIM1/region")).expect("mkdir");
    std::fs::create_dir_all(world.join("DIM42/region")).expect("mkdir");

    let folders = find_region_folders(world);
    assert_eq!(folders.len(), 4);
}

#[test]
fn check_world_integrity_flags_zero_byte_and_truncated() {
    let tmp = TempDir::new().expect("tempdir");
    let region = tmp.path().join("region");
    std::fs::create_dir_all(&region).expect("mkdir");

    write_sized(&region.join("ok.mca"), 8192 * 2);
    write_sized(&region.join("zero.mca"), 0);
    write_sized(&region.join("small.mca"), 100);
    write_sized(&region.join("unaligned.mca"), 8192 + 10);

    let report = check_world_integrity(tmp.path());
    assert_eq!(report.checked_files, 4);
    assert_eq!(report.issues.len(), 3);
    assert!(!report.is_healthy());
}

#[test]
fn check_world_integrity_is_healthy_for_well_formed_files() {
    let tmp = TempDir::new().expect("tempdir");
    let region = tmp.path().join("region");
    std::fs::create_dir_all(&region).expect("mkdir");
    write_sized(&region.join("a.mca"), 4096 * 4);

    let report = check_world_integrity(tmp.path());
    assert!(report.is_healthy());
    assert_eq!(report.checked_files, 1);
}

#[test]
fn check_world_integrity_errors_on_missing_world_folder() {
    let tmp = TempDir::new().expect("tempdir");
    let missing = tmp.path().join("nope");

    let report = check_world_integrity(&missing);
    assert!(!report.is_healthy());
    assert!(report.error.is_some());
    assert_eq!(report.checked_files, 0);
}

#[test]
fn check_world_integrity_errors_when_no_region_folders_found() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(tmp.path().join("other_stuff")).expect("mkdir");

    let report = check_world_integrity(tmp.path());
    assert!(!report.is_healthy());
    assert!(report.error.is_some());
}

#[test]
fn world_stats_counts_files_and_bytes() {
    let tmp = TempDir::new().expect("tempdir");
    let region = tmp.path().join("region");
    std::fs::create_dir_all(&region).expect("mkdir");
    write_sized(&region.join("a.mca"), 4096);
    write_sized(&region.join("b.mca"), 4096 * 2);

    let stats = world_stats(tmp.path());
    assert_eq!(stats.region_folders, 1);
    assert_eq!(stats.region_files, 2);
    assert_eq!(stats.total_bytes, 4096 * 3);
}
