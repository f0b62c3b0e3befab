use std::fs;

use snapshot_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn write_creates_intermediate_directories() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let path = writer
        .write("snapshots/nested/snapshot__a.html", "<p>a</p>")
        .unwrap();
    assert_eq!(path, temp.path().join("snapshots/nested/snapshot__a.html"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "<p>a</p>");
}

#[test]
fn write_overwrites_existing_snapshot() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("snapshot__a.html", "hello").unwrap();
    let second = writer.write("snapshot__a.html", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_when_directory_is_a_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let result = writer.write("not_a_dir/snapshot__a.html", "data");
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}
