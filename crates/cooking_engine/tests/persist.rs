use std::fs;

use cooking_engine::{ensure_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("nested").join("state");
    assert!(!state.exists());
    ensure_dir(&state).unwrap();
    assert!(state.is_dir());
}

#[test]
fn write_replaces_the_target_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("swh-vault-cooking-tasks.json");
    let writer = AtomicFileWriter::new(target.clone());

    writer.write("[]").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "[]");

    writer.write("[{\"swhid\":\"swh:1:dir:abc\"}]").unwrap();
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "[{\"swhid\":\"swh:1:dir:abc\"}]"
    );

    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn no_partial_file_when_the_parent_is_a_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.join("slot.json"));
    let result = writer.write("[]");
    assert!(matches!(result, Err(PersistError::StateDir(_))));
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}
