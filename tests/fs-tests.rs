//! End-to-end commit/read coverage over `LocalStorage`, exercising the full path from a commit
//! request down to real files on disk and back through `Object`.

mod common;

use std::convert::TryFrom;
use std::sync::Arc;

use tempfile::TempDir;

use common::{commit_files, digest_of};
use ocflcore::ocfl::fs::LocalStorage;
use ocflcore::ocfl::{CommitEngine, Diff, LogicalPath, Object, VersionNum, VersionRef};

#[test]
fn commit_then_reopen_round_trips_through_real_files() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, ".", "urn:example:obj1", &[("a.txt", "a")]);

    let opened = Object::open(LocalStorage::new(temp.path()), ".").unwrap();
    assert_eq!("urn:example:obj1", opened.id());
    assert_eq!(VersionNum::new(1), opened.head());

    let state = opened.state(VersionRef::Head).unwrap();
    let a_path = LogicalPath::try_from("a.txt").unwrap();
    assert_eq!(digest_of("a"), *state[&a_path].digest);

    assert!(temp.path().join("inventory.json").is_file());
    assert!(temp.path().join("v1").join("inventory.json").is_file());
    assert!(temp.path().join("v1").join("content").join("a.txt").is_file());
}

#[test]
fn second_commit_reuses_untouched_content_on_disk() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, ".", "urn:example:obj1", &[("a.txt", "a")]);
    let inventory = commit_files(&engine, ".", "urn:example:obj1", &[("a.txt", "a"), ("b.txt", "b")]);

    assert_eq!(VersionNum::new(2), inventory.head);
    assert!(!temp.path().join("v2").join("content").join("a.txt").exists());
    assert!(temp.path().join("v2").join("content").join("b.txt").is_file());

    let opened = Object::open(LocalStorage::new(temp.path()), ".").unwrap();
    let diffs = opened
        .diff(Some(VersionNum::new(1).into()), VersionNum::new(2).into())
        .unwrap();
    assert_eq!(1, diffs.len());
    assert!(matches!(&diffs[0], Diff::Added(p) if p.as_str() == "b.txt"));
}

#[test]
fn content_bytes_are_readable_back_through_object() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, ".", "urn:example:obj1", &[("a.txt", "hello world")]);

    let opened = Object::open(LocalStorage::new(temp.path()), ".").unwrap();
    let digest = digest_of("hello world");

    let mut sink = Vec::new();
    opened.content(&digest, &mut sink).unwrap();
    assert_eq!(b"hello world".to_vec(), sink);
}
