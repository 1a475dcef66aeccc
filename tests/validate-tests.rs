//! End-to-end validator coverage over `LocalStorage`: multi-object storage roots, tampered
//! content, and structurally broken objects, all built the same way a real caller would -- by
//! committing through `CommitEngine` rather than hand-writing inventory JSON.

mod common;

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use common::commit_files;
use ocflcore::ocfl::fs::LocalStorage;
use ocflcore::ocfl::validate::ErrorCode;
use ocflcore::ocfl::{CommitEngine, Validator};

#[test]
fn freshly_committed_object_validates_clean() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a")]);
    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a"), ("b.txt", "b")]);

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_object("obj1").unwrap();

    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
}

#[test]
fn tampering_with_committed_content_is_caught() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a")]);

    fs::write(temp.path().join("obj1/v1/content/a.txt"), "tampered").unwrap();

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_object("obj1").unwrap();

    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.code == Some(ErrorCode::E092)));
}

#[test]
fn corrupt_sidecar_digest_is_caught() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a")]);

    fs::write(
        temp.path().join("obj1/inventory.json.sha512"),
        "0000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000  inventory.json\n",
    )
    .unwrap();

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_object("obj1").unwrap();

    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.code == Some(ErrorCode::E060)));
}

#[test]
fn missing_version_content_is_caught() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a")]);

    fs::remove_file(temp.path().join("obj1/v1/content/a.txt")).unwrap();

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_object("obj1").unwrap();

    assert!(!result.is_valid());
    assert!(result
        .errors
        .iter()
        .any(|e| e.code == Some(ErrorCode::E092) || e.code == Some(ErrorCode::E093)));
}

#[test]
fn storage_root_validates_every_object_it_finds() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp.path()));
    let engine = CommitEngine::new(Arc::clone(&storage));

    commit_files(&engine, "obj1", "urn:example:obj1", &[("a.txt", "a")]);
    commit_files(&engine, "obj2", "urn:example:obj2", &[("b.txt", "b")]);
    fs::remove_file(temp.path().join("obj2/v1/content/b.txt")).unwrap();

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_storage_root(".").unwrap();

    assert_eq!(2, result.objects.len());
    let (_, obj2_result) = result.objects.iter().find(|(root, _)| root == "obj2").unwrap();
    assert!(!obj2_result.is_valid());
    let (_, obj1_result) = result.objects.iter().find(|(root, _)| root == "obj1").unwrap();
    assert!(obj1_result.is_valid());
}

#[test]
fn missing_namaste_declaration_is_fatal() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("obj1")).unwrap();
    fs::write(temp.path().join("obj1/inventory.json"), "{}").unwrap();

    let validator = Validator::new(LocalStorage::new(temp.path()));
    let result = validator.validate_object("obj1").unwrap();

    assert!(!result.is_valid());
    assert_eq!(Some(ErrorCode::E003), result.errors[0].code);
}
