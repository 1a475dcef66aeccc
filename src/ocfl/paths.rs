use crate::ocfl::consts::*;
use crate::ocfl::inventory::Inventory;
use crate::ocfl::{DigestAlgorithm, SpecVersion, VersionNum};

/// Returns the path to `inventory.json` within the specified directory
pub fn inventory_path(dir: &str) -> String {
    join(dir, INVENTORY_FILE)
}

/// Returns the path to `inventory.json.ALGO` within the specified directory
pub fn sidecar_path(dir: &str, algorithm: DigestAlgorithm) -> String {
    join(dir, &sidecar_name(algorithm))
}

/// Returns the name of an inventory sidecar for the specified algorithm
pub fn sidecar_name(algorithm: DigestAlgorithm) -> String {
    format!("{}.{}", INVENTORY_FILE, algorithm)
}

/// Returns the path to an object's Namaste declaration file
pub fn object_namaste_path(dir: &str, version: SpecVersion) -> String {
    join(dir, version.object_namaste_filename())
}

/// Returns the path to the OCFL root's Namaste declaration file
pub fn root_namaste_path(storage_root: &str, version: SpecVersion) -> String {
    join(storage_root, version.root_namaste_filename())
}

/// Returns the path to the version directory within the object root
pub fn version_path(object_root: &str, version_num: VersionNum) -> String {
    join(object_root, &version_num.to_string())
}

/// Returns the path to a version's content directory
pub fn content_path(object_root: &str, version_num: VersionNum, inventory: &Inventory) -> String {
    join(
        &version_path(object_root, version_num),
        &inventory.content_directory,
    )
}

/// Returns the path to the head version's content directory
pub fn head_content_path(object_root: &str, inventory: &Inventory) -> String {
    content_path(object_root, inventory.head, inventory)
}

/// Returns the path to the `extensions` directory within the specified directory
pub fn extensions_path(dir: &str) -> String {
    join(dir, EXTENSIONS_DIR)
}

/// Returns the path to the `ocfl_layout.json`
pub fn ocfl_layout_path(storage_root: &str) -> String {
    join(storage_root, OCFL_LAYOUT_FILE)
}

/// Joins two string path parts, inserting a `/` if needed. `part1` of `.` or `""` denotes the
/// storage root, and is dropped rather than prepended -- `join(".", "inventory.json")` must
/// yield `inventory.json`, not `./inventory.json`, since a leading `.` segment is itself rejected
/// by `validate_relative_path`.
pub fn join(part1: &str, part2: &str) -> String {
    if part1.is_empty() || part1 == "." {
        return part2.to_string();
    }

    let mut joined = match part1.ends_with('/') {
        true => part1[..part1.len() - 1].to_string(),
        false => part1.to_string(),
    };

    if !part2.is_empty() {
        if (!joined.is_empty() || part1 == "/") && !part2.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(part2);
    }

    joined
}
