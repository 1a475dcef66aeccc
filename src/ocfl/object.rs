//! Read-only access to a single committed object: its version history, the logical state of any
//! version, and the bytes backing any digest in its manifest (§4.6 of `SPEC_FULL.md`).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::error::{not_found, OcflError, Result};
use crate::ocfl::fs::Storage;
use crate::ocfl::inventory::{Inventory, Version};
use crate::ocfl::{paths, ContentPath, InventoryPath, LogicalPath, VersionNum, VersionRef};

/// A file present in a version's logical state, resolved to the content it's backed by.
#[derive(Debug, Clone)]
pub struct FileDetails {
    pub digest: Rc<HexDigest>,
    pub digest_algorithm: DigestAlgorithm,
    pub content_path: Rc<ContentPath>,
    pub storage_path: String,
    pub last_updated: Rc<VersionDetails>,
}

/// Metadata describing one version of an object, without its file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDetails {
    pub version_num: VersionNum,
    pub created: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_address: Option<String>,
    pub message: Option<String>,
}

impl VersionDetails {
    fn from_version(version_num: VersionNum, version: &Version) -> Self {
        Self {
            version_num,
            created: version.created,
            user_name: version.user.as_ref().and_then(|u| u.name.clone()),
            user_address: version.user.as_ref().and_then(|u| u.address.clone()),
            message: version.message.clone(),
        }
    }
}

/// Identifying metadata about an object and one of its versions, without any file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectVersionDetails {
    pub id: String,
    pub object_root: String,
    pub digest_algorithm: DigestAlgorithm,
    pub version_details: VersionDetails,
}

/// A difference between a version's logical state and the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff {
    Added(Rc<LogicalPath>),
    Modified(Rc<LogicalPath>),
    Deleted(Rc<LogicalPath>),
    Renamed {
        original: Vec<Rc<LogicalPath>>,
        renamed: Vec<Rc<LogicalPath>>,
    },
}

/// Read-only access to an already-committed object rooted at a fixed storage path.
pub struct Object<S: Storage> {
    storage: Arc<S>,
    object_root: String,
    inventory: Inventory,
}

impl<S: Storage> Object<S> {
    /// Opens the object rooted at `object_root`, reading and strictly decoding its root
    /// inventory. This does not run structural validation; use `Validator` for that.
    pub fn open(storage: S, object_root: &str) -> Result<Self> {
        let storage = Arc::new(storage);
        let mut bytes = Vec::new();
        storage.read(&paths::inventory_path(object_root), &mut bytes)?;
        let inventory = Inventory::decode(&bytes)?;

        Ok(Self {
            storage,
            object_root: object_root.to_string(),
            inventory,
        })
    }

    pub fn id(&self) -> &str {
        &self.inventory.id
    }

    pub fn object_root(&self) -> &str {
        &self.object_root
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.inventory.digest_algorithm
    }

    pub fn head(&self) -> VersionNum {
        self.inventory.head
    }

    /// Metadata for every version, oldest first.
    pub fn versions(&self) -> Vec<ObjectVersionDetails> {
        self.inventory
            .head
            .lineage_to()
            .into_iter()
            .map(|num| self.version_details(num))
            .collect()
    }

    /// Metadata for a single version, without its file listing.
    pub fn version(&self, version_ref: VersionRef) -> Result<ObjectVersionDetails> {
        let version_num = version_ref.resolve(self.inventory.head);
        self.inventory.get_version(version_num)?;
        Ok(self.version_details(version_num))
    }

    fn version_details(&self, version_num: VersionNum) -> ObjectVersionDetails {
        let version = self
            .inventory
            .get_version(version_num)
            .expect("version_num was drawn from this inventory's own lineage");

        ObjectVersionDetails {
            id: self.inventory.id.clone(),
            object_root: self.object_root.clone(),
            digest_algorithm: self.inventory.digest_algorithm,
            version_details: VersionDetails::from_version(version_num, version),
        }
    }

    /// Reconstructs a version's complete logical file listing, walking backward from the target
    /// version toward v1 to find the version each surviving path's content was last written in.
    pub fn state(&self, version_ref: VersionRef) -> Result<HashMap<Rc<LogicalPath>, FileDetails>> {
        let target = version_ref.resolve(self.inventory.head);
        let target_version = self.inventory.get_version(target)?;

        let mut remaining: HashMap<Rc<LogicalPath>, Rc<HexDigest>> = target_version
            .state
            .iter()
            .map(|(path, digest)| (path.clone(), digest.clone()))
            .collect();
        let mut last_seen_in: HashMap<Rc<LogicalPath>, VersionNum> =
            remaining.keys().map(|path| (path.clone(), target)).collect();

        let mut result = HashMap::with_capacity(remaining.len());
        let mut num = target;

        loop {
            if num.number < target.number {
                let version = self.inventory.get_version(num)?;
                let mut settled = Vec::new();

                for (path, digest) in &remaining {
                    if version.state.digest_of(path) == Some(digest) {
                        last_seen_in.insert(path.clone(), num);
                    } else {
                        settled.push(path.clone());
                    }
                }

                for path in settled {
                    self.resolve_state_entry(&path, &remaining, &last_seen_in, &mut result)?;
                    remaining.remove(&path);
                    last_seen_in.remove(&path);
                }
            }

            if remaining.is_empty() || num.number == 1 {
                break;
            }
            num = num.previous()?;
        }

        let stragglers: Vec<Rc<LogicalPath>> = remaining.keys().cloned().collect();
        for path in stragglers {
            self.resolve_state_entry(&path, &remaining, &last_seen_in, &mut result)?;
        }

        Ok(result)
    }

    fn resolve_state_entry(
        &self,
        path: &Rc<LogicalPath>,
        digests: &HashMap<Rc<LogicalPath>, Rc<HexDigest>>,
        last_seen_in: &HashMap<Rc<LogicalPath>, VersionNum>,
        result: &mut HashMap<Rc<LogicalPath>, FileDetails>,
    ) -> Result<()> {
        let digest = digests
            .get(path)
            .expect("path is tracked in the digests map while being resolved");
        let last_version_num = *last_seen_in
            .get(path)
            .expect("path is tracked in last_seen_in while being resolved");
        let last_version = self.inventory.get_version(last_version_num)?;
        let details = Rc::new(VersionDetails::from_version(last_version_num, last_version));

        let content_path = self
            .inventory
            .manifest
            .paths_of(digest)
            .and_then(|paths| paths.iter().next())
            .cloned()
            .ok_or_else(|| OcflError::CorruptObject {
                object_id: self.inventory.id.clone(),
                message: format!("No content path found in the manifest for digest {}", digest),
            })?;

        let storage_path = paths::join(&self.object_root, content_path.as_str());

        result.insert(
            path.clone(),
            FileDetails {
                digest: digest.clone(),
                digest_algorithm: self.inventory.digest_algorithm,
                content_path,
                storage_path,
                last_updated: details,
            },
        );

        Ok(())
    }

    /// Computes the diff from `left` to `right`. When `left` is `None`, every path in `right` is
    /// reported as added.
    pub fn diff(&self, left: Option<VersionRef>, right: VersionRef) -> Result<Vec<Diff>> {
        let right_num = right.resolve(self.inventory.head);
        let right_version = self.inventory.get_version(right_num)?;

        let left_version = match left {
            Some(version_ref) => {
                Some(self.inventory.get_version(version_ref.resolve(self.inventory.head))?)
            }
            None => None,
        };

        Ok(diff_versions(right_version, left_version))
    }

    /// Writes the content addressed by `digest` to `sink`.
    pub fn content(&self, digest: &HexDigest, sink: &mut dyn std::io::Write) -> Result<()> {
        let content_path = self
            .inventory
            .content_path_for_digest(digest)
            .ok_or_else(|| not_found(&self.inventory.id, None))?;
        let storage_path = paths::join(&self.object_root, content_path.as_str());
        self.storage.read(&storage_path, sink)
    }

    /// Returns every fixity digest recorded for `digest`'s content, keyed by algorithm.
    pub fn fixity(&self, digest: &HexDigest) -> Result<HashMap<DigestAlgorithm, HexDigest>> {
        let content_path = self
            .inventory
            .content_path_for_digest(digest)
            .ok_or_else(|| not_found(&self.inventory.id, None))?;

        let mut result = HashMap::with_capacity(self.inventory.fixity.len());
        for (algorithm, map) in &self.inventory.fixity {
            if let Some(fixity_digest) = map.get_id(content_path) {
                result.insert(*algorithm, fixity_digest.as_ref().clone());
            }
        }

        Ok(result)
    }
}

/// Computes a diff between two versions. `right` is the newer version; `left` is the older one,
/// or `None` if `right` is being compared against nothing (every path is an add).
fn diff_versions(right: &Version, left: Option<&Version>) -> Vec<Diff> {
    let mut diffs = Vec::new();

    let left = match left {
        Some(left) => left,
        None => {
            for (path, _digest) in right.state.iter() {
                diffs.push(Diff::Added(path.clone()));
            }
            return diffs;
        }
    };

    let mut deletes: HashMap<Rc<HexDigest>, Vec<Rc<LogicalPath>>> = HashMap::new();
    let mut seen = HashSet::with_capacity(left.state.len());

    for (path, left_digest) in left.state.iter() {
        match right.state.digest_of(path) {
            None => {
                deletes
                    .entry(left_digest.clone())
                    .or_insert_with(Vec::new)
                    .push(path.clone());
            }
            Some(right_digest) => {
                seen.insert(path.clone());
                if left_digest != right_digest {
                    diffs.push(Diff::Modified(path.clone()));
                }
            }
        }
    }

    let mut renames: HashMap<Rc<HexDigest>, Diff> = HashMap::new();

    for (path, digest) in right.state.iter() {
        if seen.contains(path) {
            continue;
        }

        if let Some(original) = deletes.remove(digest) {
            renames.insert(
                digest.clone(),
                Diff::Renamed {
                    original,
                    renamed: vec![path.clone()],
                },
            );
        } else if let Some(Diff::Renamed { renamed, .. }) = renames.get_mut(digest) {
            renamed.push(path.clone());
        } else {
            diffs.push(Diff::Added(path.clone()));
        }
    }

    for (_digest, paths) in deletes {
        for path in paths {
            diffs.push(Diff::Deleted(path));
        }
    }

    for (_digest, mut rename) in renames {
        if let Diff::Renamed { original, renamed } = &mut rename {
            original.sort_unstable();
            renamed.sort_unstable();
        }
        diffs.push(rename);
    }

    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocfl::fs::MemoryStorage;
    use crate::ocfl::{DigestAlgorithm, SpecVersion};

    /// Writes a three-version object directly to `storage`: v1 adds `a.txt`, v2 adds `b.txt` and
    /// renames `a.txt` to `c.txt`, v3 modifies `b.txt`.
    fn write_three_version_object(storage: &MemoryStorage, root: &str) {
        storage
            .write(
                &paths::object_namaste_path(root, SpecVersion::Ocfl1_1),
                &mut SpecVersion::Ocfl1_1.object_namaste_content().as_bytes(),
            )
            .unwrap();

        let digest_a = DigestAlgorithm::Sha512.hash_hex(&mut "a".as_bytes()).unwrap();
        let digest_b = DigestAlgorithm::Sha512.hash_hex(&mut "b".as_bytes()).unwrap();
        let digest_b2 = DigestAlgorithm::Sha512.hash_hex(&mut "b2".as_bytes()).unwrap();

        let inventory_json = format!(
            r#"{{"id":"obj1","type":"https://ocfl.io/1.1/spec/#inventory","digestAlgorithm":"sha512","head":"v3","contentDirectory":"content","manifest":{{"{da}":["v1/content/a.txt"],"{db}":["v2/content/b.txt"],"{db2}":["v3/content/b.txt"]}},"versions":{{"v1":{{"created":"2021-01-01T00:00:00Z","state":{{"{da}":["a.txt"]}},"message":"first"}},"v2":{{"created":"2021-01-02T00:00:00Z","state":{{"{da}":["c.txt"],"{db}":["b.txt"]}},"message":"second"}},"v3":{{"created":"2021-01-03T00:00:00Z","state":{{"{da}":["c.txt"],"{db2}":["b.txt"]}},"message":"third"}}}}}}"#,
            da = digest_a,
            db = digest_b,
            db2 = digest_b2,
        );
        let bytes = inventory_json.into_bytes();
        let sidecar_digest = DigestAlgorithm::Sha512.hash_hex(&mut bytes.as_slice()).unwrap();

        storage.write(&paths::inventory_path(root), &mut bytes.as_slice()).unwrap();
        storage
            .write(
                &paths::sidecar_path(root, DigestAlgorithm::Sha512),
                &mut format!("{}  inventory.json\n", sidecar_digest).as_bytes(),
            )
            .unwrap();

        storage.write(&format!("{}/v1/content/a.txt", root), &mut "a".as_bytes()).unwrap();
        storage.write(&format!("{}/v2/content/b.txt", root), &mut "b".as_bytes()).unwrap();
        storage.write(&format!("{}/v3/content/b.txt", root), &mut "b2".as_bytes()).unwrap();
    }

    #[test]
    fn open_reads_head_metadata() {
        let storage = MemoryStorage::new();
        write_three_version_object(&storage, "obj");

        let object = Object::open(storage, "obj").unwrap();
        assert_eq!("obj1", object.id());
        assert_eq!(VersionNum::new(3), object.head());
    }

    #[test]
    fn state_resolves_last_updated_version_per_path() {
        let storage = MemoryStorage::new();
        write_three_version_object(&storage, "obj");
        let object = Object::open(storage, "obj").unwrap();

        let state = object.state(VersionRef::Head).unwrap();
        assert_eq!(2, state.len());

        let c_path: LogicalPath = "c.txt".try_into().unwrap();
        let b_path: LogicalPath = "b.txt".try_into().unwrap();

        // c.txt didn't exist under that name until the rename landed in v2, even though its
        // content is unchanged since v1.
        assert_eq!(VersionNum::new(2), state[&c_path].last_updated.version_num);
        assert_eq!(VersionNum::new(3), state[&b_path].last_updated.version_num);
    }

    #[test]
    fn diff_detects_rename_and_modification() {
        let storage = MemoryStorage::new();
        write_three_version_object(&storage, "obj");
        let object = Object::open(storage, "obj").unwrap();

        let diffs = object
            .diff(Some(VersionNum::new(1).into()), VersionNum::new(2).into())
            .unwrap();

        let a_path: LogicalPath = "a.txt".try_into().unwrap();
        let c_path: LogicalPath = "c.txt".try_into().unwrap();
        assert!(diffs.iter().any(|d| matches!(
            d,
            Diff::Renamed { original, renamed }
                if original == &vec![Rc::new(a_path.clone())] && renamed == &vec![Rc::new(c_path.clone())]
        )));
        assert!(diffs.iter().any(|d| matches!(d, Diff::Added(p) if p.as_str() == "b.txt")));
    }

    #[test]
    fn diff_against_none_adds_everything() {
        let storage = MemoryStorage::new();
        write_three_version_object(&storage, "obj");
        let object = Object::open(storage, "obj").unwrap();

        let diffs = object.diff(None, VersionNum::new(1).into()).unwrap();
        assert_eq!(1, diffs.len());
        assert!(matches!(&diffs[0], Diff::Added(p) if p.as_str() == "a.txt"));
    }
}
