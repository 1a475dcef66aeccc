//! The commit engine: the write path that turns a staged set of logical files into a new,
//! durable object version (§4.7 of `SPEC_FULL.md`). Builds the next inventory from the previous
//! one, transfers any newly introduced content, and writes the inventory/sidecar pair only once
//! everything else has succeeded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::CommitConfig;
use crate::ocfl::consts::DEFAULT_CONTENT_DIR;
use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs::Storage;
use crate::ocfl::inventory::{Inventory, User, Version};
use crate::ocfl::lock::LockManager;
use crate::ocfl::pipeline::Pipeline;
use crate::ocfl::{
    paths, ContentPath, DigestMap, InventoryPath, LogicalPath, SpecVersion, VersionNum,
};

/// Supplies the bytes behind a digest introduced by a `Stage`. Implementations typically wrap
/// another `Storage` (for content staged on disk already) or an in-memory buffer.
pub trait ContentSource: Send + Sync {
    /// Opens a reader over the bytes addressed by `digest`. Called at most once per digest per
    /// commit.
    fn open(&self, digest: &HexDigest) -> Result<Box<dyn Read>>;

    /// If the bytes behind `digest` already live on `storage` at a known path, returns that path
    /// so the commit engine can ask for a server-side copy instead of routing bytes through the
    /// caller. Returning `None` (the default) always falls back to `open`.
    fn same_store_path(&self, _digest: &HexDigest) -> Option<String> {
        None
    }
}

/// Supplies extra fixity digests (beyond the inventory's primary `digestAlgorithm`) for content
/// newly introduced by a `Stage`. The default source contributes nothing.
pub trait FixitySource: Send + Sync {
    fn fixity_for(&self, digest: &HexDigest) -> HashMap<DigestAlgorithm, HexDigest>;
}

struct NoFixity;

impl FixitySource for NoFixity {
    fn fixity_for(&self, _digest: &HexDigest) -> HashMap<DigestAlgorithm, HexDigest> {
        HashMap::new()
    }
}

/// An ephemeral commit input: the new version's logical state, plus a way to read the bytes
/// behind any digest it introduces, and optionally supplementary fixity digests for that content.
pub struct Stage {
    pub digest_algorithm: DigestAlgorithm,
    pub state: DigestMap<LogicalPath>,
    pub content_source: Arc<dyn ContentSource>,
    pub fixity_source: Arc<dyn FixitySource>,
}

impl Stage {
    pub fn new(
        digest_algorithm: DigestAlgorithm,
        state: DigestMap<LogicalPath>,
        content_source: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            digest_algorithm,
            state,
            content_source,
            fixity_source: Arc::new(NoFixity),
        }
    }

    pub fn with_fixity_source(mut self, fixity_source: Arc<dyn FixitySource>) -> Self {
        self.fixity_source = fixity_source;
        self
    }
}

/// Transforms the logical paths backing a newly-introduced digest into the file names used to
/// store its content, relative to `{new_head}/{contentDirectory}/`. Defaults to identity: the
/// logical path is reused verbatim as the content-relative name.
pub type ContentPathTransform = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// The inputs to one commit. Grounded on §3's `{id?, stage, message, user, created?, newHead?,
/// allowUnchanged?, contentPathTransform?, spec?}` commit request shape.
pub struct CommitRequest {
    /// Required for a brand-new object; ignored (must match, if set) when updating one.
    pub id: Option<String>,
    pub stage: Stage,
    pub message: Option<String>,
    pub user: Option<User>,
    /// Defaults to the current time if unset.
    pub created: Option<DateTime<Utc>>,
    /// Overrides the computed next head. Must be strictly greater than the previous head (or,
    /// for a new object, must be `V(1, padding)`). Rarely needed outside of migration tooling.
    pub new_head: Option<VersionNum>,
    pub allow_unchanged: bool,
    pub content_path_transform: Option<ContentPathTransform>,
    /// If set, the new inventory's spec version. Must be `>=` the previous inventory's spec, per
    /// the "new spec must be >= previous" resolution of Open Question 1 in `SPEC_FULL.md` §9.
    pub spec: Option<SpecVersion>,
    /// Zero-padding width used for a brand-new object's version numbers. Ignored when updating an
    /// existing object, whose padding is fixed by its lineage. Default: 0 (unpadded).
    pub padding_width: u32,
    /// Upper bound on concurrent content transfers. Default: 1.
    pub concurrency: usize,
}

impl CommitRequest {
    pub fn new(stage: Stage) -> Self {
        Self {
            id: None,
            stage,
            message: None,
            user: None,
            created: None,
            new_head: None,
            allow_unchanged: false,
            content_path_transform: None,
            spec: None,
            padding_width: 0,
            concurrency: 1,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_allow_unchanged(mut self, allow: bool) -> Self {
        self.allow_unchanged = allow;
        self
    }

    /// Sets the zero-padding width used for a brand-new object's first version. Ignored when
    /// updating an existing object.
    pub fn with_padding_width(mut self, padding_width: u32) -> Self {
        self.padding_width = padding_width;
        self
    }

    /// Sets the upper bound on concurrent content transfers for this commit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// The write path for an object rooted at a fixed storage path. One `CommitEngine` may be reused
/// across many commits to different objects on the same storage.
pub struct CommitEngine<S: Storage + Send + Sync + 'static> {
    storage: Arc<S>,
    lock_manager: Option<Arc<LockManager>>,
    config: CommitConfig,
}

impl<S: Storage + Send + Sync + 'static> CommitEngine<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            lock_manager: None,
            config: CommitConfig::default(),
        }
    }

    /// Commits are serialized per object id using `lock_manager`: a storage root typically shares
    /// one lock manager across every object it commits to.
    pub fn with_lock_manager(mut self, lock_manager: Arc<LockManager>) -> Self {
        self.lock_manager = Some(lock_manager);
        self
    }

    /// Sets the defaults applied to every `CommitRequest` built via `new_request`. Does not affect
    /// a `CommitRequest` built directly with `CommitRequest::new`.
    pub fn with_config(mut self, config: CommitConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a `CommitRequest` with `padding_width` and `concurrency` pre-filled from this
    /// engine's `CommitConfig`, so a caller who wants the configured defaults to actually apply
    /// does not have to repeat them on every request.
    pub fn new_request(&self, stage: Stage) -> CommitRequest {
        CommitRequest::new(stage)
            .with_padding_width(self.config.padding_width)
            .with_concurrency(self.config.worker_count)
    }

    /// Commits `request` to the object rooted at `object_root`. If no inventory exists there yet,
    /// a brand-new object is created; otherwise a new version is appended. Returns the newly
    /// written inventory.
    pub fn commit(&self, object_root: &str, request: CommitRequest) -> Result<Inventory> {
        let previous = self.load_previous(object_root)?;

        // Lock is scoped to this call: acquired after we know the object id, released when it
        // drops at the end of this function (including on early return).
        let object_id = match (&previous, &request.id) {
            (Some(prev), _) => prev.id.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => {
                return Err(OcflError::IllegalArgument(
                    "A new object's id must be supplied in the commit request".to_string(),
                ));
            }
        };

        let _lock = match &self.lock_manager {
            Some(manager) => {
                debug!("Acquiring commit lock for object {}", object_id);
                Some(manager.acquire(&object_id)?)
            }
            None => None,
        };

        self.commit_locked(object_root, &object_id, previous, request)
    }

    fn load_previous(&self, object_root: &str) -> Result<Option<Inventory>> {
        let inventory_path = paths::inventory_path(object_root);
        let mut bytes = Vec::new();
        match self.storage.read(&inventory_path, &mut bytes) {
            Ok(()) => Ok(Some(Inventory::decode(&bytes)?)),
            Err(OcflError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn commit_locked(
        &self,
        object_root: &str,
        object_id: &str,
        previous: Option<Inventory>,
        request: CommitRequest,
    ) -> Result<Inventory> {
        if let Some(prev) = &previous {
            if prev.digest_algorithm != request.stage.digest_algorithm {
                return Err(OcflError::IllegalArgument(format!(
                    "Cannot change an object's digest algorithm from {} to {}",
                    prev.digest_algorithm, request.stage.digest_algorithm
                )));
            }
        }

        // Steps 1-5 build the candidate inventory without touching storage. A failure here
        // rejects the request outright; nothing has been written yet.
        let (inventory, new_entries) = build_next_inventory(object_id, previous.as_ref(), &request)?;

        if let Err(violations) = inventory.validate() {
            return Err(OcflError::InventoryStructure(violations).into_clean_commit());
        }

        info!(
            "Committing {} version {} of object {}",
            if previous.is_none() { "new" } else { "next" },
            inventory.head,
            object_id
        );

        // From here on, a failure marks the object dirty: on-disk state may be partially written.
        self.write_declaration(object_root, previous.as_ref(), &inventory)
            .map_err(|e| e.into_dirty_commit())?;

        self.transfer_content(object_root, &request.stage, &new_entries, request.concurrency)
            .map_err(|e| e.into_dirty_commit())?;

        self.write_inventory(object_root, &inventory)
            .map_err(|e| e.into_dirty_commit())?;

        Ok(inventory)
    }

    fn write_declaration(
        &self,
        object_root: &str,
        previous: Option<&Inventory>,
        inventory: &Inventory,
    ) -> Result<()> {
        match previous {
            None => {
                let path = paths::object_namaste_path(object_root, inventory.spec);
                self.storage
                    .write(&path, &mut inventory.spec.object_namaste_content().as_bytes())?;
            }
            Some(prev) if prev.spec != inventory.spec => {
                debug!(
                    "Object {} spec changed from {} to {}",
                    inventory.id, prev.spec, inventory.spec
                );
                self.storage
                    .remove(&paths::object_namaste_path(object_root, prev.spec))?;
                let path = paths::object_namaste_path(object_root, inventory.spec);
                self.storage
                    .write(&path, &mut inventory.spec.object_namaste_content().as_bytes())?;
            }
            Some(_) => {}
        }

        Ok(())
    }

    fn transfer_content(
        &self,
        object_root: &str,
        stage: &Stage,
        new_entries: &[NewManifestEntry],
        concurrency: usize,
    ) -> Result<()> {
        let tasks: Vec<(HexDigest, ContentPath)> = new_entries
            .iter()
            .flat_map(|entry| {
                entry
                    .content_paths
                    .iter()
                    .map(move |path| (entry.digest.clone(), path.clone()))
            })
            .collect();

        if tasks.is_empty() {
            return Ok(());
        }

        let workers = concurrency.max(1).min(tasks.len());
        let storage = Arc::clone(&self.storage);
        let content_source = Arc::clone(&stage.content_source);
        let object_root = object_root.to_string();
        let same_store = storage.supports_copy();

        let outcomes = Pipeline::run(tasks, workers, move |(digest, content_path), _token| {
            let dst = paths::join(&object_root, content_path.as_str());

            if same_store {
                if let Some(src) = content_source.same_store_path(digest) {
                    debug!("Server-side copying {} to {}", src, dst);
                    storage.copy_within(&src, &dst)?;
                    return Ok(());
                }
            }

            let mut reader = content_source.open(digest)?;
            storage.write(&dst, &mut *reader)?;
            Ok(())
        });

        for outcome in outcomes {
            outcome.output?;
        }

        Ok(())
    }

    fn write_inventory(&self, object_root: &str, inventory: &Inventory) -> Result<()> {
        let (bytes, digest) = inventory.encode()?;
        let sidecar = format!("{}  {}\n", digest, crate::ocfl::consts::INVENTORY_FILE);

        self.storage
            .write(&paths::inventory_path(object_root), &mut bytes.as_slice())?;
        self.storage.write(
            &paths::sidecar_path(object_root, inventory.digest_algorithm),
            &mut sidecar.as_bytes(),
        )?;

        let version_path = paths::version_path(object_root, inventory.head);
        self.storage
            .write(&paths::inventory_path(&version_path), &mut bytes.as_slice())?;
        self.storage.write(
            &paths::sidecar_path(&version_path, inventory.digest_algorithm),
            &mut sidecar.as_bytes(),
        )?;

        Ok(())
    }
}

/// One digest newly introduced by this commit, and the content path(s) it was written to.
struct NewManifestEntry {
    digest: HexDigest,
    content_paths: Vec<ContentPath>,
}

/// Steps 1-4 of §4.7: clones the previous inventory (if any), computes the next head, installs
/// the new version's state, and extends the manifest/fixity with anything the new state
/// introduces. Performs no I/O; returns the candidate inventory plus the list of manifest entries
/// that are new in this commit (content the caller still needs to transfer).
fn build_next_inventory(
    object_id: &str,
    previous: Option<&Inventory>,
    request: &CommitRequest,
) -> Result<(Inventory, Vec<NewManifestEntry>)> {
    let spec = resolve_spec(previous, request.spec)?;
    let content_directory = previous
        .map(|p| p.content_directory.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT_DIR.to_string());
    let mut manifest = previous
        .map(|p| p.manifest.normalize())
        .unwrap_or_else(DigestMap::new);
    let mut versions: BTreeMap<VersionNum, Version> = previous
        .map(|p| p.versions.clone())
        .unwrap_or_default();
    let mut fixity = previous.map(|p| p.fixity.clone()).unwrap_or_default();

    let head = resolve_head(previous, request.new_head, request.padding_width)?;
    let new_state = request.stage.state.normalize();

    if !request.allow_unchanged {
        if let Some(prev) = previous {
            if prev.head_version().state == new_state {
                return Err(OcflError::VersionUnchanged);
            }
        }
    }

    let new_entries = extend_manifest(
        &mut manifest,
        &new_state,
        head,
        &content_directory,
        request.content_path_transform.as_ref(),
    )?;

    for entry in &new_entries {
        let extra = request.stage.fixity_source.fixity_for(&entry.digest);
        for (algorithm, fixity_digest) in extra {
            let map = fixity.entry(algorithm).or_insert_with(DigestMap::new);
            for content_path in &entry.content_paths {
                map.insert(fixity_digest.clone(), content_path.clone());
            }
        }
    }

    let version = Version {
        created: request.created.unwrap_or_else(Utc::now),
        state: new_state,
        message: request.message.clone(),
        user: request.user.clone(),
    };
    versions.insert(head, version);

    let inventory = Inventory::new(
        previous.map(|p| p.id.clone()).unwrap_or_else(|| object_id.to_string()),
        spec,
        request.stage.digest_algorithm,
        head,
        content_directory,
        manifest,
        versions,
        fixity,
    );

    Ok((inventory, new_entries))
}

fn resolve_spec(previous: Option<&Inventory>, requested: Option<SpecVersion>) -> Result<SpecVersion> {
    match (previous, requested) {
        (Some(prev), Some(spec)) => {
            if spec < prev.spec {
                Err(OcflError::IllegalArgument(format!(
                    "Cannot downgrade an object's spec version from {} to {}",
                    prev.spec, spec
                )))
            } else {
                Ok(spec)
            }
        }
        (Some(prev), None) => Ok(prev.spec),
        (None, Some(spec)) => Ok(spec),
        (None, None) => Ok(SpecVersion::Ocfl1_1),
    }
}

fn resolve_head(
    previous: Option<&Inventory>,
    requested: Option<VersionNum>,
    padding_width: u32,
) -> Result<VersionNum> {
    match (previous, requested) {
        (Some(prev), Some(head)) => {
            if head <= prev.head {
                return Err(OcflError::IllegalArgument(format!(
                    "New head {} must be greater than the current head {}",
                    head, prev.head
                )));
            }
            Ok(head)
        }
        (Some(prev), None) => prev.head.next(),
        (None, Some(head)) => {
            if head.number != 1 {
                return Err(OcflError::IllegalArgument(
                    "A new object's first version must be version 1".to_string(),
                ));
            }
            if head.width != padding_width {
                return Err(OcflError::IllegalArgument(format!(
                    "New object's first version {} does not match the requested padding width {}",
                    head, padding_width
                )));
            }
            Ok(head)
        }
        (None, None) => Ok(VersionNum::with_width(1, padding_width)),
    }
}

/// Step 3: adds a manifest entry for every digest in `new_state` not already present in
/// `manifest`, deriving each new entry's content path(s) from the logical paths that introduced
/// it. Returns the list of newly-added entries so the caller can transfer their content and
/// propagate fixity.
fn extend_manifest(
    manifest: &mut DigestMap<ContentPath>,
    new_state: &DigestMap<LogicalPath>,
    head: VersionNum,
    content_directory: &str,
    transform: Option<&ContentPathTransform>,
) -> Result<Vec<NewManifestEntry>> {
    let mut new_entries = Vec::new();
    let mut seen_content_paths = HashSet::new();

    for (digest, logical_paths) in new_state.iter_id_paths() {
        if manifest.contains_id(digest) {
            continue;
        }

        let mut sorted_logical: Vec<String> = logical_paths
            .iter()
            .map(|path| path.as_str().to_string())
            .collect();
        sorted_logical.sort_unstable();

        let names = match transform {
            Some(transform) => transform(&sorted_logical),
            None => sorted_logical.clone(),
        };

        if names.len() != sorted_logical.len() {
            return Err(OcflError::IllegalState(format!(
                "Content path transform changed the number of paths for digest {} (expected {}, got {})",
                digest,
                sorted_logical.len(),
                names.len()
            )));
        }

        let mut content_paths = Vec::with_capacity(names.len());
        for name in names {
            let relative = format!("{}/{}/{}", head, content_directory, name);
            let content_path: ContentPath = relative.as_str().try_into()?;

            if !seen_content_paths.insert(content_path.clone()) {
                return Err(OcflError::IllegalState(format!(
                    "Commit would write the same content path twice: {}",
                    content_path
                )));
            }

            manifest.insert(digest.as_ref().clone(), content_path.clone());
            content_paths.push(content_path);
        }

        new_entries.push(NewManifestEntry {
            digest: digest.as_ref().clone(),
            content_paths,
        });
    }

    if new_entries.is_empty() {
        warn!(
            "Commit for version {} introduces no new content -- every digest in the new state was already in the manifest",
            head
        );
    }

    Ok(new_entries)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::ocfl::fs::MemoryStorage;
    use crate::ocfl::{Object, VersionRef};

    struct MapContentSource {
        bytes: HashMap<HexDigest, Vec<u8>>,
    }

    impl MapContentSource {
        fn new() -> Self {
            Self {
                bytes: HashMap::new(),
            }
        }

        fn with(mut self, digest: &str, content: &str) -> Self {
            self.bytes
                .insert(HexDigest::from(digest), content.as_bytes().to_vec());
            self
        }
    }

    impl ContentSource for MapContentSource {
        fn open(&self, digest: &HexDigest) -> Result<Box<dyn Read>> {
            let bytes = self
                .bytes
                .get(digest)
                .ok_or_else(|| OcflError::NotFound(digest.to_string()))?
                .clone();
            Ok(Box::new(Cursor::new(bytes)))
        }
    }

    fn digest_of(content: &str) -> HexDigest {
        DigestAlgorithm::Sha512.hash_hex(&mut content.as_bytes()).unwrap()
    }

    #[test]
    fn commit_new_object_with_single_file() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest = digest_of("hello");
        let mut state = DigestMap::new();
        state.insert(digest.clone(), LogicalPath::try_from("hello.txt").unwrap());

        let source = Arc::new(MapContentSource::new().with(digest.as_ref(), "hello"));
        let stage = Stage::new(DigestAlgorithm::Sha512, state, source);
        let request = CommitRequest::new(stage).with_id("obj1").with_message("initial");

        let inventory = engine.commit("obj", request).unwrap();
        assert_eq!(VersionNum::new(1), inventory.head);

        let mut bytes = Vec::new();
        storage.read("obj/v1/content/hello.txt", &mut bytes).unwrap();
        assert_eq!(b"hello".to_vec(), bytes);

        let mut root_inv = Vec::new();
        storage.read("obj/inventory.json", &mut root_inv).unwrap();
        let mut v1_inv = Vec::new();
        storage.read("obj/v1/inventory.json", &mut v1_inv).unwrap();
        assert_eq!(root_inv, v1_inv);

        assert!(inventory.validate().is_ok());

        let reopened = Object::open(clone_storage(&storage), "obj").unwrap();
        let state = reopened.state(VersionRef::Head).unwrap();
        assert_eq!(1, state.len());
    }

    #[test]
    fn commit_second_version_keeps_unchanged_content_path() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest_a = digest_of("a");
        let mut state1 = DigestMap::new();
        state1.insert(digest_a.clone(), LogicalPath::try_from("a.txt").unwrap());

        let source1 = Arc::new(MapContentSource::new().with(digest_a.as_ref(), "a"));
        let stage1 = Stage::new(DigestAlgorithm::Sha512, state1, source1);
        engine
            .commit("obj", CommitRequest::new(stage1).with_id("obj1"))
            .unwrap();

        let digest_b = digest_of("b");
        let mut state2 = DigestMap::new();
        state2.insert(digest_a.clone(), LogicalPath::try_from("a.txt").unwrap());
        state2.insert(digest_b.clone(), LogicalPath::try_from("b.txt").unwrap());

        let source2 = Arc::new(MapContentSource::new().with(digest_b.as_ref(), "b"));
        let stage2 = Stage::new(DigestAlgorithm::Sha512, state2, source2);
        let inventory = engine.commit("obj", CommitRequest::new(stage2)).unwrap();

        assert_eq!(VersionNum::new(2), inventory.head);
        assert!(inventory
            .manifest
            .contains_path(&ContentPath::try_from("v1/content/a.txt").unwrap()));
        assert!(inventory
            .manifest
            .contains_path(&ContentPath::try_from("v2/content/b.txt").unwrap()));

        let mut bytes = Vec::new();
        assert!(storage.read("obj/v2/content/a.txt", &mut bytes).is_err());
    }

    #[test]
    fn commit_rejects_unchanged_state_by_default() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest_a = digest_of("a");
        let mut state = DigestMap::new();
        state.insert(digest_a.clone(), LogicalPath::try_from("a.txt").unwrap());
        let source = Arc::new(MapContentSource::new().with(digest_a.as_ref(), "a"));

        engine
            .commit(
                "obj",
                CommitRequest::new(Stage::new(DigestAlgorithm::Sha512, state.clone(), Arc::clone(&source) as Arc<dyn ContentSource>)).with_id("obj1"),
            )
            .unwrap();

        let result = engine.commit(
            "obj",
            CommitRequest::new(Stage::new(DigestAlgorithm::Sha512, state, source)),
        );

        assert!(matches!(result, Err(OcflError::VersionUnchanged)));
    }

    #[test]
    fn commit_allows_unchanged_state_when_opted_in() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest_a = digest_of("a");
        let mut state = DigestMap::new();
        state.insert(digest_a.clone(), LogicalPath::try_from("a.txt").unwrap());
        let source = Arc::new(MapContentSource::new().with(digest_a.as_ref(), "a"));

        engine
            .commit(
                "obj",
                CommitRequest::new(Stage::new(
                    DigestAlgorithm::Sha512,
                    state.clone(),
                    Arc::clone(&source) as Arc<dyn ContentSource>,
                ))
                .with_id("obj1"),
            )
            .unwrap();

        let inventory = engine
            .commit(
                "obj",
                CommitRequest::new(Stage::new(DigestAlgorithm::Sha512, state, source))
                    .with_allow_unchanged(true),
            )
            .unwrap();

        assert_eq!(VersionNum::new(2), inventory.head);
        assert!(inventory.head_version().state.len() == 1);
    }

    #[test]
    fn new_request_seeds_padding_and_concurrency_from_engine_config() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage))
            .with_config(CommitConfig::new().with_padding_width(4).with_worker_count(2));

        let digest = digest_of("hello");
        let mut state = DigestMap::new();
        state.insert(digest.clone(), LogicalPath::try_from("hello.txt").unwrap());
        let source = Arc::new(MapContentSource::new().with(digest.as_ref(), "hello"));
        let stage = Stage::new(DigestAlgorithm::Sha512, state, source);

        let request = engine.new_request(stage);
        assert_eq!(4, request.padding_width);
        assert_eq!(2, request.concurrency);

        let inventory = engine.commit("obj", request.with_id("obj1")).unwrap();
        assert_eq!(VersionNum::with_width(1, 4), inventory.head);
    }

    #[test]
    fn commit_new_object_honors_requested_padding_width() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest = digest_of("hello");
        let mut state = DigestMap::new();
        state.insert(digest.clone(), LogicalPath::try_from("hello.txt").unwrap());

        let source = Arc::new(MapContentSource::new().with(digest.as_ref(), "hello"));
        let stage = Stage::new(DigestAlgorithm::Sha512, state, source);
        let request = CommitRequest::new(stage)
            .with_id("obj1")
            .with_padding_width(4);

        let inventory = engine.commit("obj", request).unwrap();
        assert_eq!(VersionNum::with_width(1, 4), inventory.head);

        let mut bytes = Vec::new();
        storage
            .read("obj/v0001/content/hello.txt", &mut bytes)
            .unwrap();
        assert_eq!(b"hello".to_vec(), bytes);
    }

    #[test]
    fn resolve_head_rejects_new_head_with_wrong_padding() {
        let result = resolve_head(None, Some(VersionNum::with_width(1, 2)), 4);
        assert!(matches!(result, Err(OcflError::IllegalArgument(_))));
    }

    #[test]
    fn resolve_head_reports_padding_exhaustion() {
        let previous = Inventory::new(
            "obj1".to_string(),
            SpecVersion::Ocfl1_1,
            DigestAlgorithm::Sha512,
            VersionNum::with_width(9, 1),
            DEFAULT_CONTENT_DIR.to_string(),
            DigestMap::new(),
            BTreeMap::new(),
            HashMap::new(),
        );

        let result = resolve_head(Some(&previous), None, 0);
        assert!(matches!(result, Err(OcflError::PaddingExhausted { .. })));
    }

    #[test]
    fn digest_algorithm_mismatch_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = CommitEngine::new(Arc::clone(&storage));

        let digest_a = DigestAlgorithm::Sha256
            .hash_hex(&mut "a".as_bytes())
            .unwrap();
        let mut state = DigestMap::new();
        state.insert(digest_a.clone(), LogicalPath::try_from("a.txt").unwrap());
        let source: Arc<dyn ContentSource> =
            Arc::new(MapContentSource::new().with(digest_a.as_ref(), "a"));

        engine
            .commit(
                "obj",
                CommitRequest::new(Stage::new(DigestAlgorithm::Sha256, state.clone(), Arc::clone(&source)))
                    .with_id("obj1"),
            )
            .unwrap();

        let digest_b = DigestAlgorithm::Sha512.hash_hex(&mut "b".as_bytes()).unwrap();
        let mut state2 = DigestMap::new();
        state2.insert(digest_b.clone(), LogicalPath::try_from("b.txt").unwrap());
        let source2: Arc<dyn ContentSource> =
            Arc::new(MapContentSource::new().with(digest_b.as_ref(), "b"));

        let result = engine.commit(
            "obj",
            CommitRequest::new(Stage::new(DigestAlgorithm::Sha512, state2, source2)),
        );
        assert!(matches!(result, Err(OcflError::IllegalArgument(_))));
    }

    /// `MemoryStorage` does not implement `Clone`; tests that need to read back through the
    /// `Object` reader from the same backing store re-wrap the same `Arc` contents by hand.
    fn clone_storage(storage: &Arc<MemoryStorage>) -> MemoryStorage {
        let fresh = MemoryStorage::new();
        for listing in storage.list_recursive(".").unwrap() {
            if listing.is_file() {
                let mut bytes = Vec::new();
                storage.read(listing.path(), &mut bytes).unwrap();
                fresh.write(listing.path(), &mut bytes.as_slice()).unwrap();
            }
        }
        fresh
    }
}
