//! The full validator: walks an object (or recursively, a storage root) and decides whether it
//! conforms to the OCFL spec, producing a capped list of fatal errors and warnings (§4.9).
//!
//! The central data structure is the *path ledger*: a map from object-relative path to every
//! digest any inventory (root or version) has claimed for it, plus the version it was actually
//! found stored at on disk, if any. Reconciling the ledger after every inventory has been read is
//! what catches tampered content, missing files, and stale copies without re-deriving state from
//! scratch for every single check.

use std::collections::HashMap;
use std::convert::TryInto;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

pub use self::codes::{ErrorCode, WarnCode};

use crate::ocfl::digest::{DigestAlgorithm, HexDigest, MultiDigestWriter};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs::{Listing, Storage};
use crate::ocfl::inventory::Inventory;
use crate::ocfl::pipeline::Pipeline;
use crate::ocfl::{paths, ContentPath, InventoryPath, SpecVersion, VersionNum};

mod codes;

static EXTENSION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\d{4}-[a-z0-9-]+$"#).unwrap());
static SIDECAR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^([a-fA-F0-9]+)[\t ]+(\S.*)\n?$"#).unwrap());

/// A tiny hand-rolled stand-in for the `bitflags` crate: the set of ledger locations is small,
/// fixed, and only ever combined with `|`/`contains`, so a macro-generated newtype is simpler
/// than pulling in the dependency for four bits.
macro_rules! bitflags_lite {
    ($(#[$meta:meta])* struct $name:ident: $repr:ty { $(const $variant:ident = $value:expr;)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        struct $name($repr);

        impl $name {
            $(const $variant: $name = $name($value);)*

            fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

bitflags_lite! {
    /// Which inventories have claimed a digest for a ledger path.
    struct Locations: u8 {
        const ROOT_MANIFEST = 0b0001;
        const ROOT_FIXITY = 0b0010;
        const VERSION_MANIFEST = 0b0100;
        const VERSION_FIXITY = 0b1000;
    }
}

/// A single violation of one of the structural invariants in §3, independent of any I/O. This is
/// what `Inventory::validate()` returns, and what `OcflError::InventoryStructure` carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralViolation {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: Option<ErrorCode>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: Option<WarnCode>,
    pub message: String,
}

/// Controls how many errors/warnings a validation run accumulates before giving up, and whether
/// the (expensive) content digest pass runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Maximum number of fatal errors to record. `-1` means unlimited. Default: 100.
    pub max_errors: i32,
    /// Maximum number of warnings to record. `-1` means unlimited. Default: 100.
    pub max_warnings: i32,
    /// Whether to read and re-digest every referenced file. Default: true.
    pub check_content: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_errors: 100,
            max_warnings: 100,
            check_content: true,
        }
    }
}

/// The outcome of validating one object: an ordered list of fatal errors and an ordered list of
/// warnings, each capped per `ValidationOptions`. Reaching a cap is itself meaningful -- it means
/// the validator stopped recording before it necessarily stopped finding problems -- so callers
/// should check `errors_capped`/`warnings_capped` rather than assuming an empty continuation means
/// a clean bill of health.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub errors_capped: bool,
    pub warnings_capped: bool,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, options: &ValidationOptions, code: ErrorCode, message: impl Into<String>) {
        if options.max_errors >= 0 && self.errors.len() as i32 >= options.max_errors {
            self.errors_capped = true;
            return;
        }
        self.errors.push(ValidationError {
            code: Some(code),
            message: message.into(),
        });
    }

    fn warn(&mut self, options: &ValidationOptions, code: WarnCode, message: impl Into<String>) {
        if options.max_warnings >= 0 && self.warnings.len() as i32 >= options.max_warnings {
            self.warnings_capped = true;
            return;
        }
        self.warnings.push(ValidationWarning {
            code: Some(code),
            message: message.into(),
        });
    }

    fn extend_structural(&mut self, options: &ValidationOptions, violations: Vec<StructuralViolation>) {
        for v in violations {
            self.error(options, v.code, v.message);
        }
    }
}

#[derive(Default)]
struct LedgerEntry {
    exists_in: Option<VersionNum>,
    digests: HashMap<DigestAlgorithm, (HexDigest, Locations)>,
}

#[derive(Default)]
struct Ledger {
    entries: HashMap<String, LedgerEntry>,
}

impl Ledger {
    fn entry(&mut self, path: &str) -> &mut LedgerEntry {
        self.entries.entry(path.to_string()).or_default()
    }

    /// Records that `path` carries `digest` under `algorithm`, as claimed by an inventory at
    /// `location`. A second, conflicting digest for the same (path, algorithm) is a fatal error
    /// (E111): two inventories disagreeing about a content file's bytes is not any kind of legal
    /// evolution.
    fn register(
        &mut self,
        result: &mut ValidationResult,
        options: &ValidationOptions,
        path: &str,
        algorithm: DigestAlgorithm,
        digest: &HexDigest,
        location: Locations,
    ) {
        let entry = self.entry(path);
        match entry.digests.get_mut(&algorithm) {
            Some((existing, locations)) => {
                if *existing != *digest {
                    result.error(
                        options,
                        ErrorCode::E111,
                        format!(
                            "Path {} has conflicting {} digests: {} and {}",
                            path, algorithm, existing, digest
                        ),
                    );
                } else {
                    *locations |= location;
                }
            }
            None => {
                entry.digests.insert(algorithm, (digest.clone(), location));
            }
        }
    }

    fn mark_exists(&mut self, path: &str, version: VersionNum) {
        self.entry(path).exists_in = Some(version);
    }
}

/// Validates an object -- or, recursively, a storage root -- against the OCFL spec.
pub struct Validator<S: Storage + Send + Sync + 'static> {
    storage: Arc<S>,
    options: ValidationOptions,
}

/// The result of validating every object found beneath a storage root.
#[derive(Debug, Default)]
pub struct RepositoryValidationResult {
    pub root: ValidationResult,
    pub objects: Vec<(String, ValidationResult)>,
}

impl<S: Storage + Send + Sync + 'static> Validator<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(storage: S, options: ValidationOptions) -> Self {
        Self {
            storage: Arc::new(storage),
            options,
        }
    }

    /// Validates the object rooted at `object_root` (relative to this validator's storage).
    pub fn validate_object(&self, object_root: &str) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        let mut ledger = Ledger::default();

        let spec = match self.validate_namaste(object_root, &mut result) {
            Some(spec) => spec,
            None => return Ok(result),
        };

        let root_inventory = match self.validate_root_inventory(object_root, spec, &mut result) {
            Some(inv) => inv,
            None => return Ok(result),
        };

        self.register_inventory_content(
            &mut ledger,
            &mut result,
            &root_inventory,
            Locations::ROOT_MANIFEST,
            Locations::ROOT_FIXITY,
        );

        let mut previous_spec = root_inventory.spec;

        for version_num in root_inventory.head.lineage_to() {
            previous_spec = self.validate_version(
                object_root,
                version_num,
                &root_inventory,
                previous_spec,
                &mut ledger,
                &mut result,
            );
        }

        self.validate_extensions(object_root, &mut result);
        self.reconcile_ledger(&ledger, &root_inventory, &mut result);

        if self.options.check_content {
            self.validate_content(&ledger, &mut result);
        }

        Ok(result)
    }

    /// Validates a storage root: its own NAMASTE, `ocfl_layout.json`, the extensions directory,
    /// and recursively every object it finds beneath it.
    pub fn validate_storage_root(&self, root: &str) -> Result<RepositoryValidationResult> {
        let mut repo_result = RepositoryValidationResult::default();

        let declared = [SpecVersion::Ocfl1_1, SpecVersion::Ocfl1_0]
            .into_iter()
            .find(|spec| self.file_exists(&paths::root_namaste_path(root, *spec)));

        if declared.is_none() {
            repo_result.root.error(
                &self.options,
                ErrorCode::E072,
                "Storage root is missing its NAMASTE declaration",
            );
        }

        let layout_path = paths::ocfl_layout_path(root);
        if self.file_exists(&layout_path) {
            let mut bytes = Vec::new();
            if self.storage.read(&layout_path, &mut bytes).is_ok()
                && serde_json::from_slice::<crate::ocfl::layout::OcflLayout>(&bytes).is_err()
            {
                repo_result.root.error(
                    &self.options,
                    ErrorCode::E073,
                    "ocfl_layout.json could not be parsed",
                );
            }
        }

        self.validate_extensions(root, &mut repo_result.root);
        self.walk_storage_dir(root, &mut repo_result);

        Ok(repo_result)
    }

    fn walk_storage_dir(&self, dir: &str, repo_result: &mut RepositoryValidationResult) {
        let entries = match self.storage.list(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let is_object_root = entries.iter().any(|e| {
            e.is_file()
                && (e.path() == SpecVersion::Ocfl1_0.object_namaste_filename()
                    || e.path() == SpecVersion::Ocfl1_1.object_namaste_filename())
        });

        if is_object_root {
            match self.validate_object(dir) {
                Ok(result) => repo_result.objects.push((dir.to_string(), result)),
                Err(e) => {
                    let mut result = ValidationResult::default();
                    result.error(&self.options, ErrorCode::E072, e.to_string());
                    repo_result.objects.push((dir.to_string(), result));
                }
            }
            return;
        }

        let mut found_child = false;
        for entry in entries {
            if entry.is_dir() && entry.path() != crate::ocfl::consts::EXTENSIONS_DIR {
                found_child = true;
                self.walk_storage_dir(&paths::join(dir, entry.path()), repo_result);
            } else if entry.is_file() {
                repo_result.root.error(
                    &self.options,
                    ErrorCode::E084,
                    format!("Unexpected file beneath storage root: {}", paths::join(dir, entry.path())),
                );
            }
        }

        if !found_child && dir != "." {
            repo_result.root.warn(
                &self.options,
                WarnCode::W013,
                format!("Directory {} is empty", dir),
            );
        }
    }

    fn file_exists(&self, path: &str) -> bool {
        let mut sink = Vec::new();
        self.storage.read(path, &mut sink).is_ok()
    }

    fn validate_namaste(&self, object_root: &str, result: &mut ValidationResult) -> Option<SpecVersion> {
        for spec in [SpecVersion::Ocfl1_1, SpecVersion::Ocfl1_0] {
            let path = paths::object_namaste_path(object_root, spec);
            let mut contents = Vec::new();
            if self.storage.read(&path, &mut contents).is_ok() {
                if contents != spec.object_namaste_content().as_bytes() {
                    result.error(
                        &self.options,
                        ErrorCode::E007,
                        format!("NAMASTE declaration {} has unexpected content", path),
                    );
                }
                return Some(spec);
            }
        }

        result.error(
            &self.options,
            ErrorCode::E003,
            format!("Object root {} is missing its NAMASTE declaration", object_root),
        );
        None
    }

    fn validate_root_inventory(
        &self,
        object_root: &str,
        spec: SpecVersion,
        result: &mut ValidationResult,
    ) -> Option<Inventory> {
        let inventory_path = paths::inventory_path(object_root);
        let mut bytes = Vec::new();
        if self.storage.read(&inventory_path, &mut bytes).is_err() {
            result.error(&self.options, ErrorCode::E063, "inventory.json does not exist");
            return None;
        }

        let inventory = match Inventory::decode(&bytes) {
            Ok(inv) => inv,
            Err(OcflError::UnrecognizedField(msg)) => {
                result.error(&self.options, ErrorCode::E102, msg);
                return None;
            }
            Err(e) => {
                result.error(&self.options, ErrorCode::E033, format!("inventory.json could not be parsed: {}", e));
                return None;
            }
        };

        if inventory.spec != spec {
            result.warn(
                &self.options,
                WarnCode::W001,
                "Inventory 'type' does not match the object's NAMASTE declaration",
            );
        }

        if let Err(violations) = inventory.validate() {
            result.extend_structural(&self.options, violations);
        }

        self.validate_sidecar(object_root, &inventory, result);

        Some(inventory)
    }

    fn validate_sidecar(&self, dir: &str, inventory: &Inventory, result: &mut ValidationResult) {
        let sidecar_path = paths::sidecar_path(dir, inventory.digest_algorithm);
        let mut bytes = Vec::new();
        if self.storage.read(&sidecar_path, &mut bytes).is_err() {
            result.error(&self.options, ErrorCode::E058, format!("{} does not exist", sidecar_path));
            return;
        }

        let contents = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => {
                result.error(&self.options, ErrorCode::E061, format!("{} is not valid UTF-8", sidecar_path));
                return;
            }
        };

        match SIDECAR_LINE.captures(&contents) {
            Some(captures) => {
                let digest = HexDigest::from(captures.get(1).unwrap().as_str());
                if &digest != inventory.raw_digest() {
                    result.error(
                        &self.options,
                        ErrorCode::E060,
                        format!(
                            "{} digest {} does not match recomputed digest {}",
                            sidecar_path,
                            digest,
                            inventory.raw_digest()
                        ),
                    );
                }
            }
            None => {
                result.error(&self.options, ErrorCode::E061, format!("{} is malformed", sidecar_path));
            }
        }
    }

    fn register_inventory_content(
        &self,
        ledger: &mut Ledger,
        result: &mut ValidationResult,
        inventory: &Inventory,
        manifest_loc: Locations,
        fixity_loc: Locations,
    ) {
        for (path, digest) in &inventory.manifest {
            ledger.register(
                result,
                &self.options,
                path.as_str(),
                inventory.digest_algorithm,
                digest,
                manifest_loc,
            );
        }

        for (algorithm, map) in &inventory.fixity {
            for (path, digest) in map {
                ledger.register(result, &self.options, path.as_str(), *algorithm, digest, fixity_loc);
            }
        }
    }

    fn validate_version(
        &self,
        object_root: &str,
        version_num: VersionNum,
        root_inventory: &Inventory,
        previous_spec: SpecVersion,
        ledger: &mut Ledger,
        result: &mut ValidationResult,
    ) -> SpecVersion {
        let version_dir = paths::version_path(object_root, version_num);
        let content_dir_name = root_inventory.content_directory.as_str();

        if let Ok(entries) = self.storage.list(&version_dir) {
            for entry in &entries {
                match entry {
                    Listing::File(name) => {
                        let name = name.as_ref();
                        if name != crate::ocfl::consts::INVENTORY_FILE
                            && !name.starts_with(&format!("{}.", crate::ocfl::consts::INVENTORY_FILE))
                        {
                            result.error(
                                &self.options,
                                ErrorCode::E015,
                                format!("Unexpected file in {}: {}", version_dir, name),
                            );
                        }
                    }
                    Listing::Directory(name) => {
                        if name.as_ref() != content_dir_name {
                            result.warn(
                                &self.options,
                                WarnCode::W002,
                                format!("Unexpected directory in {}: {}", version_dir, name),
                            );
                        }
                    }
                    Listing::Other(_) => {}
                }
            }
        }

        let version_spec = self.validate_version_inventory(
            object_root,
            version_num,
            root_inventory,
            previous_spec,
            ledger,
            result,
        );

        let content_dir = paths::content_path(object_root, version_num, root_inventory);
        if let Ok(files) = self.storage.list_recursive(&content_dir) {
            for file in files {
                if let Listing::File(relative) = file {
                    let ledger_path = format!("{}/{}/{}", version_num, content_dir_name, relative);
                    ledger.mark_exists(&ledger_path, version_num);
                }
            }
        }

        version_spec
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_version_inventory(
        &self,
        object_root: &str,
        version_num: VersionNum,
        root_inventory: &Inventory,
        previous_spec: SpecVersion,
        ledger: &mut Ledger,
        result: &mut ValidationResult,
    ) -> SpecVersion {
        let version_dir = paths::version_path(object_root, version_num);
        let inventory_path = paths::inventory_path(&version_dir);

        let mut bytes = Vec::new();
        if self.storage.read(&inventory_path, &mut bytes).is_err() {
            result.warn(
                &self.options,
                WarnCode::W010,
                format!("{} is missing inventory.json", version_dir),
            );
            return previous_spec;
        }

        let inventory = match Inventory::decode(&bytes) {
            Ok(inv) => inv,
            Err(OcflError::UnrecognizedField(msg)) => {
                result.error(
                    &self.options,
                    ErrorCode::E102,
                    format!("{}: {}", inventory_path, msg),
                );
                return previous_spec;
            }
            Err(e) => {
                result.error(
                    &self.options,
                    ErrorCode::E033,
                    format!("{} could not be parsed: {}", inventory_path, e),
                );
                return previous_spec;
            }
        };

        if let Err(violations) = inventory.validate() {
            result.extend_structural(&self.options, violations);
        }

        if inventory.spec < previous_spec {
            result.error(
                &self.options,
                ErrorCode::E103,
                format!("{} declares an earlier spec version than a prior version", inventory_path),
            );
        }

        if inventory.id != root_inventory.id {
            result.error(
                &self.options,
                ErrorCode::E037,
                format!("{} field 'id' does not match the root inventory", inventory_path),
            );
        }

        if inventory.content_directory != root_inventory.content_directory {
            result.error(
                &self.options,
                ErrorCode::E019,
                format!("{} field 'contentDirectory' does not match the root inventory", inventory_path),
            );
        }

        if inventory.head != version_num {
            result.error(
                &self.options,
                ErrorCode::E040,
                format!("{} field 'head' does not equal {}", inventory_path, version_num),
            );
        }

        if version_num == root_inventory.head {
            if inventory.raw_digest() != root_inventory.raw_digest() {
                result.error(
                    &self.options,
                    ErrorCode::E064,
                    format!("{} does not match the root inventory's digest", inventory_path),
                );
            }
        } else if let (Ok(this_version), Ok(root_version)) = (
            inventory.get_version(version_num),
            root_inventory.get_version(version_num),
        ) {
            if this_version.state != root_version.state {
                result.error(
                    &self.options,
                    ErrorCode::E066,
                    format!("{} state is not consistent with the root inventory", inventory_path),
                );
            }

            if this_version.created != root_version.created
                || this_version.message != root_version.message
                || this_version.user != root_version.user
            {
                result.warn(
                    &self.options,
                    WarnCode::W011,
                    format!(
                        "{} created/message/user differs from the root inventory's record of {}",
                        inventory_path, version_num
                    ),
                );
            }
        }

        self.validate_sidecar(&version_dir, &inventory, result);

        self.register_inventory_content(
            ledger,
            result,
            &inventory,
            Locations::VERSION_MANIFEST,
            Locations::VERSION_FIXITY,
        );

        inventory.spec
    }

    fn validate_extensions(&self, dir: &str, result: &mut ValidationResult) {
        let extensions_dir = paths::extensions_path(dir);
        let entries = match self.storage.list(&extensions_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries {
            match entry {
                Listing::Directory(name) => {
                    if !EXTENSION_NAME.is_match(name.as_ref()) {
                        result.warn(
                            &self.options,
                            WarnCode::W013,
                            format!("Unknown extension: {}", name),
                        );
                    }
                }
                other => {
                    result.error(
                        &self.options,
                        ErrorCode::E067,
                        format!("extensions/ may only contain directories, found: {}", other.path()),
                    );
                }
            }
        }
    }

    fn reconcile_ledger(&self, ledger: &Ledger, root_inventory: &Inventory, result: &mut ValidationResult) {
        for (path, entry) in &ledger.entries {
            if entry.exists_in.is_none() {
                let only_fixity = entry
                    .digests
                    .values()
                    .all(|(_, loc)| !loc.contains(Locations::ROOT_MANIFEST | Locations::VERSION_MANIFEST));

                if only_fixity {
                    result.error(
                        &self.options,
                        ErrorCode::E093,
                        format!("Fixity-referenced file does not exist on disk: {}", path),
                    );
                } else {
                    result.error(
                        &self.options,
                        ErrorCode::E092,
                        format!("Manifest-referenced file does not exist on disk: {}", path),
                    );
                }
                continue;
            }

            let stored_at = entry.exists_in.unwrap();
            if stored_at <= root_inventory.head {
                let logical_path: Result<ContentPath> = path.as_str().try_into();
                let known_to_manifest = logical_path
                    .map(|p| root_inventory.manifest.contains_path(&p))
                    .unwrap_or(false);

                if !known_to_manifest {
                    result.error(
                        &self.options,
                        ErrorCode::E023,
                        format!("{} is present on disk but not referenced by the root manifest", path),
                    );
                }
            }
        }
    }

    fn validate_content(&self, ledger: &Ledger, result: &mut ValidationResult) {
        let tasks: Vec<(String, Vec<DigestAlgorithm>, HashMap<DigestAlgorithm, (HexDigest, Locations)>)> = ledger
            .entries
            .iter()
            .filter(|(_, entry)| entry.exists_in.is_some() && !entry.digests.is_empty())
            .map(|(path, entry)| {
                let algorithms: Vec<DigestAlgorithm> = entry.digests.keys().copied().collect();
                (path.clone(), algorithms, entry.digests.clone())
            })
            .collect();

        let workers = Pipeline::default_worker_count(tasks.len());
        let storage = Arc::clone(&self.storage);

        let outcomes = Pipeline::run(tasks, workers, move |(path, algorithms, expected), _token| {
            let mut writer = MultiDigestWriter::new(algorithms, Vec::new());
            storage.read(path, &mut writer)?;
            let computed = writer.finalize_hex();
            Ok((path.clone(), expected.clone(), computed))
        });

        for outcome in outcomes {
            match outcome.output {
                Ok((path, expected, computed)) => {
                    for (algorithm, (expected_digest, locations)) in expected {
                        let actual = computed.get(&algorithm);
                        if actual != Some(&expected_digest) {
                            let code = if locations.contains(Locations::ROOT_MANIFEST | Locations::VERSION_MANIFEST) {
                                ErrorCode::E092
                            } else {
                                ErrorCode::E093
                            };
                            result.error(
                                &self.options,
                                code,
                                format!("{} does not match its declared {} digest", path, algorithm),
                            );
                        }
                    }
                }
                Err(e) => {
                    result.error(&self.options, ErrorCode::E092, format!("Failed to read content: {}", e));
                }
            }
        }
    }
}

/// Checks every structural invariant from §3 against an already-decoded inventory. Performs no
/// I/O. Shared by `Inventory::validate()` and the full validator's structural checks.
pub(crate) fn check_inventory_structure(inventory: &Inventory, violations: &mut Vec<StructuralViolation>) {
    use crate::ocfl::digest::DigestAlgorithm as Alg;

    if inventory.digest_algorithm != Alg::Sha512 && inventory.digest_algorithm != Alg::Sha256 {
        violations.push(StructuralViolation {
            code: ErrorCode::E036,
            message: format!(
                "digestAlgorithm must be sha512 or sha256, found {}",
                inventory.digest_algorithm
            ),
        });
    }

    if inventory.content_directory.contains('/')
        || inventory.content_directory == "."
        || inventory.content_directory == ".."
    {
        violations.push(StructuralViolation {
            code: ErrorCode::E012,
            message: format!(
                "contentDirectory must not contain '/', '.', or '..'; found {}",
                inventory.content_directory
            ),
        });
    }

    if !inventory.versions.contains_key(&inventory.head) {
        violations.push(StructuralViolation {
            code: ErrorCode::E036,
            message: format!("head version {} is not present in versions", inventory.head),
        });
        return;
    }

    let actual_max = *inventory.versions.keys().max().unwrap();
    if actual_max != inventory.head {
        violations.push(StructuralViolation {
            code: ErrorCode::E040,
            message: format!(
                "head ({}) does not equal the maximum version present ({})",
                inventory.head, actual_max
            ),
        });
    }

    let expected_lineage = inventory.head.lineage_to();
    let mut actual_lineage: Vec<VersionNum> = inventory.versions.keys().copied().collect();
    actual_lineage.sort();
    if actual_lineage != expected_lineage {
        violations.push(StructuralViolation {
            code: ErrorCode::E008,
            message: "versions must form a contiguous lineage from v1 to head".to_string(),
        });
    }

    let mut digests_used_in_state = std::collections::HashSet::new();

    for (version_num, version) in &inventory.versions {
        for (_, digest) in &version.state {
            digests_used_in_state.insert(digest.as_ref().clone());
            if !inventory.manifest.contains_id(digest) {
                violations.push(StructuralViolation {
                    code: ErrorCode::E092,
                    message: format!(
                        "version {} state references digest {} that is not in the manifest",
                        version_num, digest
                    ),
                });
            }
        }
    }

    for (path, digest) in &inventory.manifest {
        if !digests_used_in_state.contains(digest.as_ref()) {
            violations.push(StructuralViolation {
                code: ErrorCode::E023,
                message: format!("manifest digest {} ({}) is not used by any version state", digest, path),
            });
        }

        let path_str = path.as_str();
        let expected_prefix = format!("/{}/", inventory.content_directory);
        let rest = path_str.splitn(2, '/').nth(1).map(|r| format!("/{}", r));
        let has_expected_dir = rest.map(|r| r.starts_with(&expected_prefix)).unwrap_or(false);

        if !has_expected_dir || path.version > inventory.head {
            violations.push(StructuralViolation {
                code: ErrorCode::E041,
                message: format!(
                    "manifest path {} is not prefixed by a valid version/contentDirectory for this inventory",
                    path
                ),
            });
        }
    }

    for map in inventory.fixity.values() {
        for (path, _) in map {
            if !inventory.manifest.contains_path(path) {
                violations.push(StructuralViolation {
                    code: ErrorCode::E095,
                    message: format!("fixity path {} is not present in the manifest", path),
                });
            }
        }
    }
}
