//! The inventory is the authoritative record of one object: every version it has ever had, the
//! content-addressed manifest backing those versions, and optional fixity information. This
//! module owns both the in-memory model and its strict JSON codec (§4.5 of `SPEC_FULL.md`).

use std::collections::{BTreeMap, HashMap};
use std::convert::TryInto;

use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::ocfl::consts::DEFAULT_CONTENT_DIR;
use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::validate::StructuralViolation;
use crate::ocfl::{ContentPath, DigestMap, InventoryPath, LogicalPath, SpecVersion, VersionNum};

/// The in-memory model of an inventory. Immutable once built: the commit engine constructs a
/// new value for every version rather than mutating one in place.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub id: String,
    pub spec: SpecVersion,
    pub digest_algorithm: DigestAlgorithm,
    pub head: VersionNum,
    pub content_directory: String,
    pub manifest: DigestMap<ContentPath>,
    pub versions: BTreeMap<VersionNum, Version>,
    pub fixity: HashMap<DigestAlgorithm, DigestMap<ContentPath>>,

    /// The lowercase-hex digest of the exact bytes this inventory was decoded from (or last
    /// encoded to), under `digest_algorithm`. This is what the sidecar is checked against.
    raw_digest: OnceCell<HexDigest>,
}

/// A single entry in `versions`.
#[derive(Debug, Clone)]
pub struct Version {
    pub created: DateTime<Utc>,
    pub state: DigestMap<LogicalPath>,
    pub message: Option<String>,
    pub user: Option<User>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: Option<String>,
    pub address: Option<String>,
}

// Wire format. Field names match the spec exactly; unknown fields are a decode error (E102).
#[derive(Deserialize, Serialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawInventory {
    id: String,
    #[serde(rename = "type")]
    type_declaration: String,
    digest_algorithm: DigestAlgorithm,
    head: VersionNum,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_directory: Option<String>,
    manifest: DigestMap<ContentPath>,
    versions: BTreeMap<VersionNum, RawVersion>,
    /// Keyed by a `BTreeMap` rather than a `HashMap` so re-encoding the same inventory always
    /// emits its fixity algorithms in the same order -- otherwise two encodes of an unchanged
    /// inventory could produce different canonical bytes, and thus different digests.
    #[serde(skip_serializing_if = "Option::is_none")]
    fixity: Option<BTreeMap<String, DigestMap<ContentPath>>>,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawVersion {
    created: DateTime<Utc>,
    state: DigestMap<LogicalPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

/// `serde`'s `deny_unknown_fields` rejection doesn't get its own `serde_json::error::Category` --
/// it surfaces as a `Data`-category error whose message starts with "unknown field". This is the
/// only way to distinguish it from other structurally-invalid JSON (missing/mistyped fields).
fn is_unknown_field_error(e: &serde_json::Error) -> bool {
    e.classify() == serde_json::error::Category::Data && e.to_string().starts_with("unknown field")
}

impl Inventory {
    /// Builds a new inventory from its components. Used by the commit engine to assemble the
    /// candidate inventory for a version before it is ever encoded; the wire digest cache is left
    /// unset until `encode()` runs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        spec: SpecVersion,
        digest_algorithm: DigestAlgorithm,
        head: VersionNum,
        content_directory: String,
        manifest: DigestMap<ContentPath>,
        versions: BTreeMap<VersionNum, Version>,
        fixity: HashMap<DigestAlgorithm, DigestMap<ContentPath>>,
    ) -> Self {
        Self {
            id,
            spec,
            digest_algorithm,
            head,
            content_directory,
            manifest,
            versions,
            fixity,
            raw_digest: OnceCell::new(),
        }
    }

    /// Decodes raw inventory bytes, parsing strictly (unknown fields fail, E102) and caching the
    /// lowercase-hex digest of `bytes` under the parsed `digestAlgorithm`. This does not run
    /// structural validation; call `validate()` for that.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw: RawInventory = serde_json::from_slice(bytes).map_err(|e| {
            if is_unknown_field_error(&e) {
                OcflError::UnrecognizedField(e.to_string())
            } else {
                OcflError::IllegalArgument(format!("Invalid inventory JSON: {}", e))
            }
        })?;

        let spec = SpecVersion::try_from_inventory_type(&raw.type_declaration)?;

        let mut fixity = HashMap::new();
        if let Some(raw_fixity) = raw.fixity {
            for (algorithm, map) in raw_fixity {
                let algorithm = algorithm.parse::<DigestAlgorithm>().map_err(|_| {
                    OcflError::IllegalArgument(format!("Unknown fixity algorithm: {}", algorithm))
                })?;
                fixity.insert(algorithm, map);
            }
        }

        let mut versions = BTreeMap::new();
        for (num, raw_version) in raw.versions {
            versions.insert(
                num,
                Version {
                    created: raw_version.created,
                    state: raw_version.state,
                    message: raw_version.message,
                    user: raw_version.user,
                },
            );
        }

        let digest = raw.digest_algorithm.hash_hex(&mut &bytes[..])?;

        let inventory = Self {
            id: raw.id,
            spec,
            digest_algorithm: raw.digest_algorithm,
            head: raw.head,
            content_directory: raw
                .content_directory
                .unwrap_or_else(|| DEFAULT_CONTENT_DIR.to_string()),
            manifest: raw.manifest,
            versions,
            fixity,
            raw_digest: OnceCell::new(),
        };

        let _ = inventory.raw_digest.set(digest);
        Ok(inventory)
    }

    /// Serializes this inventory to its canonical JSON bytes, caching (and returning) the
    /// lowercase-hex digest of the produced bytes under `digest_algorithm`.
    pub fn encode(&self) -> Result<(Vec<u8>, HexDigest)> {
        let mut raw_fixity = None;
        if !self.fixity.is_empty() {
            let mut map = BTreeMap::new();
            for (algorithm, digests) in &self.fixity {
                map.insert(algorithm.to_string(), digests.clone());
            }
            raw_fixity = Some(map);
        }

        let raw = RawInventory {
            id: self.id.clone(),
            type_declaration: self.spec.inventory_type().to_string(),
            digest_algorithm: self.digest_algorithm,
            head: self.head,
            content_directory: Some(self.content_directory.clone()),
            manifest: self.manifest.clone(),
            versions: self
                .versions
                .iter()
                .map(|(num, version)| {
                    (
                        *num,
                        RawVersion {
                            created: version.created,
                            state: version.state.clone(),
                            message: version.message.clone(),
                            user: version.user.clone(),
                        },
                    )
                })
                .collect(),
            fixity: raw_fixity,
        };

        let bytes = serde_json::to_vec(&raw)?;
        let digest = self.digest_algorithm.hash_hex(&mut bytes.as_slice())?;
        // `raw_digest` is only ever unset at this point: `Inventory::new` leaves it empty, and
        // nothing else calls `encode()` on an inventory that was decoded (and so already has one).
        let _ = self.raw_digest.set(digest.clone());

        Ok((bytes, digest))
    }

    /// The digest of the bytes this inventory was last decoded from or encoded to. Panics if
    /// called before either has happened -- every inventory reachable through the public API
    /// came from one of those two paths.
    pub fn raw_digest(&self) -> &HexDigest {
        self.raw_digest
            .get()
            .expect("inventory digest is always set by decode() or encode()")
    }

    /// Returns a reference to the head version.
    pub fn head_version(&self) -> &Version {
        self.versions
            .get(&self.head)
            .expect("structural validation guarantees head is present")
    }

    pub fn get_version(&self, version_num: VersionNum) -> Result<&Version> {
        self.versions
            .get(&version_num)
            .ok_or_else(|| OcflError::NotFound(format!("version {}", version_num)))
    }

    /// Runs every structural invariant from §3 of `SPEC_FULL.md`. Performs no I/O.
    pub fn validate(&self) -> std::result::Result<(), Vec<StructuralViolation>> {
        let mut violations = Vec::new();
        crate::ocfl::validate::check_inventory_structure(self, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn content_path_for_digest(&self, digest: &HexDigest) -> Option<&ContentPath> {
        self.manifest
            .paths_of(digest)
            .and_then(|paths| paths.iter().next())
            .map(|rc| rc.as_ref())
    }
}

impl Version {
    pub fn is_file(&self, path: &LogicalPath) -> bool {
        self.state.contains_path(path)
    }

    pub fn lookup_digest(&self, path: &LogicalPath) -> Option<&HexDigest> {
        self.state.digest_of(path).map(|rc| rc.as_ref())
    }
}

impl User {
    pub fn new(name: Option<String>, address: Option<String>) -> Self {
        Self { name, address }
    }
}
