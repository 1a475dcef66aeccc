//! The storage-root id-to-path resolver is a plug-in capability the engine calls but never
//! implements: concrete layout extensions (flat-direct, hashed-n-tuple, ...) are concrete
//! backend-adjacent adapters, out of scope for the engine itself (see `SPEC_FULL.md` §1, §9).

use crate::ocfl::error::Result;

/// Maps an object identifier to the path of its object root, relative to the storage root.
/// Implementations are expected to be deterministic and injective over the set of ids they're
/// ever asked to resolve.
pub trait LayoutExtension {
    /// Returns the object-relative-to-storage-root path for `object_id`.
    fn map(&self, object_id: &str) -> Result<String>;
}

/// The advisory pointer stored in a storage root's `ocfl_layout.json`: `{description, extension}`.
/// The engine only reads this file far enough to know which extension name governs the root; it
/// never interprets the extension itself.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct OcflLayout {
    pub description: String,
    pub extension: String,
}
