use core::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::{error, io};

use thiserror::Error;

use crate::ocfl::validate::StructuralViolation;
use crate::ocfl::VersionNum;

pub type Result<T, E = OcflError> = core::result::Result<T, E>;

/// All errors produced by the engine. `Debug` is delegated to `Display` so error reports read as
/// a single line instead of a derive-generated struct dump.
#[derive(Error)]
pub enum OcflError {
    #[error("Object {object_id} is corrupt: {message}")]
    CorruptObject { object_id: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Unsupported OCFL spec version: {0}")]
    UnsupportedSpec(String),

    #[error("Inventory is not valid: {0:?}")]
    InventoryStructure(Vec<StructuralViolation>),

    #[error("Inventory JSON contains an unrecognized field: {0}")]
    UnrecognizedField(String),

    #[error("Inventory sidecar for {object_id} does not match the inventory: {message}")]
    SidecarMismatch { object_id: String, message: String },

    #[error("Digest mismatch at {path}: expected {algorithm} digest {expected}, computed {computed}")]
    DigestMismatch {
        path: String,
        algorithm: String,
        expected: String,
        computed: String,
    },

    #[error("Digest for {path} changed between inventories for algorithm {algorithm}")]
    DigestChanged { path: String, algorithm: String },

    #[error("The staged state is identical to the current head version")]
    VersionUnchanged,

    #[error("Version number cannot be incremented: padding width {width} exhausted")]
    PaddingExhausted { width: u32 },

    #[error("Failed to acquire lock on object {0} at {1}")]
    LockAcquire(String, String),

    #[error("Commit failed (dirty={dirty}): {source}")]
    Commit { dirty: bool, source: Box<OcflError> },

    #[error("File already exists at {0}. Use the force option if you wish to overwrite it.")]
    AlreadyExists(String),

    #[error("Validation result limit reached ({0} {1})")]
    ResultCapped(usize, &'static str),

    #[error("{0}")]
    Io(io::Error),

    #[error("{0}")]
    Wrapped(Box<dyn error::Error + Send + Sync>),
}

/// Constructs an `OcflError::NotFound` error
pub fn not_found(object_id: &str, version_num: Option<VersionNum>) -> OcflError {
    match version_num {
        Some(version) => OcflError::NotFound(format!("Object {} version {}", object_id, version)),
        None => OcflError::NotFound(format!("Object {}", object_id)),
    }
}

impl OcflError {
    /// Wraps this error, marking the underlying commit as dirty, meaning that the object's
    /// on-disk state may have been partially written and should be treated as quarantined.
    pub fn into_dirty_commit(self) -> OcflError {
        OcflError::Commit {
            dirty: true,
            source: Box::new(self),
        }
    }

    /// Wraps this error without marking the commit dirty -- nothing was written yet.
    pub fn into_clean_commit(self) -> OcflError {
        OcflError::Commit {
            dirty: false,
            source: Box::new(self),
        }
    }
}

impl Debug for OcflError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<io::Error> for OcflError {
    fn from(e: io::Error) -> Self {
        OcflError::Io(e)
    }
}

impl From<serde_json::Error> for OcflError {
    fn from(e: serde_json::Error) -> Self {
        OcflError::Wrapped(Box::new(e))
    }
}

impl From<walkdir::Error> for OcflError {
    fn from(e: walkdir::Error) -> Self {
        OcflError::Wrapped(Box::new(e))
    }
}
