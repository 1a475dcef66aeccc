//! The core OCFL object engine: path and version primitives, the digest registry, the
//! inventory codec, the abstract file system, the commit pipeline, and the full validator.

pub use self::bimap::DigestMap;
pub use self::commit::{CommitEngine, CommitRequest, ContentSource, FixitySource, Stage};
pub use self::digest::{DigestAlgorithm, HexDigest};
pub use self::error::{OcflError, Result};
pub use self::inventory::{Inventory, User, Version};
pub use self::layout::{LayoutExtension, OcflLayout};
pub use self::lock::{LockManager, ObjectLock};
pub use self::object::{Diff, FileDetails, Object, ObjectVersionDetails, VersionDetails};
pub use self::path::{
    ContentPath, InventoryPath, LogicalPath, SpecVersion, VersionNum, VersionRef,
};
pub use self::pipeline::{CancellationToken, Pipeline, PipelineResult};
pub use self::validate::{
    ErrorCode, ValidationError, ValidationOptions, ValidationResult, ValidationWarning, Validator,
    WarnCode,
};

mod bimap;
mod commit;
pub mod consts;
mod digest;
mod error;
pub mod fs;
mod inventory;
mod layout;
mod lock;
mod object;
mod path;
mod paths;
mod pipeline;
mod util;
pub mod validate;
