//! Abstraction over reading, writing, and listing files on a backend store. `/` _must_ be used
//! as the path separator, regardless of the backend's native separator.

use std::borrow::Cow;
use std::io::{Read, Write};

use crate::ocfl::error::Result;

pub use self::local::LocalStorage;
pub use self::memory::MemoryStorage;

mod local;
mod memory;

/// A capability over an opaque backend byte store. Implementations must reject any path that is
/// absolute, empty, or contains a `.`/`..` segment before issuing any I/O.
pub trait Storage {
    /// Opens the file at `path` for reading. Returns `OcflError::NotFound` if it does not exist.
    fn read(&self, path: &str, sink: &mut dyn Write) -> Result<()>;

    /// Lists the immediate contents of the directory at `path`. `.` refers to the root. If the
    /// directory does not exist, or is empty, `OcflError::NotFound` is returned -- callers that
    /// want to treat a missing directory as empty should match on that case explicitly, mirroring
    /// the behavior of a key-prefix listing over a flat object store.
    fn list(&self, path: &str) -> Result<Vec<Listing>>;

    /// Lists every leaf (file) entry reachable beneath `path`, recursively.
    fn list_recursive(&self, path: &str) -> Result<Vec<Listing>>;

    /// Writes `source` to `path`, creating any intermediate directories. Overwrites an existing
    /// file. Returns the number of bytes written.
    fn write(&self, path: &str, source: &mut dyn Read) -> Result<u64>;

    /// Removes the file at `path`. Not an error if the file does not exist.
    fn remove(&self, path: &str) -> Result<()>;

    /// Removes every file beneath `path`, and `path` itself if it is a file. Not an error if
    /// nothing exists there. Implementations should also clean up any now-empty directories.
    fn remove_all(&self, path: &str) -> Result<()>;

    /// True if this store can perform a same-store copy without routing bytes through the
    /// caller. Storage::copy_within must not be called unless this returns true.
    fn supports_copy(&self) -> bool {
        false
    }

    /// A same-store, server-side copy from `src` to `dst`. Only implemented by stores that
    /// return `true` from `supports_copy`.
    fn copy_within(&self, _src: &str, _dst: &str) -> Result<()> {
        Err(crate::ocfl::error::OcflError::IllegalState(
            "This storage backend does not support server-side copies".to_string(),
        ))
    }
}

/// An entry encountered while listing a directory
#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub enum Listing<'a> {
    File(Cow<'a, str>),
    Directory(Cow<'a, str>),
    Other(Cow<'a, str>),
}

impl<'a> Listing<'a> {
    pub fn file(path: impl Into<Cow<'a, str>>) -> Self {
        Listing::File(path.into())
    }

    pub fn dir(path: impl Into<Cow<'a, str>>) -> Self {
        Listing::Directory(path.into())
    }

    pub fn path(&self) -> &str {
        match self {
            Listing::File(path) => path,
            Listing::Directory(path) => path,
            Listing::Other(path) => path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Listing::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Listing::Directory(_))
    }
}

/// Rejects paths that are absolute, empty, `.`, or contain `.`/`..` segments. `.` itself is
/// accepted as "the root" by callers that special-case it before validating.
pub fn validate_relative_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(crate::ocfl::error::OcflError::IllegalArgument(
            "Path must not be empty".to_string(),
        ));
    }

    if path.starts_with('/') {
        return Err(crate::ocfl::error::OcflError::IllegalArgument(format!(
            "Path must be relative: {}",
            path
        )));
    }

    if path.split('/').any(|part| part == "." || part == "..") {
        return Err(crate::ocfl::error::OcflError::IllegalArgument(format!(
            "Path may not contain '.' or '..' segments: {}",
            path
        )));
    }

    Ok(())
}
