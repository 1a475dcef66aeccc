//! A storage-agnostic engine for reading, writing, and validating
//! [OCFL repositories](https://ocfl.io/).
//!
//! The engine is built around an abstract file system capability (`ocfl::fs::Storage`) so the
//! same object model, commit pipeline, and validator run unmodified over a local disk, an
//! in-memory tree, or any other hierarchical byte store a caller wires up.
//!
//! ```rust,no_run
//! use ocflcore::ocfl::fs::LocalStorage;
//! use ocflcore::ocfl::Object;
//!
//! let storage = LocalStorage::new("path/to/object/root");
//! let object = Object::open(storage, ".")?;
//! # Ok::<(), ocflcore::ocfl::OcflError>(())
//! ```

pub mod config;
pub mod ocfl;
