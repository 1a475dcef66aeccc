#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::TryFrom;
use std::io::{Cursor, Read};
use std::sync::Arc;

use ocflcore::ocfl::{
    CommitEngine, CommitRequest, ContentSource, DigestAlgorithm, DigestMap, HexDigest, Inventory,
    LogicalPath, OcflError, Result, Stage,
};

/// A `ContentSource` backed by an in-memory map of digest to bytes, built up one named file at a
/// time. Every integration test stages its fixture content through one of these rather than
/// touching a real file for bytes that only ever need to exist for the duration of a commit
/// request.
pub struct BytesSource {
    bytes: HashMap<HexDigest, Vec<u8>>,
}

impl BytesSource {
    pub fn new() -> Self {
        Self {
            bytes: HashMap::new(),
        }
    }

    pub fn with(mut self, content: &str) -> Self {
        self.bytes.insert(digest_of(content), content.as_bytes().to_vec());
        self
    }
}

impl ContentSource for BytesSource {
    fn open(&self, digest: &HexDigest) -> Result<Box<dyn Read>> {
        let bytes = self
            .bytes
            .get(digest)
            .ok_or_else(|| OcflError::NotFound(digest.to_string()))?
            .clone();
        Ok(Box::new(Cursor::new(bytes)))
    }
}

pub fn digest_of(content: &str) -> HexDigest {
    DigestAlgorithm::Sha512.hash_hex(&mut content.as_bytes()).unwrap()
}

/// Commits one version with exactly `files` (logical path -> content) as its complete state,
/// creating a new object at `object_root` if nothing is committed there yet.
pub fn commit_files<S>(
    engine: &CommitEngine<S>,
    object_root: &str,
    id: &str,
    files: &[(&str, &str)],
) -> Inventory
where
    S: ocflcore::ocfl::fs::Storage + Send + Sync + 'static,
{
    let mut state = DigestMap::new();
    let mut source = BytesSource::new();

    for (path, content) in files {
        state.insert(digest_of(content), LogicalPath::try_from(*path).unwrap());
        source = source.with(content);
    }

    let stage = Stage::new(DigestAlgorithm::Sha512, state, Arc::new(source));
    let request = CommitRequest::new(stage).with_id(id).with_message("test commit");

    engine.commit(object_root, request).unwrap()
}
