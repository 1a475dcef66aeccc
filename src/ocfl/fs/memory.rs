use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Mutex;

use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs::{validate_relative_path, Listing, Storage};

/// An in-memory `Storage` implementation backed by a flat map of path to bytes. Useful for
/// embedding the engine without touching disk, and for exercising the commit/validate pipelines
/// in tests without the overhead of real file I/O.
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
        }
    }

    fn normalize(path: &str) -> Result<String> {
        if path == "." {
            return Ok(String::new());
        }
        validate_relative_path(path)?;
        Ok(path.trim_end_matches('/').to_string())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str, sink: &mut dyn Write) -> Result<()> {
        let key = Self::normalize(path)?;
        let files = self.files.lock().unwrap();
        match files.get(&key) {
            Some(bytes) => {
                sink.write_all(bytes)?;
                Ok(())
            }
            None => Err(OcflError::NotFound(path.to_string())),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<Listing>> {
        let prefix = Self::normalize(path)?;
        let files = self.files.lock().unwrap();

        let mut seen_dirs = std::collections::BTreeSet::new();
        let mut listing = Vec::new();

        for key in files.keys() {
            let relative = match strip_prefix(key, &prefix) {
                Some(r) => r,
                None => continue,
            };
            if relative.is_empty() {
                continue;
            }

            match relative.find('/') {
                Some(idx) => {
                    let dir_name = &relative[..idx];
                    if seen_dirs.insert(dir_name.to_string()) {
                        listing.push(Listing::dir(dir_name.to_string()));
                    }
                }
                None => listing.push(Listing::file(relative.to_string())),
            }
        }

        if listing.is_empty() && path != "." {
            return Err(OcflError::NotFound(path.to_string()));
        }

        Ok(listing)
    }

    fn list_recursive(&self, path: &str) -> Result<Vec<Listing>> {
        let prefix = Self::normalize(path)?;
        let files = self.files.lock().unwrap();

        let mut listing = Vec::new();
        let mut found_any = false;

        for key in files.keys() {
            if let Some(relative) = strip_prefix(key, &prefix) {
                found_any = true;
                if !relative.is_empty() {
                    listing.push(Listing::file(relative.to_string()));
                }
            }
        }

        if !found_any {
            return Err(OcflError::NotFound(path.to_string()));
        }

        Ok(listing)
    }

    fn write(&self, path: &str, source: &mut dyn Read) -> Result<u64> {
        let key = Self::normalize(path)?;
        let mut bytes = Vec::new();
        let written = source.read_to_end(&mut bytes)? as u64;
        self.files.lock().unwrap().insert(key, bytes);
        Ok(written)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let key = Self::normalize(path)?;
        self.files.lock().unwrap().remove(&key);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let prefix = Self::normalize(path)?;
        let mut files = self.files.lock().unwrap();
        let to_remove: Vec<String> = files
            .keys()
            .filter(|key| strip_prefix(key, &prefix).is_some())
            .cloned()
            .collect();
        for key in to_remove {
            files.remove(&key);
        }
        Ok(())
    }

    fn supports_copy(&self) -> bool {
        true
    }

    fn copy_within(&self, src: &str, dst: &str) -> Result<()> {
        let src_key = Self::normalize(src)?;
        let dst_key = Self::normalize(dst)?;
        let mut files = self.files.lock().unwrap();
        let bytes = files
            .get(&src_key)
            .ok_or_else(|| OcflError::NotFound(src.to_string()))?
            .clone();
        files.insert(dst_key, bytes);
        Ok(())
    }
}

fn strip_prefix<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(key);
    }
    if let Some(rest) = key.strip_prefix(prefix) {
        rest.strip_prefix('/')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::ocfl::fs::{MemoryStorage, Storage};

    #[test]
    fn write_then_read_round_trips() {
        let storage = MemoryStorage::new();
        storage.write("a/b/c.txt", &mut "hello".as_bytes()).unwrap();

        let mut out = Vec::new();
        storage.read("a/b/c.txt", &mut out).unwrap();
        assert_eq!(b"hello".to_vec(), out);
    }

    #[test]
    fn list_empty_root_is_an_empty_list() {
        let storage = MemoryStorage::new();
        assert!(storage.list(".").unwrap().is_empty());
    }

    #[test]
    fn list_top_level_groups_into_one_directory_entry() {
        let storage = MemoryStorage::new();
        storage.write("a/b/c.txt", &mut "x".as_bytes()).unwrap();
        storage.write("a/b/d.txt", &mut "y".as_bytes()).unwrap();
        storage.write("a/e.txt", &mut "z".as_bytes()).unwrap();

        let listing = storage.list("a").unwrap();
        assert_eq!(2, listing.len());
        assert!(listing.iter().any(|l| l.is_dir() && l.path() == "b"));
        assert!(listing.iter().any(|l| l.is_file() && l.path() == "e.txt"));
    }

    #[test]
    fn remove_all_deletes_every_descendant() {
        let storage = MemoryStorage::new();
        storage.write("a/b/c.txt", &mut "x".as_bytes()).unwrap();
        storage.write("a/b/d.txt", &mut "y".as_bytes()).unwrap();

        storage.remove_all("a").unwrap();

        let mut out = Vec::new();
        assert!(storage.read("a/b/c.txt", &mut out).is_err());
    }

    #[test]
    fn rejects_absolute_dotdot_and_empty_paths() {
        let storage = MemoryStorage::new();

        assert!(storage.write("/abs", &mut "x".as_bytes()).is_err());
        assert!(storage.write("../escape", &mut "x".as_bytes()).is_err());
        assert!(storage.write("./sneaky", &mut "x".as_bytes()).is_err());
        assert!(storage.write("", &mut "x".as_bytes()).is_err());
    }

    #[test]
    fn copy_within_duplicates_bytes() {
        let storage = MemoryStorage::new();
        storage.write("a.txt", &mut "hello".as_bytes()).unwrap();
        storage.copy_within("a.txt", "b.txt").unwrap();

        let mut out = Vec::new();
        storage.read("b.txt", &mut out).unwrap();
        assert_eq!(b"hello".to_vec(), out);
    }
}
