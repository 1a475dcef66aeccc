use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs::{validate_relative_path, Listing, Storage};
use crate::ocfl::util;

/// A `Storage` backend rooted at a directory on the local disk.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path == "." {
            return Ok(self.root.clone());
        }
        validate_relative_path(path)?;
        Ok(self.root.join(path))
    }
}

impl Storage for LocalStorage {
    fn read(&self, path: &str, sink: &mut dyn Write) -> Result<()> {
        let resolved = self.resolve(path)?;
        let mut file = File::open(&resolved).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OcflError::NotFound(path.to_string()),
            _ => OcflError::Io(e),
        })?;
        std::io::copy(&mut file, sink)?;
        Ok(())
    }

    fn list(&self, path: &str) -> Result<Vec<Listing>> {
        let resolved = self.resolve(path)?;

        let entries = match fs::read_dir(&resolved) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcflError::NotFound(path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                listing.push(Listing::dir(name));
            } else if file_type.is_file() {
                listing.push(Listing::file(name));
            } else {
                listing.push(Listing::Other(name.into()));
            }
        }

        if listing.is_empty() && path != "." {
            return Err(OcflError::NotFound(path.to_string()));
        }

        Ok(listing)
    }

    fn list_recursive(&self, path: &str) -> Result<Vec<Listing>> {
        let resolved = self.resolve(path)?;

        if !resolved.exists() {
            return Err(OcflError::NotFound(path.to_string()));
        }

        let mut listing = Vec::new();
        for entry in WalkDir::new(&resolved).min_depth(1) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&resolved)
                .unwrap()
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");

            if entry.file_type().is_file() {
                listing.push(Listing::file(relative));
            } else if entry.file_type().is_dir() {
                listing.push(Listing::dir(relative));
            }
        }

        Ok(listing)
    }

    fn write(&self, path: &str, source: &mut dyn Read) -> Result<u64> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&resolved)?;
        let written = std::io::copy(source, &mut file)?;
        file.flush()?;
        Ok(written)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        util::remove_file_ignore_not_found(&resolved)?;
        if let Some(parent) = resolved.parent() {
            let _ = util::clean_dirs_up(parent);
        }
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;

        match fs::metadata(&resolved) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&resolved)?,
            Ok(_) => fs::remove_file(&resolved)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = resolved.parent() {
            let _ = util::clean_dirs_up(parent);
        }

        Ok(())
    }

    fn supports_copy(&self) -> bool {
        true
    }

    fn copy_within(&self, src: &str, dst: &str) -> Result<()> {
        let src_resolved = self.resolve(src)?;
        let dst_resolved = self.resolve(dst)?;

        if let Some(parent) = dst_resolved.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::copy(&src_resolved, &dst_resolved)?;
        Ok(())
    }
}
