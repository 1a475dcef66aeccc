//! Library-wide defaults for the commit engine and validator (§4.10 of `SPEC_FULL.md`). This is
//! not a file format -- there is no on-disk config file to parse, that belongs to a CLI layer
//! outside this crate's scope. Callers build a `RepoConfig` in code and thread it through a
//! `CommitEngine`/`Validator` however suits their application.

use crate::ocfl::validate::ValidationOptions;

/// Defaults applied to every commit made through a `CommitEngine`, absent a per-request override.
/// Grounded on the teacher's `CommitMeta` builder shape. Consumed by `CommitEngine::new_request`,
/// which seeds a fresh `CommitRequest`'s `padding_width`/`concurrency` from here; a `CommitRequest`
/// built directly via `CommitRequest::new` does not see these defaults.
///
/// There is no `digest_algorithm` default here: a `Stage`'s digest algorithm must match how the
/// caller actually hashed its staged content, so the engine can never substitute a configured
/// default for it without risking a digest/content mismatch. Callers pick the algorithm when they
/// build their `Stage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitConfig {
    /// Zero-padding width used for a brand-new object's version numbers (§9 Open Question 2:
    /// this crate fixes the default at 0, i.e. unpadded `v1`, `v2`, ...).
    pub padding_width: u32,
    /// Upper bound on concurrent content transfers per commit.
    pub worker_count: usize,
}

impl CommitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding_width(mut self, width: u32) -> Self {
        self.padding_width = width;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            padding_width: 0,
            worker_count: num_cpus::get().max(1),
        }
    }
}

/// Defaults applied to a `Validator`, absent an explicit `ValidationOptions` override. A thin
/// wrapper so `RepoConfig` has a named slot for validation the same way it does for commits;
/// the real caps live on `ValidationOptions` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    pub options: ValidationOptions,
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_errors(mut self, max_errors: i32) -> Self {
        self.options.max_errors = max_errors;
        self
    }

    pub fn with_max_warnings(mut self, max_warnings: i32) -> Self {
        self.options.max_warnings = max_warnings;
        self
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            options: ValidationOptions::default(),
        }
    }
}

/// Top-level library defaults for one repository: how new commits are shaped, and how validation
/// is capped. Neither half is a file format -- both are in-memory builders a caller constructs
/// once and reuses across every `CommitEngine`/`Validator` it opens against the same storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub commit: CommitConfig,
    pub validation: ValidationConfig,
}

impl RepoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, commit: CommitConfig) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            commit: CommitConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}
