//! Snapshot store for courier dry-run publishing.
//!
//! A dry run persists make output so that publishing can happen later,
//! possibly on another machine. The layout under the snapshot root is:
//!
//! ```text
//! <snapshot root>/
//!   <record>/          one directory per publish group
//!     0000.json        one file per artifact set, in write order
//!     0001.json
//! ```
//!
//! Record names are derived from a SHA-256 over the serialized artifact
//! sets plus a per-persist salt, so records written by separate runs never
//! collide when a caller merges them under one root.
//!
//! Records are staged in a hidden sibling directory and renamed into place
//! once complete; hidden entries are ignored when loading, so an interrupted
//! persist never shows up as a truncated group.
//!
//! # Example
//!
//! ```
//! use courier_snapshot::SnapshotStore;
//! use courier_types::{ArtifactSet, PublishGroup};
//! use std::path::PathBuf;
//!
//! let td = tempfile::tempdir().expect("tempdir");
//! let mut store = SnapshotStore::new(td.path().join("publish-dry-run"));
//!
//! let group = PublishGroup::new(vec![ArtifactSet::new(
//!     vec![PathBuf::from("out/make/app.zip")],
//!     "linux",
//!     "x64",
//! )]);
//! store.persist(&group).expect("persist");
//!
//! let groups = store.load_all().expect("load");
//! assert_eq!(groups, vec![group]);
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use courier_types::{ArtifactSet, PublishGroup};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Extension of artifact-set files inside a record
pub const RECORD_FILE_EXT: &str = "json";

/// Prefix of in-progress record directories
pub const STAGING_PREFIX: &str = ".staging-";

/// Length of the hex record name
pub const RECORD_NAME_LEN: usize = 16;

/// Snapshot-specific failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A record file could not be read or parsed
    #[error("snapshot record file {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// A record directory holds no artifact-set files
    #[error("snapshot record {} contains no artifact sets", path.display())]
    EmptyRecord { path: PathBuf },

    /// Clearing the root would delete a protected directory
    #[error(
        "refusing to use {} as snapshot root: it contains {}",
        root.display(),
        protected.display()
    )]
    UnsafeRoot { root: PathBuf, protected: PathBuf },
}

/// Summary of one persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Directory name of the record
    pub name: String,
    /// Number of artifact sets in the record
    pub artifact_sets: usize,
    /// "platform-arch" labels present in the record
    pub platforms: Vec<String>,
}

/// Filesystem-backed snapshot store rooted at one directory.
///
/// One store value corresponds to one run: the first [`persist`] clears the
/// root, later persists in the same run accumulate next to it. The root is
/// assumed to have a single writer at a time.
///
/// Paths registered with [`protect`] must never end up inside the root;
/// clearing is refused when they would.
///
/// [`persist`]: SnapshotStore::persist
/// [`protect`]: SnapshotStore::protect
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    protected: Vec<PathBuf>,
    cleared: bool,
    persisted: u32,
}

impl SnapshotStore {
    /// Create a store for the given snapshot root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            protected: Vec::new(),
            cleared: false,
            persisted: 0,
        }
    }

    /// Refuse to clear a root that equals or contains `path`.
    pub fn protect(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected.push(path.into());
        self
    }

    /// Check that clearing the root cannot remove a protected path.
    pub fn check_root(&self) -> Result<()> {
        let root = normalize(&self.root);
        for path in &self.protected {
            if normalize(path).starts_with(&root) {
                return Err(SnapshotError::UnsafeRoot {
                    root: self.root.clone(),
                    protected: path.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get the snapshot root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the snapshot root exists
    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    /// Path of a record directory
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Remove the snapshot root and everything under it
    pub fn clear(&self) -> Result<()> {
        self.check_root()?;
        if self.root.exists() {
            fs::remove_dir_all(&self.root).with_context(|| {
                format!("failed to clear snapshot root {}", self.root.display())
            })?;
        }
        Ok(())
    }

    /// Persist a publish group as a new record and return the record name.
    ///
    /// The first call on a store clears the snapshot root.
    pub fn persist(&mut self, group: &PublishGroup) -> Result<String> {
        if group.is_empty() {
            bail!("refusing to persist an empty publish group");
        }

        if !self.cleared {
            self.clear()?;
            self.cleared = true;
        }

        fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create snapshot root {}", self.root.display())
        })?;

        let mut files = Vec::with_capacity(group.len());
        for set in group {
            let mut json =
                serde_json::to_vec_pretty(set).context("failed to serialize artifact set")?;
            json.push(b'\n');
            files.push(json);
        }

        let name = record_name(&files, &self.salt());
        let staging = self.root.join(format!("{STAGING_PREFIX}{name}"));
        let final_path = self.record_path(&name);

        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("failed to remove stale staging dir {}", staging.display()))?;
        }
        fs::create_dir(&staging)
            .with_context(|| format!("failed to create staging dir {}", staging.display()))?;

        for (idx, content) in files.iter().enumerate() {
            let path = staging.join(record_file_name(idx));
            fs::write(&path, content)
                .with_context(|| format!("failed to write snapshot file {}", path.display()))?;
        }

        if final_path.exists() {
            bail!("snapshot record {} already exists", final_path.display());
        }
        fs::rename(&staging, &final_path).with_context(|| {
            format!("failed to rename snapshot record to {}", final_path.display())
        })?;

        self.persisted += 1;
        Ok(name)
    }

    /// Names of every complete record, sorted.
    pub fn record_names(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("failed to read snapshot root {}", self.root.display()))?
        {
            let entry = entry.with_context(|| {
                format!("failed to read entry in {}", self.root.display())
            })?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().into_string().map_err(|_| SnapshotError::Corrupt {
                path: entry.path(),
                message: "record name is not valid UTF-8".to_string(),
            })?;
            if !name.starts_with('.') {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Load a single record back into a publish group
    pub fn load_record(&self, name: &str) -> Result<PublishGroup> {
        let dir = self.record_path(name);

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to read snapshot record {}", dir.display()))?
        {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            let is_record_file = path
                .extension()
                .is_some_and(|ext| ext == RECORD_FILE_EXT);
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if is_record_file && !hidden {
                let index = record_file_index(&path).ok_or_else(|| SnapshotError::Corrupt {
                    path: path.clone(),
                    message: "file name is not a record index".to_string(),
                })?;
                files.push((index, path));
            }
        }

        if files.is_empty() {
            return Err(SnapshotError::EmptyRecord { path: dir }.into());
        }
        files.sort();

        let mut sets = Vec::with_capacity(files.len());
        for (_, path) in files {
            let content = fs::read(&path).map_err(|e| SnapshotError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let set: ArtifactSet =
                serde_json::from_slice(&content).map_err(|e| SnapshotError::Corrupt {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            sets.push(set);
        }

        Ok(PublishGroup::new(sets))
    }

    /// Load every record under the root, one publish group per record.
    ///
    /// Any unreadable record aborts the whole load.
    pub fn load_all(&self) -> Result<Vec<PublishGroup>> {
        self.record_names()?
            .iter()
            .map(|name| self.load_record(name))
            .collect()
    }

    /// Summaries of every record under the root
    pub fn list_records(&self) -> Result<Vec<RecordSummary>> {
        let mut out = Vec::new();
        for name in self.record_names()? {
            let group = self.load_record(&name)?;
            out.push(RecordSummary {
                artifact_sets: group.len(),
                platforms: group.target_labels(),
                name,
            });
        }
        Ok(out)
    }

    fn salt(&self) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{nanos}:{}:{}", std::process::id(), self.persisted)
    }
}

/// File name for the artifact set at `index` within a record
pub fn record_file_name(index: usize) -> String {
    format!("{index:04}.{RECORD_FILE_EXT}")
}

/// Write index encoded in a record file name (`0042.json` is 42).
fn record_file_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Resolve `.` and `..` lexically, then canonicalize the longest existing
/// prefix so symlinked and missing paths compare consistently.
fn normalize(path: &Path) -> PathBuf {
    let mut lexical = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical.clone(),
        }
    }
}

/// Compute a record name from serialized artifact sets and a salt.
pub fn record_name(files: &[Vec<u8>], salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"\n");
    for content in files {
        hasher.update(content);
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..RECORD_NAME_LEN].to_string()
}
