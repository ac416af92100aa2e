//! Configuration file handling for courier.
//!
//! This crate loads `.courier.toml` files, merges them, and resolves them
//! into a [`BuildConfig`]: the read-only configuration value every publish
//! target receives during a run.
//!
//! # Example
//!
//! ```
//! use courier_config::{BuildConfig, load_config};
//! use std::path::Path;
//!
//! // Load config from a directory (looks for .courier.toml)
//! let config = load_config(Path::new(".")).expect("load config");
//!
//! let build = BuildConfig::resolve(Path::new("/project"), &config);
//! assert!(build.snapshot_dir.ends_with("publish-dry-run"));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".courier.toml";

/// Default build output directory, relative to the working directory
pub const DEFAULT_OUT_DIR: &str = "out";

/// Snapshot root directory name inside the build output tree
pub const SNAPSHOT_DIR_NAME: &str = "publish-dry-run";

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Contents of a `.courier.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Build output tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    /// Snapshot root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot_dir: Option<PathBuf>,
    /// Default publish-target list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publishers: Option<Vec<String>>,
    /// Make collaborator settings
    #[serde(default)]
    make: MakeConfig,
    /// Per-target option tables, keyed by target name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    targets: BTreeMap<String, toml::Table>,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Build output tree, relative to the working directory unless absolute.
    pub fn out_dir(&self) -> Option<&Path> {
        self.out_dir.as_deref()
    }

    /// Snapshot root override.
    pub fn snapshot_dir(&self) -> Option<&Path> {
        self.snapshot_dir.as_deref()
    }

    /// Configured publish-target names; empty when none are configured.
    pub fn publishers(&self) -> &[String] {
        self.publishers.as_deref().unwrap_or_default()
    }

    /// Make command; empty when not configured.
    pub fn make_command(&self) -> &[String] {
        &self.make.command
    }

    /// Options table for one target, if configured.
    pub fn target_options(&self, name: &str) -> Option<&toml::Table> {
        self.targets.get(name)
    }

    /// Set the publish-target list; an empty list means no targets.
    pub fn set_publishers(&mut self, publishers: Vec<String>) {
        self.publishers = Some(publishers);
    }

    /// Set the make command and its arguments.
    pub fn set_make_command(&mut self, command: Vec<String>) {
        self.make.command = command;
    }

    /// Override the snapshot root.
    pub fn set_snapshot_dir(&mut self, dir: PathBuf) {
        self.snapshot_dir = Some(dir);
    }

    /// Set (or replace) the options table for one target.
    pub fn set_target_options(&mut self, name: &str, options: toml::Table) {
        self.targets.insert(name.to_string(), options);
    }

    /// Merge this config with another (other takes precedence)
    pub fn merge(&self, other: &Config) -> Config {
        let mut targets = self.targets.clone();
        for (name, options) in &other.targets {
            targets.insert(name.clone(), options.clone());
        }

        Config {
            out_dir: other.out_dir.as_ref().or(self.out_dir.as_ref()).cloned(),
            snapshot_dir: other
                .snapshot_dir
                .as_ref()
                .or(self.snapshot_dir.as_ref())
                .cloned(),
            publishers: other
                .publishers
                .as_ref()
                .or(self.publishers.as_ref())
                .cloned(),
            make: MakeConfig {
                command: if other.make.command.is_empty() {
                    self.make.command.clone()
                } else {
                    other.make.command.clone()
                },
            },
            targets,
        }
    }
}

/// Make collaborator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MakeConfig {
    /// Program and arguments; stdout must be a JSON array of artifact sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// The resolved configuration handed to every publish target.
///
/// Built once per run and shared read-only; the dispatcher only ever
/// derives a new value from it (see [`BuildConfig::with_publishers`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildConfig {
    /// Working directory of the run
    pub dir: PathBuf,
    /// Absolute build output tree
    pub out_dir: PathBuf,
    /// Absolute snapshot root
    pub snapshot_dir: PathBuf,
    /// Publish-target names; after resolution, the final dispatch order
    pub publishers: Vec<String>,
    /// Make collaborator command
    pub make_command: Vec<String>,
    /// Per-target option tables
    pub targets: BTreeMap<String, toml::Table>,
}

impl BuildConfig {
    /// Resolve a loaded config against a working directory.
    pub fn resolve(dir: &Path, config: &Config) -> Self {
        let out_dir = resolve_dir(dir, config.out_dir().unwrap_or(Path::new(DEFAULT_OUT_DIR)));
        let snapshot_dir = match config.snapshot_dir() {
            Some(path) => resolve_dir(dir, path),
            None => out_dir.join(SNAPSHOT_DIR_NAME),
        };

        Self {
            dir: dir.to_path_buf(),
            out_dir,
            snapshot_dir,
            publishers: config.publishers().to_vec(),
            make_command: config.make_command().to_vec(),
            targets: config.targets.clone(),
        }
    }

    /// Options for one target; an empty table when none are configured.
    pub fn target_options(&self, name: &str) -> toml::Table {
        self.targets.get(name).cloned().unwrap_or_default()
    }

    /// Copy of this config with the final, resolved target-name list injected.
    pub fn with_publishers(&self, publishers: Vec<String>) -> Self {
        Self {
            publishers,
            ..self.clone()
        }
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_dir(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load configuration from a directory
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_from_file(&config_path(dir))
}

/// Load configuration from a specific file path
pub fn load_config_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Find configuration file by walking up the directory tree
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let config_file = current.join(CONFIG_FILE);
        if config_file.exists() {
            return Some(config_file);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}
