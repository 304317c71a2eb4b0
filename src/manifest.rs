//! Manifest discovery, parsing and merging.
//!
//! A manifest is a JSON object mapping dependency names to descriptors. The
//! `--config_file` path may point at one manifest or at a directory whose
//! `*.json` children are loaded in file-name order. Later manifests override
//! earlier ones entry by entry.

use crate::config::Dependency;
use crate::error::ManifestError;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default manifest location, relative to the invocation directory.
pub const DEFAULT_MANIFEST_PATH: &str = "repo-manifest";

/// Merged dependency set, iterated in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Manifest {
    entries: Vec<(String, Dependency)>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// Insert or overwrite `name`. An overwritten entry keeps its position.
    pub fn insert(&mut self, name: String, dep: Dependency) -> Option<Dependency> {
        if let Some(&pos) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[pos].1, dep));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, dep));
        None
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dependency)> {
        self.entries.iter().map(|(name, dep)| (name.as_str(), dep))
    }

    /// Merge every entry of `other` into `self`, later entries winning.
    pub fn merge(&mut self, other: Manifest) {
        for (name, dep) in other.entries {
            if let Some(previous) = self.insert(name.clone(), dep) {
                debug!("Overriding dependency {} (was {})", name, previous.uri);
            }
        }
    }

    /// Parse a single manifest document. `path` is only used for messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let Value::Object(map) = value else {
            return Err(ManifestError::NotAnObject {
                path: path.to_path_buf(),
            });
        };

        let mut manifest = Self::default();
        for (name, raw) in map {
            let dep: Dependency =
                serde_json::from_value(raw).map_err(|source| ManifestError::Descriptor {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    source,
                })?;
            manifest.insert(name, dep);
        }
        Ok(manifest)
    }

    /// Read and merge `paths` in order. Nothing is returned unless every
    /// file parses.
    pub fn load(paths: &[PathBuf]) -> Result<Self, ManifestError> {
        let mut merged = Self::default();
        for path in paths {
            debug!("Parsing manifest {}", path.display());
            let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
                path: path.clone(),
                source,
            })?;
            merged.merge(Self::parse(&content, path)?);
        }
        Ok(merged)
    }

    /// Discover the manifests under `path` and load them.
    pub fn load_path(path: &Path) -> Result<Self, ManifestError> {
        let files = discover(path)?;
        Self::load(&files)
    }
}

/// List the manifest files named by `path`.
///
/// A regular file is returned as is. For a directory, direct children with a
/// `.json` extension are returned sorted by name; subdirectories are not
/// searched.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ManifestError::Missing {
            path: path.to_path_buf(),
        },
        _ => ManifestError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        debug!("Parsing a single manifest file {}", path.display());
        return Ok(vec![path.to_path_buf()]);
    }

    debug!("Parsing directory of manifest files {}", path.display());
    let read_err = |source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(read_err)? {
        let candidate = entry.map_err(read_err)?.path();
        if candidate.is_dir() {
            debug!("Skipping subdirectory {}", candidate.display());
            continue;
        }
        if candidate.extension().and_then(|e| e.to_str()) != Some("json") {
            debug!("Ignoring {}", candidate.display());
            continue;
        }
        files.push(candidate);
    }
    files.sort();
    Ok(files)
}
