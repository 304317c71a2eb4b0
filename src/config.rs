use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Revision checked out when a git dependency does not name one.
pub const DEFAULT_GIT_VERSION: &str = "HEAD";

/// One entry of a manifest, as written by the user.
///
/// `kind` stays a plain string here; it is only turned into a
/// [`DependencyKind`] when the orchestrator looks up a strategy, so a manifest
/// with an unknown type still loads and the error names the dependency.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    pub version: Option<String>,
    pub dest: Option<String>,
    pub file: Option<String>,
}

impl Dependency {
    pub fn new(kind: &str, uri: &str) -> Self {
        Self {
            kind: kind.to_string(),
            uri: uri.to_string(),
            version: None,
            dest: None,
            file: None,
        }
    }

    /// Revision to check out for git dependencies.
    pub fn git_version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_GIT_VERSION)
    }

    /// Clone destination for git dependencies, relative to `root` unless `dest`
    /// is absolute. Without `dest` the last segment of the URI is used as is.
    pub fn git_dest(&self, root: &Path) -> Option<PathBuf> {
        match self.dest.as_deref() {
            Some(dest) => Some(root.join(dest)),
            None => self
                .uri
                .trim_end_matches(['/', '\\'])
                .rsplit(['/', '\\', ':'])
                .next()
                .filter(|seg| !seg.is_empty())
                .map(|seg| root.join(seg)),
        }
    }

    /// Directory a raw download is written into. Defaults to `root`.
    pub fn raw_dir(&self, root: &Path) -> PathBuf {
        match self.dest.as_deref() {
            Some(dest) => root.join(dest),
            None => root.to_path_buf(),
        }
    }

    /// File name of a raw download, from `file` or the last segment of the
    /// URI path. A URI without a path yields `None`.
    pub fn raw_file_name(&self) -> Option<String> {
        if let Some(file) = self.file.as_deref() {
            return (!file.is_empty()).then(|| file.to_string());
        }
        uri_path(&self.uri)
            .rsplit('/')
            .next()
            .filter(|seg| !seg.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Path component of `uri`, without scheme, authority, query or fragment.
fn uri_path(uri: &str) -> &str {
    let uri = uri.split(['?', '#']).next().unwrap_or_default();
    match uri.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |slash| &rest[slash..]),
        None => uri,
    }
}

/// The closed set of dependency types a manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Git,
    Raw,
    Container,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Raw => "raw",
            Self::Container => "docker",
        }
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "raw" => Ok(Self::Raw),
            "docker" | "container" => Ok(Self::Container),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
