//! Error kinds for manifest loading and dependency fetching.
//!
//! Manifest errors are always fatal and surface before any fetch begins.
//! Fetch errors carry the dependency name and the stage that failed so the
//! orchestrator can report them, and the failure policy decides whether they
//! end the run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A manifest could not be located, read, or understood.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest path {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("manifest {} must be a JSON object keyed by dependency name", path.display())]
    NotAnObject { path: PathBuf },

    #[error("invalid dependency '{name}' in {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        name: String,
        source: serde_json::Error,
    },
}

/// Step of the git strategy that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStage {
    Clone,
    Submodules,
    Checkout,
    Branch,
    Verify,
}

impl fmt::Display for GitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Clone => "clone",
            Self::Submodules => "submodule update",
            Self::Checkout => "checkout",
            Self::Branch => "branch creation",
            Self::Verify => "verification",
        };
        f.write_str(stage)
    }
}

/// Step of the raw strategy that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStage {
    Prepare,
    Download,
    Write,
}

impl fmt::Display for RawStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Prepare => "destination setup",
            Self::Download => "download",
            Self::Write => "write",
        };
        f.write_str(stage)
    }
}

/// A single dependency could not be dispatched or fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("dependency '{name}' has unknown type '{kind}' (expected git, raw or docker)")]
    UnknownType { name: String, kind: String },

    #[error("dependency '{name}' is not fetchable: {detail}")]
    InvalidDescriptor { name: String, detail: String },

    #[error("git {stage} failed for '{name}': {source}")]
    Git {
        name: String,
        stage: GitStage,
        source: git2::Error,
    },

    #[error("existing checkout of '{name}' at {} does not match the manifest: {detail}", path.display())]
    Mismatch {
        name: String,
        path: PathBuf,
        detail: String,
    },

    #[error("raw {stage} failed for '{name}': {message}")]
    Raw {
        name: String,
        stage: RawStage,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn git(name: &str, stage: GitStage, source: git2::Error) -> Self {
        Self::Git {
            name: name.to_string(),
            stage,
            source,
        }
    }

    pub(crate) fn raw(name: &str, stage: RawStage, message: impl fmt::Display) -> Self {
        Self::Raw {
            name: name.to_string(),
            stage,
            message: message.to_string(),
        }
    }

    /// Name of the dependency this error belongs to.
    pub fn dependency(&self) -> &str {
        match self {
            Self::UnknownType { name, .. }
            | Self::InvalidDescriptor { name, .. }
            | Self::Git { name, .. }
            | Self::Mismatch { name, .. }
            | Self::Raw { name, .. } => name,
        }
    }
}
