//! Strategy registry: maps a declared dependency type to the code that
//! fetches it.

use super::container::ContainerStrategy;
use super::fetch::FetchOptions;
use super::git::GitStrategy;
use super::raw::{Downloader, RawStrategy};
use crate::config::{Dependency, DependencyKind};
use crate::error::FetchError;
use std::path::{Path, PathBuf};

/// Result of a successful strategy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Work was done: a clone, a download.
    Fetched,
    /// The destination already existed and was left untouched.
    AlreadyPresent,
    /// The dependency type is recognised but fetching it is not supported yet.
    NotImplemented,
}

/// Everything a strategy needs besides the descriptor itself.
///
/// `root` is the absolute directory relative destinations resolve against.
/// Strategies never change the process working directory.
pub struct FetchContext<'a> {
    pub root: PathBuf,
    pub options: FetchOptions,
    pub downloader: &'a dyn Downloader,
}

impl<'a> FetchContext<'a> {
    pub fn new(root: impl Into<PathBuf>, options: FetchOptions, downloader: &'a dyn Downloader) -> Self {
        Self {
            root: root.into(),
            options,
            downloader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub trait Fetch {
    fn fetch(
        &self,
        name: &str,
        dep: &Dependency,
        ctx: &FetchContext<'_>,
    ) -> Result<FetchOutcome, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Git(GitStrategy),
    Raw(RawStrategy),
    Container(ContainerStrategy),
}

impl Strategy {
    pub fn for_kind(kind: DependencyKind) -> Self {
        match kind {
            DependencyKind::Git => Self::Git(GitStrategy),
            DependencyKind::Raw => Self::Raw(RawStrategy),
            DependencyKind::Container => Self::Container(ContainerStrategy),
        }
    }

    /// Look up the strategy for a descriptor's declared type.
    pub fn resolve(name: &str, dep: &Dependency) -> Result<Self, FetchError> {
        dep.kind
            .parse::<DependencyKind>()
            .map(Self::for_kind)
            .map_err(|kind| FetchError::UnknownType {
                name: name.to_string(),
                kind,
            })
    }

    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::Git(_) => DependencyKind::Git,
            Self::Raw(_) => DependencyKind::Raw,
            Self::Container(_) => DependencyKind::Container,
        }
    }

    /// Where this dependency would land on disk, if anywhere.
    pub fn destination(&self, dep: &Dependency, root: &Path) -> Option<PathBuf> {
        match self {
            Self::Git(_) => dep.git_dest(root),
            Self::Raw(_) => dep.raw_file_name().map(|file| dep.raw_dir(root).join(file)),
            Self::Container(_) => None,
        }
    }
}

impl Fetch for Strategy {
    fn fetch(
        &self,
        name: &str,
        dep: &Dependency,
        ctx: &FetchContext<'_>,
    ) -> Result<FetchOutcome, FetchError> {
        match self {
            Self::Git(s) => s.fetch(name, dep, ctx),
            Self::Raw(s) => s.fetch(name, dep, ctx),
            Self::Container(s) => s.fetch(name, dep, ctx),
        }
    }
}
