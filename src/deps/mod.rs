//! Dependency fetching.
//!
//! Each dependency type has a strategy implementing [`Fetch`]:
//!
//! - **git** - clone with submodules, pin to a revision, move to a work branch
//! - **raw** - download a single file over HTTP
//! - **docker** - container images (acknowledged, not pulled yet)
//!
//! The [`Orchestrator`] resolves every manifest entry to its strategy and runs
//! them in order under a [`FailurePolicy`].

mod container;
mod fetch;
mod git;
mod raw;
mod strategy;

pub use container::ContainerStrategy;
pub use fetch::{
    FailurePolicy, FetchOptions, FetchRecord, FetchReport, Orchestrator, PlannedFetch, plan,
};
pub use git::{GitStrategy, WORK_BRANCH};
pub use raw::{Downloader, HttpDownloader, RawStrategy};
pub use strategy::{Fetch, FetchContext, FetchOutcome, Strategy};
