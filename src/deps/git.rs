//! Git dependencies.
//!
//! A fetch clones the repository (submodules included, recursively), checks
//! out the requested revision and moves onto the local [`WORK_BRANCH`] so
//! later manual edits do not collide with the pinned revision.

use super::strategy::{Fetch, FetchContext, FetchOutcome};
use crate::config::Dependency;
use crate::error::{FetchError, GitStage};
use crate::ui;
use colored::*;
use git2::{Oid, Repository};
use std::path::Path;
use tracing::debug;

/// Local branch created on top of the checked out revision.
pub const WORK_BRANCH: &str = "repo-manager";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GitStrategy;

impl Fetch for GitStrategy {
    fn fetch(
        &self,
        name: &str,
        dep: &Dependency,
        ctx: &FetchContext<'_>,
    ) -> Result<FetchOutcome, FetchError> {
        let dest = dep
            .git_dest(ctx.root())
            .ok_or_else(|| FetchError::InvalidDescriptor {
                name: name.to_string(),
                detail: format!("cannot derive a destination from {}; set \"dest\"", dep.uri),
            })?;
        let version = dep.git_version();

        // An existing directory counts as fetched. Its contents are only
        // checked when asked to.
        if dest.is_dir() {
            if ctx.options.verify_existing {
                verify_checkout(name, &dep.uri, version, &dest)?;
            }
            ui::cached(name);
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let repo = clone_repo(name, &dep.uri, &dest)?;
        let oid = checkout_version(&repo, version)
            .map_err(|e| FetchError::git(name, GitStage::Checkout, e))?;
        create_work_branch(&repo, oid).map_err(|e| FetchError::git(name, GitStage::Branch, e))?;

        ui::fetched(
            name,
            &format!("{} @ {} ({})", dest.display(), version, short_hash(&oid.to_string())),
        );
        Ok(FetchOutcome::Fetched)
    }
}

fn clone_repo(name: &str, url: &str, dest: &Path) -> Result<Repository, FetchError> {
    let pb = ui::spinner(format!("Cloning {}...", name));
    debug!("git clone --recursive {} {}", url, dest.display());

    let repo = match Repository::clone(url, dest) {
        Ok(repo) => repo,
        Err(err) => {
            pb.finish_with_message(format!("{} Failed {}", "x".red(), name));
            return Err(FetchError::git(name, GitStage::Clone, err));
        }
    };

    pb.set_message(format!("Updating submodules of {}...", name));
    if let Err(err) = update_submodules(&repo) {
        pb.finish_with_message(format!("{} Failed {}", "x".red(), name));
        return Err(FetchError::git(name, GitStage::Submodules, err));
    }

    pb.finish_and_clear();
    Ok(repo)
}

fn update_submodules(repo: &Repository) -> Result<(), git2::Error> {
    for mut submodule in repo.submodules()? {
        debug!("Updating submodule {}", submodule.path().display());
        submodule.update(true, None)?;
        let nested = submodule.open()?;
        update_submodules(&nested)?;
    }
    Ok(())
}

/// Resolve `version` to a commit. Falls back to the remote-tracking branch
/// so that branch names other than the default one resolve after a clone.
fn resolve_version(repo: &Repository, version: &str) -> Result<Oid, git2::Error> {
    let object = match repo.revparse_single(version) {
        Ok(object) => object,
        Err(err) => match repo.revparse_single(&format!("origin/{}", version)) {
            Ok(object) => object,
            Err(_) => return Err(err),
        },
    };
    Ok(object.peel_to_commit()?.id())
}

fn checkout_version(repo: &Repository, version: &str) -> Result<Oid, git2::Error> {
    let oid = resolve_version(repo, version)?;
    let obj = repo.find_object(oid, None)?;
    let mut checkout_opts = git2::build::CheckoutBuilder::new();
    checkout_opts.force();
    repo.checkout_tree(&obj, Some(&mut checkout_opts))?;
    repo.set_head_detached(oid)?;
    debug!("Checked out {} ({})", version, oid);
    Ok(oid)
}

fn create_work_branch(repo: &Repository, oid: Oid) -> Result<(), git2::Error> {
    let commit = repo.find_commit(oid)?;
    let branch = repo.branch(WORK_BRANCH, &commit, false)?;
    let refname = branch
        .get()
        .name()
        .ok_or_else(|| git2::Error::from_str("branch name is not valid UTF-8"))?;
    repo.set_head(refname)?;
    Ok(())
}

/// Check an existing checkout against the descriptor: same origin URL, and
/// `version` is HEAD or one of its ancestors.
fn verify_checkout(name: &str, url: &str, version: &str, dest: &Path) -> Result<(), FetchError> {
    let git_err = |e| FetchError::git(name, GitStage::Verify, e);
    let mismatch = |detail: String| FetchError::Mismatch {
        name: name.to_string(),
        path: dest.to_path_buf(),
        detail,
    };

    let repo = Repository::open(dest).map_err(git_err)?;
    let remote = repo.find_remote("origin").map_err(git_err)?;
    let remote_url = remote.url().unwrap_or_default();
    if remote_url != url {
        return Err(mismatch(format!("origin is {}, expected {}", remote_url, url)));
    }

    let wanted = resolve_version(&repo, version).map_err(git_err)?;
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(git_err)?
        .id();
    if head != wanted && !repo.graph_descendant_of(head, wanted).map_err(git_err)? {
        return Err(mismatch(format!(
            "HEAD {} is not based on {} ({})",
            short_hash(&head.to_string()),
            version,
            short_hash(&wanted.to_string())
        )));
    }
    Ok(())
}

fn short_hash(rev: &str) -> &str {
    if rev.len() > 7 { &rev[..7] } else { rev }
}
