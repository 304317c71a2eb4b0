//! Fetch orchestration.
//!
//! Every descriptor is resolved to its strategy before anything touches the
//! disk, so an unknown type aborts the run with no side effects. Fetches then
//! run one at a time in manifest order.

use super::strategy::{Fetch, FetchContext, FetchOutcome, Strategy};
use crate::config::{Dependency, DependencyKind};
use crate::error::FetchError;
use crate::manifest::Manifest;
use crate::ui;
use colored::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// What to do when a single dependency fails to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure; later dependencies are not attempted.
    #[default]
    Abort,
    /// Record the failure and move on to the next dependency.
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub policy: FailurePolicy,
    /// Check that an existing git checkout matches the manifest instead of
    /// trusting it blindly.
    pub verify_existing: bool,
}

/// A dependency paired with the strategy that will fetch it.
#[derive(Debug, Clone, Copy)]
pub struct PlannedFetch<'m> {
    pub name: &'m str,
    pub dependency: &'m Dependency,
    pub strategy: Strategy,
}

impl PlannedFetch<'_> {
    pub fn destination(&self, root: &std::path::Path) -> Option<PathBuf> {
        self.strategy.destination(self.dependency, root)
    }
}

/// Resolve every entry of `manifest` to a strategy, in manifest order.
pub fn plan(manifest: &Manifest) -> Result<Vec<PlannedFetch<'_>>, FetchError> {
    manifest
        .iter()
        .map(|(name, dependency)| {
            Strategy::resolve(name, dependency).map(|strategy| {
                debug!("Dependency {} resolved to {}", name, strategy.kind());
                PlannedFetch {
                    name,
                    dependency,
                    strategy,
                }
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct FetchRecord {
    pub name: String,
    pub kind: DependencyKind,
    pub result: Result<FetchOutcome, FetchError>,
}

/// Per-dependency results of one run, in the order they were attempted.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub records: Vec<FetchRecord>,
}

impl FetchReport {
    fn count(&self, outcome: FetchOutcome) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(&r.result, Ok(o) if *o == outcome))
            .count()
    }

    pub fn fetched(&self) -> usize {
        self.count(FetchOutcome::Fetched)
    }

    pub fn skipped(&self) -> usize {
        self.count(FetchOutcome::AlreadyPresent)
    }

    pub fn not_implemented(&self) -> usize {
        self.count(FetchOutcome::NotImplemented)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.records.iter().filter_map(|r| r.result.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn print_summary(&self) {
        let failed = self.failures().count();
        let line = format!(
            "{} fetched, {} already present, {} not implemented, {} failed",
            self.fetched(),
            self.skipped(),
            self.not_implemented(),
            failed
        );
        if failed == 0 {
            println!("{} {}", "✓".green(), line);
        } else {
            println!("{} {}", "x".red(), line);
            for err in self.failures() {
                println!("   - {}", err);
            }
        }
    }
}

pub struct Orchestrator<'a> {
    ctx: FetchContext<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: FetchContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &FetchContext<'a> {
        &self.ctx
    }

    /// Fetch every dependency of `manifest`.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned and nothing
    /// after it is attempted. Under [`FailurePolicy::Continue`] failures are
    /// collected in the report. Unknown types are always returned as errors.
    pub fn run(&self, manifest: &Manifest) -> Result<FetchReport, FetchError> {
        let steps = plan(manifest)?;
        self.run_plan(&steps)
    }

    pub fn run_plan(&self, steps: &[PlannedFetch<'_>]) -> Result<FetchReport, FetchError> {
        let mut report = FetchReport::default();
        if steps.is_empty() {
            info!("No dependencies to fetch");
            return Ok(report);
        }

        println!("{} Checking {} dependencies...", "📦".blue(), steps.len());
        for step in steps {
            debug!("Fetching {} ({}) from {}", step.name, step.strategy.kind(), step.dependency.uri);
            // An aborting error is reported once, by the caller.
            let result = match step.strategy.fetch(step.name, step.dependency, &self.ctx) {
                Err(err) if self.ctx.options.policy == FailurePolicy::Abort => return Err(err),
                result => result,
            };
            if let Err(err) = &result {
                ui::fail(&err.to_string());
            }

            report.records.push(FetchRecord {
                name: step.name.to_string(),
                kind: step.strategy.kind(),
                result,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::git::testing::upstream;
    use crate::deps::raw::testing::StaticDownloader;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn manifest(json: &str) -> Manifest {
        Manifest::parse(json, Path::new("test.json")).unwrap()
    }

    #[test]
    fn test_empty_manifest_succeeds() {
        let root = tempdir().unwrap();
        let downloader = StaticDownloader::default();
        let orchestrator = Orchestrator::new(FetchContext::new(
            root.path(),
            FetchOptions::default(),
            &downloader,
        ));
        let report = orchestrator.run(&Manifest::default()).unwrap();
        assert!(report.records.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_unknown_type_aborts_before_any_fetch() {
        let root = tempdir().unwrap();
        let m = manifest(
            r#"{"q": {"type": "quux", "uri": "x"},
                "foo": {"type": "raw", "uri": "http://x/y/z.tar", "dest": "a"}}"#,
        );
        let downloader = StaticDownloader::serving(b"data");
        let orchestrator = Orchestrator::new(FetchContext::new(
            root.path(),
            FetchOptions::default(),
            &downloader,
        ));

        let err = orchestrator.run(&m).unwrap_err();
        assert!(matches!(err, FetchError::UnknownType { .. }));
        assert_eq!(downloader.calls(), 0);
        assert!(!root.path().join("a").exists());
    }

    #[test]
    fn test_unknown_type_fatal_even_when_continuing() {
        let root = tempdir().unwrap();
        let m = manifest(
            r#"{"foo": {"type": "raw", "uri": "http://x/y/z.tar"},
                "q": {"type": "quux", "uri": "x"}}"#,
        );
        let downloader = StaticDownloader::serving(b"data");
        let options = FetchOptions {
            policy: FailurePolicy::Continue,
            ..FetchOptions::default()
        };
        let orchestrator = Orchestrator::new(FetchContext::new(root.path(), options, &downloader));

        assert!(orchestrator.run(&m).is_err());
        assert_eq!(downloader.calls(), 0);
    }

    #[test]
    fn test_abort_stops_at_first_failure() {
        let root = tempdir().unwrap();
        let m = manifest(
            r#"{"broken": {"type": "raw", "uri": "http://x/broken.bin"},
                "later": {"type": "raw", "uri": "http://x/later.bin"}}"#,
        );
        let downloader = StaticDownloader::default();
        let orchestrator = Orchestrator::new(FetchContext::new(
            root.path(),
            FetchOptions::default(),
            &downloader,
        ));

        let err = orchestrator.run(&m).unwrap_err();
        assert_eq!(err.dependency(), "broken");
        assert_eq!(
            downloader.requests.borrow().as_slice(),
            ["http://x/broken.bin"]
        );
    }

    #[test]
    fn test_continue_collects_failures() {
        let root = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        upstream(&tmp.path().join("upstream"));
        let json = format!(
            r#"{{"broken": {{"type": "raw", "uri": "http://x/broken.bin"}},
                 "lib": {{"type": "git", "uri": "{}", "dest": "lib"}},
                 "img": {{"type": "docker", "uri": "alpine:3"}}}}"#,
            tmp.path().join("upstream").display()
        );
        let m = manifest(&json);
        let downloader = StaticDownloader::default();
        let options = FetchOptions {
            policy: FailurePolicy::Continue,
            ..FetchOptions::default()
        };
        let orchestrator = Orchestrator::new(FetchContext::new(root.path(), options, &downloader));

        let report = orchestrator.run(&m).unwrap();
        assert_eq!(report.records.len(), 3);
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.fetched(), 1);
        assert_eq!(report.not_implemented(), 1);
        assert!(root.path().join("lib").join("README").exists());
    }

    #[test]
    fn test_second_run_skips_everything() {
        let root = tempdir().unwrap();
        let dest = root.path().join("a");
        let json = format!(
            r#"{{"foo": {{"type": "raw", "uri": "http://x/y/z.tar", "dest": "{}"}}}}"#,
            dest.display()
        );
        let m = manifest(&json);
        let downloader = StaticDownloader::serving(b"bytes");
        let orchestrator = Orchestrator::new(FetchContext::new(
            root.path(),
            FetchOptions::default(),
            &downloader,
        ));

        assert_eq!(orchestrator.run(&m).unwrap().fetched(), 1);
        assert_eq!(fs::read(dest.join("z.tar")).unwrap(), b"bytes");

        let second = orchestrator.run(&m).unwrap();
        assert_eq!(second.skipped(), 1);
        assert_eq!(downloader.calls(), 1);
    }

    #[test]
    fn test_plan_keeps_manifest_order() {
        let m = manifest(
            r#"{"b": {"type": "git", "uri": "https://x/b.git"},
                "a": {"type": "raw", "uri": "http://x/a"},
                "c": {"type": "container", "uri": "busybox"}}"#,
        );
        let steps = plan(&m).unwrap();
        let kinds: Vec<_> = steps.iter().map(|s| (s.name, s.strategy.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                ("b", DependencyKind::Git),
                ("a", DependencyKind::Raw),
                ("c", DependencyKind::Container)
            ]
        );
        assert_eq!(
            steps[0].destination(Path::new("/w")),
            Some(PathBuf::from("/w/b.git"))
        );
    }
}
