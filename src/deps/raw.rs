use super::strategy::{Fetch, FetchContext, FetchOutcome};
use crate::config::Dependency;
use crate::error::{FetchError, RawStage};
use crate::ui;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Source of raw file bodies.
pub trait Downloader {
    /// Stream the body at `uri` into `sink` and return the byte count.
    fn download(&self, name: &str, uri: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Plain HTTP(S) GET through a shared `ureq` agent.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            agent: ureq::agent(),
        }
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, name: &str, uri: &str, sink: &mut dyn Write) -> Result<u64> {
        let response = self
            .agent
            .get(uri)
            .call()
            .with_context(|| format!("GET {} failed", uri))?;

        let total = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let pb = ui::download_bar(name, total);
        let mut reader = pb.wrap_read(response.into_body().into_reader());
        let copied = io::copy(&mut reader, sink);
        pb.finish_and_clear();
        copied.with_context(|| format!("Failed to read body of {}", uri))
    }
}

/// Single-file downloads into `dest/file`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStrategy;

impl Fetch for RawStrategy {
    fn fetch(
        &self,
        name: &str,
        dep: &Dependency,
        ctx: &FetchContext<'_>,
    ) -> Result<FetchOutcome, FetchError> {
        let file_name = dep
            .raw_file_name()
            .ok_or_else(|| FetchError::InvalidDescriptor {
                name: name.to_string(),
                detail: format!("cannot derive a file name from {}; set \"file\"", dep.uri),
            })?;

        let dir = dep.raw_dir(ctx.root());
        if !dir.is_dir() {
            debug!("Creating {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                FetchError::raw(name, RawStage::Prepare, format!("{}: {}", dir.display(), e))
            })?;
        }

        let target = dir.join(&file_name);
        if target.exists() {
            ui::cached(name);
            return Ok(FetchOutcome::AlreadyPresent);
        }

        // Download beside the target and rename, so a partial body is never
        // taken for a finished file on the next run.
        let partial = dir.join(format!("{}.part", file_name));
        debug!("Downloading {} -> {}", dep.uri, target.display());
        let bytes = match download_to(name, &dep.uri, &partial, &target, ctx) {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&partial);
                return Err(err);
            }
        };

        ui::fetched(name, &format!("{} bytes -> {}", bytes, target.display()));
        Ok(FetchOutcome::Fetched)
    }
}

/// Stream `uri` into `partial`, then move it to `target`. The caller removes
/// `partial` on error.
fn download_to(
    name: &str,
    uri: &str,
    partial: &Path,
    target: &Path,
    ctx: &FetchContext<'_>,
) -> Result<u64, FetchError> {
    let write_err =
        |e: io::Error| FetchError::raw(name, RawStage::Write, format!("{}: {}", partial.display(), e));

    let mut file = File::create(partial).map_err(write_err)?;
    let bytes = ctx
        .downloader
        .download(name, uri, &mut file)
        .map_err(|e| FetchError::raw(name, RawStage::Download, format!("{:#}", e)))?;
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(partial, target).map_err(|e| {
        FetchError::raw(name, RawStage::Write, format!("{}: {}", target.display(), e))
    })?;
    Ok(bytes)
}


#[cfg(test)]
mod tests {
    use super::testing::StaticDownloader;
    use super::*;
    use crate::deps::fetch::FetchOptions;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn raw(uri: &str, dest: Option<&str>) -> Dependency {
        let mut dep = Dependency::new("raw", uri);
        dep.dest = dest.map(ToOwned::to_owned);
        dep
    }

    #[test]
    fn test_download_into_dest() {
        let root = tempdir().unwrap();
        let dest = root.path().join("a");
        let dep = raw("http://x/y/z.tar", dest.to_str());
        let downloader = StaticDownloader::serving(b"tarball");
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        let outcome = RawStrategy.fetch("foo", &dep, &ctx).unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched);
        assert_eq!(fs::read(dest.join("z.tar")).unwrap(), b"tarball");
        assert!(!dest.join("z.tar.part").exists());
        assert_eq!(downloader.requests.borrow().as_slice(), ["http://x/y/z.tar"]);
    }

    #[test]
    fn test_second_fetch_makes_no_request() {
        let root = tempdir().unwrap();
        let dep = raw("http://x/y/z.tar", Some("a"));
        let downloader = StaticDownloader::serving(b"v1");
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        assert_eq!(RawStrategy.fetch("foo", &dep, &ctx).unwrap(), FetchOutcome::Fetched);
        assert_eq!(
            RawStrategy.fetch("foo", &dep, &ctx).unwrap(),
            FetchOutcome::AlreadyPresent
        );
        assert_eq!(downloader.calls(), 1);
    }

    #[test]
    fn test_file_override_and_default_dest() {
        let root = tempdir().unwrap();
        let mut dep = raw("http://x/download?id=7", None);
        dep.file = Some("tool.bin".to_string());
        let downloader = StaticDownloader::serving(b"\x7fELF");
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        RawStrategy.fetch("tool", &dep, &ctx).unwrap();
        assert_eq!(fs::read(root.path().join("tool.bin")).unwrap(), b"\x7fELF");
    }

    #[test]
    fn test_network_failure_leaves_no_file() {
        let root = tempdir().unwrap();
        let dep = raw("http://x/y/z.tar", Some("a"));
        let downloader = StaticDownloader::default();
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        let err = RawStrategy.fetch("foo", &dep, &ctx).unwrap_err();
        match err {
            FetchError::Raw { name, stage, message } => {
                assert_eq!(name, "foo");
                assert_eq!(stage, RawStage::Download);
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let dir = root.path().join("a");
        assert!(!dir.join("z.tar").exists());
        assert!(!dir.join("z.tar.part").exists());
    }

    /// Serves a body but occupies the target path while doing so, so the
    /// final rename cannot succeed.
    struct RacingDownloader {
        target: PathBuf,
    }

    impl Downloader for RacingDownloader {
        fn download(&self, _name: &str, _uri: &str, sink: &mut dyn Write) -> Result<u64> {
            fs::create_dir_all(self.target.join("occupied"))?;
            sink.write_all(b"body")?;
            Ok(4)
        }
    }

    #[test]
    fn test_failed_rename_removes_partial_file() {
        let root = tempdir().unwrap();
        let dir = root.path().join("a");
        let dep = raw("http://x/y/z.tar", Some("a"));
        let downloader = RacingDownloader {
            target: dir.join("z.tar"),
        };
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        let err = RawStrategy.fetch("foo", &dep, &ctx).unwrap_err();
        assert!(matches!(err, FetchError::Raw { stage: RawStage::Write, .. }));
        assert!(!dir.join("z.tar.part").exists());
    }

    #[test]
    fn test_dest_that_is_a_file_fails_prepare() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("blocked"), "file").unwrap();
        let dep = raw("http://x/y/z.tar", Some("blocked"));
        let downloader = StaticDownloader::serving(b"data");
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        let err = RawStrategy.fetch("foo", &dep, &ctx).unwrap_err();
        assert!(matches!(err, FetchError::Raw { stage: RawStage::Prepare, .. }));
        assert_eq!(downloader.calls(), 0);
    }

    #[test]
    fn test_uri_without_file_name() {
        let root = tempdir().unwrap();
        let dep = raw("http://x/y/", None);
        let downloader = StaticDownloader::serving(b"data");
        let ctx = FetchContext::new(root.path(), FetchOptions::default(), &downloader);

        let err = RawStrategy.fetch("dir", &dep, &ctx).unwrap_err();
        assert!(matches!(err, FetchError::InvalidDescriptor { .. }));
        assert_eq!(downloader.calls(), 0);
    }
}
