//! # repo-manager - manifest-driven dependency fetcher
//!
//! Reads JSON manifests describing external dependencies (git repositories,
//! raw files, container images) and fetches each into a local destination,
//! skipping anything already present.
//!
//! ## Manifest
//!
//! ```json
//! {
//!     "json": { "type": "git", "uri": "https://github.com/nlohmann/json.git", "version": "v3.11.3", "dest": "third_party/json" },
//!     "data": { "type": "raw", "uri": "https://example.com/data/set.tar", "dest": "downloads" }
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`manifest`] - Manifest discovery and merging
//! - [`deps`] - Fetch strategies and orchestration
//! - [`config`] - Dependency descriptor model

/// Dependency descriptor model.
pub mod config;

/// Fetch strategies and orchestration.
pub mod deps;

/// Error kinds.
pub mod error;

/// Manifest discovery, parsing and merging.
pub mod manifest;

/// Terminal output helpers.
pub mod ui;
