use super::strategy::{Fetch, FetchContext, FetchOutcome};
use crate::config::Dependency;
use crate::error::FetchError;
use crate::ui;
use tracing::debug;

/// Container image references. Pulling images is not supported yet; the
/// request is acknowledged and reported as [`FetchOutcome::NotImplemented`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStrategy;

impl Fetch for ContainerStrategy {
    fn fetch(
        &self,
        name: &str,
        dep: &Dependency,
        _ctx: &FetchContext<'_>,
    ) -> Result<FetchOutcome, FetchError> {
        debug!("Container dependency {} -> {}", name, dep.uri);
        ui::warn(&format!(
            "Skipping {}: pulling container image {} is not implemented",
            name, dep.uri
        ));
        Ok(FetchOutcome::NotImplemented)
    }
}
