//! Report-only substitute for the shutdown engine
//!
//! When the run requests dry-run, each kind gets this reporter instead of an
//! engine pass: a cache snapshot is logged and nothing is mutated, neither
//! on the provider nor in the cache.

use tracing::info;

use crate::config::RunConfig;
use crate::provider::ProviderError;
use crate::resource::Resource;

/// Log what the kind's shutdown pass would have targeted.
pub async fn report(resource: &dyn Resource, config: &RunConfig) -> Result<(), ProviderError> {
    let ids = resource.list(false).await?;
    if ids.is_empty() {
        info!(
            kind = %resource.name(),
            project = %config.project,
            "[dryrun] nothing to shut down"
        );
    } else {
        info!(
            kind = %resource.name(),
            project = %config.project,
            instances = ?ids,
            "[dryrun] would shut down"
        );
    }
    Ok(())
}
