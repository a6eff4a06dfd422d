//! Drives every registered kind through refresh and shutdown in
//! dependency order
//!
//! Kinds are processed one at a time; within a kind the engine fans out per
//! instance. Any failure halts the run: a kind whose dependency still has
//! live instances is never shut down against them, and kinds after a failed
//! one are not attempted.

use tracing::info;

use crate::config::RunConfig;
use crate::deps::resolve_order;
use crate::dryrun;
use crate::error::RunError;
use crate::resource::Registry;

/// Run the shutdown (or dry-run report) for every registered kind.
pub async fn orchestrate(registry: &Registry, config: &RunConfig) -> Result<(), RunError> {
    let order = resolve_order(registry)?;
    info!(
        project = %config.project,
        dry_run = config.dry_run,
        order = ?order,
        "resolved shutdown order"
    );

    for name in order {
        let resource = registry
            .get(name)
            .expect("resolved order only contains registered kinds");

        // The engine only returns success with an empty cache, so a live
        // dependency here means its pass was skipped or misbehaved; refuse
        // to act on the dependent. Dry-run shuts nothing down, so the check
        // would always trip there and is skipped.
        if !config.dry_run {
            for &dep in resource.dependencies() {
                let dep_resource = registry
                    .get(dep)
                    .expect("resolve_order rejects unknown dependencies");
                let remaining = dep_resource.list(false).await.map_err(|source| {
                    RunError::Enumeration {
                        kind: dep.into(),
                        source,
                    }
                })?;
                if !remaining.is_empty() {
                    return Err(RunError::DependencyUnsatisfied {
                        kind: name.into(),
                        dependency: dep.into(),
                        remaining: remaining.len(),
                    });
                }
            }
        }

        let ids = resource
            .list(true)
            .await
            .map_err(|source| RunError::Enumeration {
                kind: name.into(),
                source,
            })?;
        info!(
            kind = %name,
            project = %config.project,
            count = ids.len(),
            "enumerated resources"
        );

        if config.dry_run {
            dryrun::report(resource, config)
                .await
                .map_err(|source| RunError::Enumeration {
                    kind: name.into(),
                    source,
                })?;
            continue;
        }

        resource
            .shutdown()
            .await
            .map_err(|source| RunError::Shutdown {
                kind: name.into(),
                source,
            })?;
        info!(kind = %name, project = %config.project, "kind shut down");
    }

    Ok(())
}
