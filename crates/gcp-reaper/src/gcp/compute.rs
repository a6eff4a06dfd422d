//! Compute Engine instance kind
//!
//! Enumerates instances across every resolved zone and stops them through
//! the generic engine. Instances created by an instance group manager are
//! outside this tool's authority: the group would recreate them, so they are
//! excluded from enumeration and never targeted.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_reaper_core::{
    Freshness, InstanceCache, OperationStatus, ProviderError, Resource, RunConfig, ShutdownError,
    StopHandler, engine,
};
use serde::Deserialize;
use tracing::debug;

use super::context::{COMPUTE_V1, GcpContext};

const KIND: &str = "ComputeInstances";

/// Metadata key set by controllers on instances they own.
const CREATED_BY: &str = "created-by";

/// Cached attributes of one compute instance.
#[derive(Debug, Clone)]
pub struct ComputeProps {
    pub zone: String,
}

/// The Compute Engine instance kind.
pub struct ComputeInstances {
    ctx: GcpContext,
    config: Option<Arc<RunConfig>>,
    cache: InstanceCache<ComputeProps>,
}

impl ComputeInstances {
    pub fn new(ctx: GcpContext) -> Self {
        Self {
            ctx,
            config: None,
            cache: InstanceCache::new(),
        }
    }

    fn config(&self) -> &RunConfig {
        self.config.as_ref().expect("setup() must run before use")
    }
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    #[serde(default)]
    items: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instance {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    items: Vec<MetadataEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    status: String,
}

/// True when the instance belongs to an instance group manager.
fn managed_by_controller(instance: &Instance) -> bool {
    instance.metadata.items.iter().any(|entry| {
        entry.key == CREATED_BY
            && entry
                .value
                .as_deref()
                .is_some_and(|value| value.contains("/instanceGroupManagers/"))
    })
}

/// Stop operations leave the instance in TERMINATED; treat that as gone.
fn already_terminal(status: &str) -> bool {
    status == "TERMINATED"
}

fn operation_status(status: &str) -> OperationStatus {
    if status == "DONE" {
        OperationStatus::Done
    } else {
        OperationStatus::Pending
    }
}

#[async_trait]
impl Resource for ComputeInstances {
    fn name(&self) -> &'static str {
        KIND
    }

    fn setup(&mut self, config: Arc<RunConfig>) {
        self.config = Some(config);
    }

    async fn list(&self, refresh: bool) -> Result<Vec<String>, ProviderError> {
        if !refresh {
            return Ok(self.cache.ids());
        }

        let config = self.config();
        let mut entries = Vec::new();
        for zone in &config.zones {
            let list: InstanceList = self
                .ctx
                .get(&format!(
                    "{COMPUTE_V1}/projects/{}/zones/{zone}/instances",
                    config.project
                ))
                .await?;
            for instance in list.items {
                if managed_by_controller(&instance) {
                    debug!(
                        id = %instance.name, kind = %KIND, zone = %zone,
                        "skipping controller-managed instance"
                    );
                    continue;
                }
                entries.push((instance.name, ComputeProps { zone: zone.clone() }));
            }
        }
        self.cache.replace_all(entries);
        Ok(self.cache.ids())
    }

    async fn shutdown(&self) -> Result<(), ShutdownError> {
        engine::shutdown_all(KIND, self.config(), &self.cache, self).await
    }
}

#[async_trait]
impl StopHandler for ComputeInstances {
    type Props = ComputeProps;
    type Operation = String;

    fn location<'p>(&self, props: &'p ComputeProps) -> &'p str {
        &props.zone
    }

    async fn fetch_current(
        &self,
        id: &str,
        props: &ComputeProps,
    ) -> Result<Freshness, ProviderError> {
        let config = self.config();
        let result: Result<Instance, ProviderError> = self
            .ctx
            .get(&format!(
                "{COMPUTE_V1}/projects/{}/zones/{}/instances/{id}",
                config.project, props.zone
            ))
            .await;
        match result {
            Ok(instance) if already_terminal(&instance.status) => Ok(Freshness::Gone),
            Ok(_) => Ok(Freshness::Active),
            Err(err) if err.is_not_found() => Ok(Freshness::Gone),
            Err(err) => Err(err),
        }
    }

    async fn begin_stop(&self, id: &str, props: &ComputeProps) -> Result<String, ProviderError> {
        let config = self.config();
        let operation: Operation = self
            .ctx
            .post(
                &format!(
                    "{COMPUTE_V1}/projects/{}/zones/{}/instances/{id}/stop",
                    config.project, props.zone
                ),
                None,
            )
            .await?;
        Ok(operation.name)
    }

    async fn poll_operation(
        &self,
        operation: &String,
        props: &ComputeProps,
    ) -> Result<OperationStatus, ProviderError> {
        let config = self.config();
        let operation: Operation = self
            .ctx
            .get(&format!(
                "{COMPUTE_V1}/projects/{}/zones/{}/operations/{operation}",
                config.project, props.zone
            ))
            .await?;
        Ok(operation_status(&operation.status))
    }
}
