//! Cloud SQL instance kind
//!
//! Cloud SQL has no direct "stop" call; deactivation is a settings patch
//! setting the activation policy to NEVER, which the API tracks with a
//! regular long-running operation. Depends on compute instances being gone
//! first: applications stop before the databases they are connected to.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_reaper_core::{
    Freshness, InstanceCache, OperationStatus, ProviderError, Resource, RunConfig, ShutdownError,
    StopHandler, engine,
};
use serde::Deserialize;
use serde_json::json;

use super::context::{GcpContext, SQLADMIN_V1};

const KIND: &str = "SqlInstances";

const DEPENDENCIES: &[&str] = &["ComputeInstances"];

/// Cached attributes of one Cloud SQL instance.
#[derive(Debug, Clone)]
pub struct SqlProps {
    pub region: String,
}

/// The Cloud SQL instance kind.
pub struct SqlInstances {
    ctx: GcpContext,
    config: Option<Arc<RunConfig>>,
    cache: InstanceCache<SqlProps>,
}

impl SqlInstances {
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
struct InstancesList {
    #[serde(default)]
    items: Vec<DatabaseInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseInstance {
    name: String,
    #[serde(default)]
    region: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    status: String,
}

/// The patch request body that deactivates an instance.
fn deactivate_body() -> serde_json::Value {
    json!({
        "settings": {
            "activationPolicy": "NEVER"
        }
    })
}

fn operation_status(status: &str) -> OperationStatus {
    if status == "DONE" {
        OperationStatus::Done
    } else {
        OperationStatus::Pending
    }
}

#[async_trait]
impl Resource for SqlInstances {
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

        // Cloud SQL listing is project scoped; the instance carries its region
        let config = self.config();
        let list: InstancesList = self
            .ctx
            .get(&format!("{SQLADMIN_V1}/projects/{}/instances", config.project))
            .await?;
        self.cache.replace_all(list.items.into_iter().map(|instance| {
            (
                instance.name,
                SqlProps {
                    region: instance.region,
                },
            )
        }));
        Ok(self.cache.ids())
    }

    fn dependencies(&self) -> &[&'static str] {
        DEPENDENCIES
    }

    async fn shutdown(&self) -> Result<(), ShutdownError> {
        engine::shutdown_all(KIND, self.config(), &self.cache, self).await
    }
}

#[async_trait]
impl StopHandler for SqlInstances {
    type Props = SqlProps;
    type Operation = String;

    fn location<'p>(&self, props: &'p SqlProps) -> &'p str {
        &props.region
    }

    async fn fetch_current(&self, id: &str, _props: &SqlProps) -> Result<Freshness, ProviderError> {
        let config = self.config();
        let result: Result<DatabaseInstance, ProviderError> = self
            .ctx
            .get(&format!(
                "{SQLADMIN_V1}/projects/{}/instances/{id}",
                config.project
            ))
            .await;
        match result {
            Ok(_) => Ok(Freshness::Active),
            Err(err) if err.is_not_found() => Ok(Freshness::Gone),
            Err(err) => Err(err),
        }
    }

    async fn begin_stop(&self, id: &str, _props: &SqlProps) -> Result<String, ProviderError> {
        let config = self.config();
        let operation: Operation = self
            .ctx
            .patch(
                &format!("{SQLADMIN_V1}/projects/{}/instances/{id}", config.project),
                deactivate_body(),
            )
            .await?;
        Ok(operation.name)
    }

    async fn poll_operation(
        &self,
        operation: &String,
        _props: &SqlProps,
    ) -> Result<OperationStatus, ProviderError> {
        let config = self.config();
        let operation: Operation = self
            .ctx
            .get(&format!(
                "{SQLADMIN_V1}/projects/{}/operations/{operation}",
                config.project
            ))
            .await?;
        Ok(operation_status(&operation.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivation_patch_shape() {
        let body = deactivate_body();
        assert_eq!(body["settings"]["activationPolicy"], "NEVER");
    }

    #[test]
    fn instance_list_parses_real_shape() {
        let list: InstancesList = serde_json::from_str(
            r#"{
                "kind": "sql#instancesList",
                "items": [
                    {"name": "orders-db", "region": "us-central1", "state": "RUNNABLE"},
                    {"name": "analytics-db", "region": "europe-west1", "state": "RUNNABLE"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].name, "orders-db");
        assert_eq!(list.items[0].region, "us-central1");
    }

    #[test]
    fn empty_project_parses() {
        let list: InstancesList = serde_json::from_str(r#"{"kind": "sql#instancesList"}"#).unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn operation_status_mapping() {
        assert_eq!(operation_status("DONE"), OperationStatus::Done);
        assert_eq!(operation_status("PENDING"), OperationStatus::Pending);
        assert_eq!(operation_status("RUNNING"), OperationStatus::Pending);
    }

    #[test]
    fn depends_on_compute() {
        assert_eq!(DEPENDENCIES, &["ComputeInstances"]);
    }
}
