//! Zone and region discovery
//!
//! Runs once at setup to resolve the locations the zonal kinds enumerate.
//! The aggregated lists land in the run configuration and never change for
//! the lifetime of the run.

use gcp_reaper_core::ProviderError;
use serde::Deserialize;

use super::context::{COMPUTE_V1, GcpContext};

#[derive(Debug, Deserialize)]
struct ScopeList {
    #[serde(default)]
    items: Vec<ScopeEntry>,
}

#[derive(Debug, Deserialize)]
struct ScopeEntry {
    name: String,
}

/// All compute zones visible to the project.
pub async fn discover_zones(
    ctx: &GcpContext,
    project: &str,
) -> Result<Vec<String>, ProviderError> {
    let list: ScopeList = ctx
        .get(&format!("{COMPUTE_V1}/projects/{project}/zones"))
        .await?;
    Ok(names(list))
}

/// All compute regions visible to the project.
pub async fn discover_regions(
    ctx: &GcpContext,
    project: &str,
) -> Result<Vec<String>, ProviderError> {
    let list: ScopeList = ctx
        .get(&format!("{COMPUTE_V1}/projects/{project}/regions"))
        .await?;
    Ok(names(list))
}

fn names(list: ScopeList) -> Vec<String> {
    let mut names: Vec<String> = list.items.into_iter().map(|entry| entry.name).collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_sorts_scope_lists() {
        let list: ScopeList = serde_json::from_str(
            r#"{
                "kind": "compute#zoneList",
                "items": [
                    {"name": "us-east1-b", "status": "UP"},
                    {"name": "us-central1-a", "status": "UP"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(names(list), vec!["us-central1-a", "us-east1-b"]);
    }

    #[test]
    fn missing_items_means_no_locations() {
        let list: ScopeList = serde_json::from_str(r#"{"kind": "compute#zoneList"}"#).unwrap();
        assert!(names(list).is_empty());
    }
}
