//! Access token resolution
//!
//! Tries `GCP_ACCESS_TOKEN` first so CI and tests can inject a token, then
//! falls back to the gcloud CLI, which handles every credential flavor
//! (user credentials, service accounts, workload identity) on its own.

use anyhow::{Context, Result, bail};
use tokio::process::Command;

/// Environment variable consulted before shelling out to gcloud.
pub const TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

/// Resolve an OAuth2 access token for the GCP REST APIs.
pub async fn resolve_access_token() -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .context("failed to execute gcloud CLI; install it or set GCP_ACCESS_TOKEN")?;

    if !output.status.success() {
        bail!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        bail!("gcloud returned an empty access token");
    }
    Ok(token)
}
