//! Shared GCP REST client
//!
//! One `GcpContext` is constructed at startup and cloned into every resource
//! kind, so the token is resolved once and the connection pool is shared.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use gcp_reaper_core::ProviderError;
use reqwest::Method;
use serde::de::DeserializeOwned;

use super::auth::resolve_access_token;
use super::error::classify_response;

/// Compute Engine v1 REST base
pub(crate) const COMPUTE_V1: &str = "https://compute.googleapis.com/compute/v1";

/// Cloud SQL Admin v1 REST base
pub(crate) const SQLADMIN_V1: &str = "https://sqladmin.googleapis.com/v1";

/// Shared HTTP client and credentials for all GCP calls.
#[derive(Clone)]
pub struct GcpContext {
    http: reqwest::Client,
    token: Arc<str>,
}

impl GcpContext {
    /// Resolve credentials and build the client.
    pub async fn new() -> Result<Self> {
        let token = resolve_access_token().await?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("gcp-reaper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            token: token.into(),
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        self.request(Method::GET, url, None).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ProviderError> {
        self.request(Method::POST, url, body).await
    }

    pub(crate) async fn patch<T: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        self.request(Method::PATCH, url, Some(body)).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ProviderError> {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(self.token.as_ref());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|err| ProviderError::Transport(format!("invalid response body: {err}")))
    }
}

impl std::fmt::Debug for GcpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpContext").finish_non_exhaustive()
    }
}
