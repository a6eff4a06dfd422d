//! Boundary types for the provider API collaborators
//!
//! The engine never talks to the cloud directly; each kind supplies a
//! [`StopHandler`] that wraps the provider calls for fetching current state,
//! issuing the stop mutation, and polling the resulting long-running
//! operation. Provider failures cross the boundary as [`ProviderError`].

use async_trait::async_trait;
use thiserror::Error;

/// Typed failure for any provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The addressed resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Credentials lack access to the project or resource
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Provider asked us to back off
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other error the provider reported in-band
    #[error("api error {code} ({status}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    /// The call never produced a provider response
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// What a status poll reports about a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Done,
}

/// What the pre-stop freshness check reports about an instance.
///
/// `Gone` covers both not-found and already-terminal: the provider's source
/// of truth overrides the cache, so there is nothing left to stop and the
/// instance can be dropped from the cache without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Active,
    Gone,
}

/// Per-kind adapter the shutdown engine drives.
///
/// `Props` is the kind-specific attribute record stored in the cache (zone
/// for zonal kinds, region for regional ones); `Operation` is the provider's
/// long-running-operation handle returned by the stop mutation.
#[async_trait]
pub trait StopHandler: Send + Sync {
    type Props: Clone + Send + Sync;
    type Operation: Send + Sync;

    /// Location string (zone or region) used in logs and error context.
    fn location<'p>(&self, props: &'p Self::Props) -> &'p str;

    /// Re-read the instance's current state so the stop never acts on a
    /// stale cache entry.
    async fn fetch_current(
        &self,
        id: &str,
        props: &Self::Props,
    ) -> Result<Freshness, ProviderError>;

    /// Issue the stop/disable mutation; returns the operation handle to poll.
    async fn begin_stop(
        &self,
        id: &str,
        props: &Self::Props,
    ) -> Result<Self::Operation, ProviderError>;

    /// Query the operation's status once.
    async fn poll_operation(
        &self,
        operation: &Self::Operation,
        props: &Self::Props,
    ) -> Result<OperationStatus, ProviderError>;
}
