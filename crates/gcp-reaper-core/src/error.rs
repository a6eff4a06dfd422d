//! Error taxonomy for a shutdown run
//!
//! [`ShutdownError`] is the per-instance failure a kind's engine pass
//! surfaces; [`RunError`] is everything that can halt the run as a whole.
//! Within one kind the first instance failure wins and cancels its siblings;
//! across kinds any failure halts the run before dependents are touched.

use thiserror::Error;

use crate::provider::ProviderError;

/// Failure of one kind's shutdown pass, attributed to a single instance.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The freshness check or the stop mutation itself failed
    #[error("stop request failed for {id} [kind: {kind} project: {project} location: {location}]")]
    Mutation {
        kind: &'static str,
        id: String,
        project: String,
        location: String,
        #[source]
        source: ProviderError,
    },

    /// A status poll failed; a provider error while status-checking is a
    /// failure of that instance's shutdown, not something to retry past
    #[error("status poll failed for {id} [kind: {kind} project: {project} location: {location}]")]
    Poll {
        kind: &'static str,
        id: String,
        project: String,
        location: String,
        #[source]
        source: ProviderError,
    },

    /// The operation never reported done within the configured budget; the
    /// instance stays in the cache because its fate is unresolved
    #[error(
        "shutdown timed out for {id} [kind: {kind} project: {project} location: {location}] after {elapsed_secs} seconds"
    )]
    Timeout {
        kind: &'static str,
        id: String,
        project: String,
        location: String,
        elapsed_secs: u64,
    },

    /// The run-level cancellation scope fired while the pass was in flight
    #[error("shutdown cancelled for kind {kind}")]
    Cancelled { kind: &'static str },
}

impl ShutdownError {
    /// Instance the failure is attributed to, if any.
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            ShutdownError::Mutation { id, .. }
            | ShutdownError::Poll { id, .. }
            | ShutdownError::Timeout { id, .. } => Some(id),
            ShutdownError::Cancelled { .. } => None,
        }
    }
}

/// Failure that halts the run as a whole.
#[derive(Debug, Error)]
pub enum RunError {
    /// Provider client construction or credential failure; nothing was
    /// attempted
    #[error("setup failed: {0}")]
    Setup(String),

    /// Listing failed for a kind; an incomplete inventory makes
    /// orchestration unsafe, so the whole run aborts
    #[error("enumeration failed for kind {kind}")]
    Enumeration {
        kind: String,
        #[source]
        source: ProviderError,
    },

    /// The declared dependency graph has a cycle; rejected before any
    /// mutation
    #[error("dependency cycle among resource kinds: {kinds:?}")]
    DependencyCycle { kinds: Vec<String> },

    /// A kind names a dependency that is not registered
    #[error("kind {kind} depends on unknown kind {dependency}")]
    UnknownDependency { kind: String, dependency: String },

    /// Two kinds were registered under the same name
    #[error("duplicate resource kind registered: {name}")]
    DuplicateKind { name: String },

    /// A dependency still has live instances when its dependent's turn
    /// comes; the dependent must not be shut down against resources the
    /// still-live dependency may protect
    #[error(
        "kind {kind} requires {dependency} to be empty, but {remaining} instance(s) remain"
    )]
    DependencyUnsatisfied {
        kind: String,
        dependency: String,
        remaining: usize,
    },

    /// A kind's engine pass failed; dependents are not attempted
    #[error("shutdown failed for kind {kind}")]
    Shutdown {
        kind: String,
        #[source]
        source: ShutdownError,
    },
}
