//! gcp-reaper-core - Resource orchestration and shutdown engine
//!
//! This crate holds everything that is generic over the cloud provider:
//! the capability contract resource kinds implement, the registry of known
//! kinds, the dependency-aware ordering between kinds, and the concurrent
//! stop/poll/timeout state machine applied uniformly to every instance.
//! It has no HTTP or GCP dependencies; the binary crate supplies those
//! behind the [`provider::StopHandler`] boundary.
//!
//! ## Modules
//!
//! - [`cache`]: per-kind concurrent instance cache with sorted snapshots
//! - [`config`]: immutable run configuration shared across all tasks
//! - [`deps`]: topological shutdown ordering over kind dependencies
//! - [`dryrun`]: report-only substitute for the shutdown engine
//! - [`engine`]: concurrent stop/poll/timeout engine for one kind
//! - [`error`]: run-level and per-instance error taxonomy
//! - [`orchestrator`]: drives kinds through refresh and shutdown in order
//! - [`provider`]: boundary types for the provider API collaborators
//! - [`resource`]: the capability contract and the kind registry

pub mod cache;
pub mod config;
pub mod deps;
pub mod dryrun;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod resource;

pub use cache::InstanceCache;
pub use config::RunConfig;
pub use error::{RunError, ShutdownError};
pub use provider::{Freshness, OperationStatus, ProviderError, StopHandler};
pub use resource::{Registry, Resource};
