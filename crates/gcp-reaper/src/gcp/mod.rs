//! GCP collaborator modules
//!
//! Everything that actually talks to Google Cloud lives here:
//! - `auth`: access token resolution (env var or gcloud CLI)
//! - `context`: shared REST client used by every kind
//! - `discovery`: zone and region enumeration for the run configuration
//! - `error`: mapping of GCP REST error envelopes onto `ProviderError`
//! - `compute`: the Compute Engine instance kind
//! - `sql`: the Cloud SQL instance kind

pub mod auth;
pub mod compute;
pub mod context;
pub mod discovery;
pub mod error;
pub mod sql;

pub use compute::ComputeInstances;
pub use context::GcpContext;
pub use discovery::{discover_regions, discover_zones};
pub use sql::SqlInstances;
