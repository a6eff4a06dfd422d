//! gcp-reaper - GCP project shutdown tool
//!
//! The binary crate: CLI handling plus the GCP collaborators (auth, REST
//! client, zone/region discovery, and the concrete resource kinds) behind
//! the boundary traits defined in `gcp-reaper-core`.

pub mod gcp;
