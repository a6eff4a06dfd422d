//! Run configuration shared by all kinds and all shutdown tasks

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default per-resource shutdown timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 400;

/// Default operation poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Configuration for one shutdown run.
///
/// Built once at startup and shared by `Arc` across every kind and every
/// concurrent instance task. Read-only after construction; the only live
/// piece of state is the cancellation token, which the binary wires to
/// Ctrl-C and the engine derives per-pass child tokens from.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// GCP project id whose resources are being shut down
    pub project: String,
    /// Report what would be shut down instead of mutating anything
    pub dry_run: bool,
    /// Hard per-resource budget from stop-accepted to confirmed
    pub timeout: Duration,
    /// Fixed interval between operation status polls
    pub poll_interval: Duration,
    /// Run-level cancellation scope
    pub cancel: CancellationToken,
    /// Zones to enumerate for zonal kinds
    pub zones: Vec<String>,
    /// Regions to enumerate for regional kinds
    pub regions: Vec<String>,
}

impl RunConfig {
    /// Config with default timings for the given project, no locations.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dry_run: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cancel: CancellationToken::new(),
            zones: Vec::new(),
            regions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::new("demo-1");
        assert_eq!(config.project, "demo-1");
        assert!(!config.dry_run);
        assert_eq!(config.timeout, Duration::from_secs(400));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(config.zones.is_empty());
        assert!(!config.cancel.is_cancelled());
    }
}
