//! Concurrent shutdown engine for one resource kind
//!
//! Drives every cached instance of a kind through
//! `Pending -> Stopping -> {Confirmed, TimedOut, Failed}` with one concurrent
//! task per instance. All tasks of a pass share a cancellation scope: the
//! first failure cancels the scope, sibling poll loops observe it at their
//! next suspension point and exit promptly, and the engine returns the first
//! error after every task has settled.

use std::sync::Mutex;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::InstanceCache;
use crate::config::RunConfig;
use crate::error::ShutdownError;
use crate::provider::{Freshness, OperationStatus, StopHandler};

/// Shut down every cached instance of `kind` concurrently.
///
/// Returns `Ok(())` only when every instance reached `Confirmed` (or was
/// found already gone), which also means the cache is empty. On failure the
/// first error observed is returned; instances that were confirmed before
/// cancellation stay removed from the cache, everything else stays tracked.
pub async fn shutdown_all<H>(
    kind: &'static str,
    config: &RunConfig,
    cache: &InstanceCache<H::Props>,
    handler: &H,
) -> Result<(), ShutdownError>
where
    H: StopHandler,
{
    let instances = cache.snapshot();
    if instances.is_empty() {
        debug!(kind = %kind, project = %config.project, "no instances to shut down");
        return Ok(());
    }

    let cancel = config.cancel.child_token();
    let first_error: Mutex<Option<ShutdownError>> = Mutex::new(None);

    let tasks = instances.into_iter().map(|(id, props)| {
        let cancel = cancel.clone();
        let first_error = &first_error;
        async move {
            if let Err(err) = stop_instance(kind, config, cache, handler, &id, &props, &cancel).await
            {
                let mut slot = first_error.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(err);
                }
                drop(slot);
                cancel.cancel();
            }
        }
    });
    futures::future::join_all(tasks).await;

    match first_error.into_inner().unwrap() {
        Some(err) => Err(err),
        // No task failed but the scope is cancelled: the run-level token
        // fired. The pass did not complete, so it must not look successful.
        None if cancel.is_cancelled() => Err(ShutdownError::Cancelled { kind }),
        None => Ok(()),
    }
}

/// Stop one instance and poll its operation until confirmed, failed, timed
/// out, or cancelled. Cancellation is not an error of this instance: the
/// task exits quietly and leaves the instance tracked in the cache.
async fn stop_instance<H>(
    kind: &'static str,
    config: &RunConfig,
    cache: &InstanceCache<H::Props>,
    handler: &H,
    id: &str,
    props: &H::Props,
    cancel: &CancellationToken,
) -> Result<(), ShutdownError>
where
    H: StopHandler,
{
    let location = handler.location(props);
    let project = config.project.as_str();

    if cancel.is_cancelled() {
        return Ok(());
    }

    // Freshness check: the provider is the source of truth, not the cache.
    match handler.fetch_current(id, props).await {
        Ok(Freshness::Active) => {}
        Ok(Freshness::Gone) => {
            cache.remove(id);
            info!(
                id = %id, kind = %kind, project = %project, location = %location,
                "resource already gone, nothing to stop"
            );
            return Ok(());
        }
        Err(source) => {
            return Err(ShutdownError::Mutation {
                kind,
                id: id.into(),
                project: project.into(),
                location: location.into(),
                source,
            });
        }
    }

    let operation = handler
        .begin_stop(id, props)
        .await
        .map_err(|source| ShutdownError::Mutation {
            kind,
            id: id.into(),
            project: project.into(),
            location: location.into(),
            source,
        })?;

    let started = Instant::now();
    info!(
        id = %id, kind = %kind, project = %project, location = %location,
        "stop request accepted, waiting for confirmation"
    );

    loop {
        let elapsed_secs = started.elapsed().as_secs();
        info!(
            id = %id, kind = %kind, project = %project, location = %location,
            elapsed_secs,
            "resource currently being shut down"
        );

        match handler.poll_operation(&operation, props).await {
            Ok(OperationStatus::Done) => {
                cache.remove(id);
                info!(
                    id = %id, kind = %kind, project = %project, location = %location,
                    elapsed_secs = started.elapsed().as_secs(),
                    "resource shutdown confirmed"
                );
                return Ok(());
            }
            Ok(OperationStatus::Pending) => {}
            Err(source) => {
                return Err(ShutdownError::Poll {
                    kind,
                    id: id.into(),
                    project: project.into(),
                    location: location.into(),
                    source,
                });
            }
        }

        tokio::select! {
            () = tokio::time::sleep(config.poll_interval) => {}
            () = cancel.cancelled() => {
                debug!(
                    id = %id, kind = %kind, project = %project, location = %location,
                    "shutdown cancelled mid-flight, instance stays tracked"
                );
                return Ok(());
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            warn!(
                id = %id, kind = %kind, project = %project, location = %location,
                elapsed_secs = elapsed.as_secs(),
                "resource shutdown timed out"
            );
            return Err(ShutdownError::Timeout {
                kind,
                id: id.into(),
                project: project.into(),
                location: location.into(),
                elapsed_secs: elapsed.as_secs(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted per-instance behavior for the mock handler.
    #[derive(Clone)]
    enum Script {
        /// Operation reports done after this many pending polls
        DoneAfter(usize),
        /// Operation never reports done
        NeverDone,
        /// The stop mutation itself fails
        StopFails,
        /// A status poll fails after this many pending polls
        PollFails(usize),
        /// Freshness check says the instance is already gone
        AlreadyGone,
        /// Freshness check itself errors
        FreshnessFails,
    }

    #[derive(Default)]
    struct MockHandler {
        scripts: HashMap<String, Script>,
        fetches: AtomicUsize,
        stops: AtomicUsize,
        polls: AtomicUsize,
    }

    impl MockHandler {
        fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(id, script)| (id.to_string(), script))
                    .collect(),
                ..Default::default()
            }
        }

        fn script(&self, id: &str) -> Script {
            self.scripts[id].clone()
        }
    }

    struct MockOp {
        id: String,
        polled: AtomicUsize,
    }

    #[async_trait]
    impl StopHandler for MockHandler {
        type Props = ();
        type Operation = MockOp;

        fn location<'p>(&self, _props: &'p ()) -> &'p str {
            "zone-1"
        }

        async fn fetch_current(&self, id: &str, _props: &()) -> Result<Freshness, ProviderError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.script(id) {
                Script::AlreadyGone => Ok(Freshness::Gone),
                Script::FreshnessFails => Err(ProviderError::Transport("lookup failed".into())),
                _ => Ok(Freshness::Active),
            }
        }

        async fn begin_stop(&self, id: &str, _props: &()) -> Result<MockOp, ProviderError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            match self.script(id) {
                Script::StopFails => Err(ProviderError::Api {
                    code: 400,
                    status: "FAILED_PRECONDITION".into(),
                    message: "cannot stop".into(),
                }),
                _ => Ok(MockOp {
                    id: id.to_string(),
                    polled: AtomicUsize::new(0),
                }),
            }
        }

        async fn poll_operation(
            &self,
            operation: &MockOp,
            _props: &(),
        ) -> Result<OperationStatus, ProviderError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let attempt = operation.polled.fetch_add(1, Ordering::SeqCst);
            match self.script(&operation.id) {
                Script::DoneAfter(n) if attempt >= n => Ok(OperationStatus::Done),
                Script::DoneAfter(_) | Script::NeverDone => Ok(OperationStatus::Pending),
                Script::PollFails(n) if attempt >= n => {
                    Err(ProviderError::Transport("poll transport error".into()))
                }
                Script::PollFails(_) => Ok(OperationStatus::Pending),
                _ => Ok(OperationStatus::Done),
            }
        }
    }

    fn test_config() -> RunConfig {
        let mut config = RunConfig::new("demo-1");
        config.timeout = Duration::from_secs(30);
        config.poll_interval = Duration::from_secs(5);
        config
    }

    fn cache_of(ids: &[&str]) -> InstanceCache<()> {
        let cache = InstanceCache::new();
        cache.replace_all(ids.iter().map(|id| (id.to_string(), ())));
        cache
    }

    #[tokio::test(start_paused = true)]
    async fn all_instances_confirm_and_cache_drains() {
        let handler = MockHandler::new([
            ("w1", Script::DoneAfter(0)),
            ("w2", Script::DoneAfter(2)),
            ("w3", Script::DoneAfter(1)),
        ]);
        let cache = cache_of(&["w1", "w2", "w3"]);
        let config = test_config();

        shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap();
        assert!(cache.is_empty());
        assert_eq!(handler.stops.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_names_the_instance_and_keeps_it_cached() {
        let handler = MockHandler::new([
            ("w1", Script::DoneAfter(0)),
            ("w2", Script::NeverDone),
        ]);
        let cache = cache_of(&["w1", "w2"]);
        let config = test_config();

        let start = Instant::now();
        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();

        match &err {
            ShutdownError::Timeout {
                id, elapsed_secs, ..
            } => {
                assert_eq!(id, "w2");
                assert_eq!(*elapsed_secs, 30);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        // timeout=30s, polltime=5s: the budget is exhausted at ~30s virtual time
        assert_eq!(start.elapsed().as_secs(), 30);
        assert!(!cache.contains("w1"));
        assert!(cache.contains("w2"));
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_failure_cancels_siblings_promptly() {
        let handler = MockHandler::new([
            ("bad", Script::StopFails),
            ("slow", Script::NeverDone),
        ]);
        let cache = cache_of(&["bad", "slow"]);
        let mut config = test_config();
        // far larger than the test should ever need: cancellation, not the
        // timeout, must end the sibling's poll loop
        config.timeout = Duration::from_secs(100_000);

        let start = Instant::now();
        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();

        match &err {
            ShutdownError::Mutation { id, .. } => assert_eq!(id, "bad"),
            other => panic!("expected Mutation, got {other:?}"),
        }
        // sibling observed cancellation at its first sleep, not after 100ks
        assert!(start.elapsed() <= config.poll_interval);
        assert!(cache.contains("bad"));
        assert!(cache.contains("slow"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_fails_the_instance() {
        let handler = MockHandler::new([("w1", Script::PollFails(1))]);
        let cache = cache_of(&["w1"]);
        let config = test_config();

        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();
        match &err {
            ShutdownError::Poll { id, source, .. } => {
                assert_eq!(id, "w1");
                assert!(source.to_string().contains("poll transport error"));
            }
            other => panic!("expected Poll, got {other:?}"),
        }
        assert!(cache.contains("w1"));
    }

    #[tokio::test(start_paused = true)]
    async fn already_gone_instance_is_dropped_without_mutation() {
        let handler = MockHandler::new([("ghost", Script::AlreadyGone)]);
        let cache = cache_of(&["ghost"]);
        let config = test_config();

        shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap();
        assert!(cache.is_empty());
        assert_eq!(handler.stops.load(Ordering::SeqCst), 0);
        assert_eq!(handler.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn freshness_failure_is_a_mutation_error() {
        let handler = MockHandler::new([("w1", Script::FreshnessFails)]);
        let cache = cache_of(&["w1"]);
        let config = test_config();

        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();
        assert!(matches!(err, ShutdownError::Mutation { .. }));
        assert!(cache.contains("w1"));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_instances_stay_removed_after_a_sibling_fails() {
        let handler = MockHandler::new([
            ("fast", Script::DoneAfter(0)),
            ("bad", Script::PollFails(1)),
        ]);
        let cache = cache_of(&["bad", "fast"]);
        let config = test_config();

        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();
        assert!(matches!(err, ShutdownError::Poll { .. }));
        // fast confirmed on its first poll, before the sibling's failure
        assert!(!cache.contains("fast"));
        assert!(cache.contains("bad"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_level_cancellation_surfaces_as_cancelled() {
        let handler = MockHandler::new([("w1", Script::NeverDone)]);
        let cache = cache_of(&["w1"]);
        let config = test_config();

        let cancel = config.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            cancel.cancel();
        });

        let err = shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap_err();
        assert!(matches!(err, ShutdownError::Cancelled { kind: "Widgets" }));
        assert!(cache.contains("w1"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_cache_is_a_no_op() {
        let handler = MockHandler::new([]);
        let cache: InstanceCache<()> = InstanceCache::new();
        let config = test_config();

        shutdown_all("Widgets", &config, &cache, &handler)
            .await
            .unwrap();
        assert_eq!(handler.fetches.load(Ordering::SeqCst), 0);
    }
}
