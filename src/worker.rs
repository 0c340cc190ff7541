// Background collector: one fetch-nodes, fetch-pods, publish cycle per tick.
// Cycles never overlap; a failed cycle publishes nothing and the loop carries on.

use crate::metrics_source::{ALL_NAMESPACES, MetricsSource, SourceError};
use crate::models::Snapshot;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::Instrument;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Collector timing.
#[derive(Debug, Clone, Copy)]
pub struct CollectorConfig {
    pub interval: Duration,
    /// Upper bound for each upstream call, so a hung API server cannot stall the loop.
    pub fetch_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("{operation} failed: {source}")]
    Fetch {
        operation: &'static str,
        #[source]
        source: SourceError,
    },
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl CollectError {
    pub fn operation(&self) -> &'static str {
        match self {
            CollectError::Fetch { operation, .. } | CollectError::Timeout { operation, .. } => {
                operation
            }
        }
    }
}

pub struct Collector {
    source: Arc<dyn MetricsSource>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(source: Arc<dyn MetricsSource>, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    /// Runs one cycle: nodes, then pods across all namespaces. Returns a snapshot only
    /// when both fetches succeed.
    pub async fn collect_once(&self) -> Result<Snapshot, CollectError> {
        let nodes = bounded(
            "list_node_usage",
            self.config.fetch_timeout,
            self.source.list_node_usage(),
        )
        .await?;
        let pods = bounded(
            "list_pod_usage",
            self.config.fetch_timeout,
            self.source.list_pod_usage(ALL_NAMESPACES),
        )
        .await?;
        Ok(Snapshot::new(nodes, pods))
    }

    /// Spawns the collection loop. The first cycle starts immediately, then one per
    /// interval; `on_snapshot` runs once per successful cycle, inside that cycle.
    pub fn start<F>(self, mut on_snapshot: F) -> CollectorHandle
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval_secs = self.config.interval.as_secs();
        let collector_span = tracing::span!(tracing::Level::DEBUG, "collector", interval_secs);

        let task = tokio::spawn(async move {
            // tokio's interval panics on a zero period.
            let mut tick = interval(self.config.interval.max(MIN_INTERVAL));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(interval_secs, "Metrics collection started");

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = tick.tick() => {
                        // A stop issued while the tick was pending wins over starting a cycle.
                        if *stop_rx.borrow() {
                            break;
                        }
                        match self.collect_once().await {
                            Ok(snapshot) => {
                                tracing::debug!(
                                    nodes = snapshot.nodes.len(),
                                    pods = snapshot.pods.len(),
                                    "Metrics collected"
                                );
                                on_snapshot(snapshot);
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    operation = e.operation(),
                                    "Metrics collection failed"
                                );
                            }
                        }
                    }
                }
            }
            tracing::info!("Stopping metrics collection");
        }
        .instrument(collector_span));

        CollectorHandle {
            stop_tx,
            task: Some(task),
        }
    }
}

async fn bounded<T>(
    operation: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, CollectError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(source)) => Err(CollectError::Fetch { operation, source }),
        Err(_) => Err(CollectError::Timeout { operation, timeout }),
    }
}

/// Stop handle returned by [`Collector::start`].
pub struct CollectorHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    /// Asks the loop to exit after its current cycle. Returns `true` for the call that
    /// actually stopped the loop; repeated calls are a no-op returning `false`.
    pub fn stop(&self) -> bool {
        self.stop_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Stops the loop and waits for an in-progress cycle to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "collector task ended abnormally");
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
