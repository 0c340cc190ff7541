// Shared test helpers: a scripted in-memory metrics source and sample data
#![allow(dead_code)]

use async_trait::async_trait;
use kmonitor::metrics_source::{MetricsSource, SourceError};
use kmonitor::models::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn sample_nodes() -> Vec<NodeUsage> {
    vec![
        NodeUsage::new("node-a", "250m", "1024Mi"),
        NodeUsage::new("node-b", "1200m", "3Gi"),
        NodeUsage::new("node-c", "75m", "512Mi"),
    ]
}

/// Two pods; the second one runs two containers.
pub fn sample_pods() -> Vec<PodUsage> {
    vec![
        PodUsage::new(
            "default",
            "web-0",
            vec![ContainerUsage::new("web", "10m", "32Mi")],
        ),
        PodUsage::new(
            "kube-system",
            "coredns-1",
            vec![
                ContainerUsage::new("coredns", "3m", "17Mi"),
                ContainerUsage::new("sidecar", "1m", "6Mi"),
            ],
        ),
    ]
}

/// Metrics source whose answers can be swapped between cycles.
pub struct FakeSource {
    nodes: Mutex<Result<Vec<NodeUsage>, String>>,
    pods: Mutex<Result<Vec<PodUsage>, String>>,
    node_delay: Mutex<Option<Duration>>,
    node_calls: AtomicUsize,
    pod_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(nodes: Vec<NodeUsage>, pods: Vec<PodUsage>) -> Self {
        Self {
            nodes: Mutex::new(Ok(nodes)),
            pods: Mutex::new(Ok(pods)),
            node_delay: Mutex::new(None),
            node_calls: AtomicUsize::new(0),
            pod_calls: AtomicUsize::new(0),
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_nodes(), sample_pods())
    }

    /// Every node fetch sleeps this long before answering.
    pub fn with_node_delay(self, delay: Duration) -> Self {
        self.set_node_delay(Some(delay));
        self
    }

    /// Applies to node fetches that start after this call.
    pub fn set_node_delay(&self, delay: Option<Duration>) {
        *self.node_delay.lock().unwrap() = delay;
    }

    pub fn set_nodes(&self, nodes: Result<Vec<NodeUsage>, &str>) {
        *self.nodes.lock().unwrap() = nodes.map_err(str::to_string);
    }

    pub fn set_pods(&self, pods: Result<Vec<PodUsage>, &str>) {
        *self.pods.lock().unwrap() = pods.map_err(str::to_string);
    }

    pub fn node_calls(&self) -> usize {
        self.node_calls.load(Ordering::SeqCst)
    }

    pub fn pod_calls(&self) -> usize {
        self.pod_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for FakeSource {
    async fn list_node_usage(&self) -> Result<Vec<NodeUsage>, SourceError> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.node_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.nodes.lock().unwrap().clone().map_err(SourceError::Other)
    }

    async fn list_pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, SourceError> {
        assert_eq!(namespace, "", "collector must list pods across all namespaces");
        self.pod_calls.fetch_add(1, Ordering::SeqCst);
        self.pods.lock().unwrap().clone().map_err(SourceError::Other)
    }
}
