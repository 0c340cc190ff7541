// Metrics source seam: anything that can list node and pod usage.

mod api;

pub use api::MetricsApiClient;

use crate::models::{NodeUsage, PodUsage};
use async_trait::async_trait;

/// Namespace argument meaning "every namespace".
pub const ALL_NAMESPACES: &str = "";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metrics API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Reported by sources that are not backed by HTTP (fakes, adapters).
    #[error("{0}")]
    Other(String),
}

/// Supplies raw usage lists to the collector. Callers bound each call with their own
/// timeout; implementations should stop work promptly when the future is dropped.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn list_node_usage(&self) -> Result<Vec<NodeUsage>, SourceError>;

    /// `namespace` of [`ALL_NAMESPACES`] lists pods cluster-wide.
    async fn list_pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, SourceError>;
}
