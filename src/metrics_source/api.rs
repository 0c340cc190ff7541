// metrics.k8s.io/v1beta1 client over reqwest

use super::{ALL_NAMESPACES, MetricsSource, SourceError};
use crate::cluster::ClusterConfig;
use crate::models::{ContainerUsage, NodeUsage, PodUsage, Quantity};
use crate::version;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

const API_PREFIX: &str = "apis/metrics.k8s.io/v1beta1";

/// Longest error body kept in [`SourceError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub struct MetricsApiClient {
    http: reqwest::Client,
    server: String,
    token: Option<String>,
}

impl MetricsApiClient {
    /// `request_timeout` caps each HTTP exchange, independent of any caller-side bound.
    pub fn new(cluster: &ClusterConfig, request_timeout: Duration) -> Result<Self, SourceError> {
        let mut builder = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(version::user_agent())
            .danger_accept_invalid_certs(cluster.insecure_skip_tls_verify);
        if let Some(pem) = &cluster.ca_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }
        if let Some(pem) = &cluster.identity_pem {
            builder = builder.identity(reqwest::Identity::from_pem(pem)?);
        }
        Ok(Self {
            http: builder.build()?,
            server: cluster.server.trim_end_matches('/').to_string(),
            token: cluster.token.clone(),
        })
    }

    pub fn nodes_url(&self) -> String {
        format!("{}/{}/nodes", self.server, API_PREFIX)
    }

    pub fn pods_url(&self, namespace: &str) -> String {
        if namespace == ALL_NAMESPACES {
            format!("{}/{}/pods", self.server, API_PREFIX)
        } else {
            format!("{}/{}/namespaces/{}/pods", self.server, API_PREFIX, namespace)
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>, SourceError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(SourceError::Status { status, body });
        }
        let bytes = response.bytes().await?;
        let list: MetricsList<T> = serde_json::from_slice(&bytes)?;
        Ok(list.items)
    }
}

#[async_trait]
impl MetricsSource for MetricsApiClient {
    #[instrument(skip(self), fields(source = "metrics-api", operation = "list_node_usage"))]
    async fn list_node_usage(&self) -> Result<Vec<NodeUsage>, SourceError> {
        let items: Vec<NodeMetrics> = self.get_list(self.nodes_url()).await?;
        Ok(items.into_iter().map(NodeUsage::from).collect())
    }

    #[instrument(skip(self), fields(source = "metrics-api", operation = "list_pod_usage"))]
    async fn list_pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, SourceError> {
        let items: Vec<PodMetrics> = self.get_list(self.pods_url(namespace)).await?;
        Ok(items.into_iter().map(PodUsage::from).collect())
    }
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

// Wire shapes of NodeMetricsList / PodMetricsList. Unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct MetricsList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceList {
    #[serde(default)]
    cpu: Quantity,
    #[serde(default)]
    memory: Quantity,
}

#[derive(Debug, Deserialize)]
struct NodeMetrics {
    #[serde(default)]
    metadata: ObjectMeta,
    timestamp: Option<String>,
    window: Option<String>,
    #[serde(default)]
    usage: ResourceList,
}

#[derive(Debug, Deserialize)]
struct PodMetrics {
    #[serde(default)]
    metadata: ObjectMeta,
    timestamp: Option<String>,
    window: Option<String>,
    #[serde(default)]
    containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetrics {
    #[serde(default)]
    name: String,
    #[serde(default)]
    usage: ResourceList,
}

impl From<NodeMetrics> for NodeUsage {
    fn from(m: NodeMetrics) -> Self {
        NodeUsage {
            name: m.metadata.name,
            cpu: m.usage.cpu,
            memory: m.usage.memory,
            timestamp: m.timestamp,
            window: m.window,
        }
    }
}

impl From<PodMetrics> for PodUsage {
    fn from(m: PodMetrics) -> Self {
        PodUsage {
            namespace: m.metadata.namespace,
            name: m.metadata.name,
            containers: m
                .containers
                .into_iter()
                .map(|c| ContainerUsage {
                    name: c.name,
                    cpu: c.usage.cpu,
                    memory: c.usage.memory,
                })
                .collect(),
            timestamp: m.timestamp,
            window: m.window,
        }
    }
}
