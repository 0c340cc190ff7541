use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub collection: CollectionConfig,
    #[serde(default)]
    pub cluster: ClusterSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// How long in-flight requests may run after a shutdown signal before the server is force-closed.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Longest a single request may run before it is answered with 408.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    pub interval_secs: u64,
    /// Upper bound on each metrics API call (nodes, pods).
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

/// Credential source used when not running inside a cluster.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSection {
    pub kubeconfig: Option<PathBuf>,
}

impl CollectionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.server.shutdown_grace_secs > 0,
            "server.shutdown_grace_secs must be > 0, got {}",
            self.server.shutdown_grace_secs
        );
        anyhow::ensure!(
            self.server.request_timeout_secs > 0,
            "server.request_timeout_secs must be > 0, got {}",
            self.server.request_timeout_secs
        );
        anyhow::ensure!(
            self.collection.interval_secs > 0,
            "collection.interval_secs must be > 0, got {}",
            self.collection.interval_secs
        );
        anyhow::ensure!(
            self.collection.fetch_timeout_secs > 0,
            "collection.fetch_timeout_secs must be > 0, got {}",
            self.collection.fetch_timeout_secs
        );
        if let Some(path) = &self.cluster.kubeconfig {
            anyhow::ensure!(
                !path.as_os_str().is_empty(),
                "cluster.kubeconfig must be non-empty when set"
            );
        }
        Ok(())
    }
}
