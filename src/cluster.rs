// Cluster endpoint and credential resolution: in-cluster service account first, then kubeconfig.

use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default mount point of the pod's service account secret.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("not running in a cluster: {0} is not set")]
    NotInCluster(&'static str),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing kubeconfig {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("decoding {field}: {source}")]
    Base64 {
        field: &'static str,
        source: base64::DecodeError,
    },
    #[error("no kubeconfig path: set cluster.kubeconfig, KUBECONFIG or HOME")]
    NoKubeconfig,
    #[error("kubeconfig has no current-context")]
    NoCurrentContext,
    #[error("kubeconfig has no {kind} named {name:?}")]
    Missing { kind: &'static str, name: String },
    #[error("user {0:?} sets only one of client certificate and client key")]
    IncompleteClientCert(String),
}

/// Everything the metrics API client needs to reach and authenticate to the API server.
#[derive(Clone, Default)]
pub struct ClusterConfig {
    pub server: String,
    pub token: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate followed by its private key, PEM encoded.
    pub identity_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.is_some())
            .field("identity_pem", &self.identity_pem.is_some())
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

impl ClusterConfig {
    /// In-cluster credentials, else the kubeconfig at `kubeconfig`, `$KUBECONFIG` or `~/.kube/config`.
    pub fn resolve(kubeconfig: Option<&Path>) -> Result<Self, ClusterError> {
        match Self::in_cluster() {
            Ok(config) => {
                tracing::info!(server = %config.server, "Using in-cluster credentials");
                return Ok(config);
            }
            Err(e) => {
                tracing::info!(error = %e, "In-cluster config unavailable, falling back to kubeconfig");
            }
        }
        let path = kubeconfig_path(kubeconfig).ok_or(ClusterError::NoKubeconfig)?;
        let config = Self::from_kubeconfig(&path)?;
        tracing::info!(path = %path.display(), server = %config.server, "Loaded kubeconfig");
        Ok(config)
    }

    pub fn in_cluster() -> Result<Self, ClusterError> {
        Self::in_cluster_from(
            std::env::var("KUBERNETES_SERVICE_HOST").ok(),
            std::env::var("KUBERNETES_SERVICE_PORT").ok(),
            Path::new(SERVICE_ACCOUNT_DIR),
        )
    }

    fn in_cluster_from(
        host: Option<String>,
        port: Option<String>,
        sa_dir: &Path,
    ) -> Result<Self, ClusterError> {
        let host = host
            .filter(|h| !h.is_empty())
            .ok_or(ClusterError::NotInCluster("KUBERNETES_SERVICE_HOST"))?;
        let port = port
            .filter(|p| !p.is_empty())
            .ok_or(ClusterError::NotInCluster("KUBERNETES_SERVICE_PORT"))?;
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };

        let token = read_file(&sa_dir.join("token"))?;
        let token = String::from_utf8_lossy(&token).trim().to_string();
        let ca_path = sa_dir.join("ca.crt");
        let ca_pem = if ca_path.exists() {
            Some(read_file(&ca_path)?)
        } else {
            None
        };

        Ok(Self {
            server: format!("https://{}:{}", host, port),
            token: Some(token),
            ca_pem,
            identity_pem: None,
            insecure_skip_tls_verify: false,
        })
    }

    /// Reads the current context of a kubeconfig file. Relative file references are
    /// resolved against the kubeconfig's directory.
    pub fn from_kubeconfig(path: &Path) -> Result<Self, ClusterError> {
        let raw = read_file(path)?;
        let kubeconfig: Kubeconfig =
            serde_yaml::from_slice(&raw).map_err(|source| ClusterError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        kubeconfig.into_cluster_config(base)
    }
}

fn kubeconfig_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(list) = std::env::var_os("KUBECONFIG").filter(|v| !v.is_empty()) {
        // Only the first entry of a merged KUBECONFIG list is read.
        if let Some(first) = std::env::split_paths(&list).next() {
            return Some(first);
        }
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
}

fn read_file(path: &Path) -> Result<Vec<u8>, ClusterError> {
    std::fs::read(path).map_err(|source| ClusterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_base64(field: &'static str, data: &str) -> Result<Vec<u8>, ClusterError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|source| ClusterError::Base64 { field, source })
}

/// Inline `*-data` wins over the file reference, as kubectl does.
fn inline_or_file(
    field: &'static str,
    data: Option<&str>,
    file: Option<&Path>,
    base: &Path,
) -> Result<Option<Vec<u8>>, ClusterError> {
    if let Some(data) = data {
        return decode_base64(field, data).map(Some);
    }
    file.map(|f| read_file(&base.join(f))).transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: KubeCluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeCluster {
    server: String,
    certificate_authority: Option<PathBuf>,
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: KubeContext,
}

#[derive(Debug, Deserialize)]
struct KubeContext {
    cluster: String,
    #[serde(default)]
    user: String,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: KubeUser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeUser {
    token: Option<String>,
    #[serde(rename = "tokenFile")]
    token_file: Option<PathBuf>,
    client_certificate: Option<PathBuf>,
    client_certificate_data: Option<String>,
    client_key: Option<PathBuf>,
    client_key_data: Option<String>,
}

impl Kubeconfig {
    fn into_cluster_config(self, base: &Path) -> Result<ClusterConfig, ClusterError> {
        let context_name = match self.current_context.filter(|c| !c.is_empty()) {
            Some(name) => name,
            None if self.contexts.len() == 1 => self.contexts[0].name.clone(),
            None => return Err(ClusterError::NoCurrentContext),
        };
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| ClusterError::Missing {
                kind: "context",
                name: context_name.clone(),
            })?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| ClusterError::Missing {
                kind: "cluster",
                name: context.cluster.clone(),
            })?;
        let default_user = KubeUser::default();
        let user = if context.user.is_empty() {
            &default_user
        } else {
            self.users
                .iter()
                .find(|u| u.name == context.user)
                .map(|u| &u.user)
                .ok_or_else(|| ClusterError::Missing {
                    kind: "user",
                    name: context.user.clone(),
                })?
        };

        let ca_pem = inline_or_file(
            "certificate-authority-data",
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base,
        )?;

        let token = match (&user.token, &user.token_file) {
            (Some(token), _) => Some(token.trim().to_string()),
            (None, Some(file)) => {
                let raw = read_file(&base.join(file))?;
                Some(String::from_utf8_lossy(&raw).trim().to_string())
            }
            (None, None) => None,
        };

        let cert = inline_or_file(
            "client-certificate-data",
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
            base,
        )?;
        let key = inline_or_file(
            "client-key-data",
            user.client_key_data.as_deref(),
            user.client_key.as_deref(),
            base,
        )?;
        let identity_pem = match (cert, key) {
            (Some(mut cert), Some(key)) => {
                if !cert.ends_with(b"\n") {
                    cert.push(b'\n');
                }
                cert.extend_from_slice(&key);
                Some(cert)
            }
            (None, None) => None,
            _ => return Err(ClusterError::IncompleteClientCert(context.user.clone())),
        };

        if token.is_none() && identity_pem.is_none() {
            tracing::warn!(
                context = %context_name,
                "kubeconfig user has no token or client certificate; requests will be unauthenticated"
            );
        }

        Ok(ClusterConfig {
            server: cluster.server.trim_end_matches('/').to_string(),
            token,
            ca_pem,
            identity_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        })
    }
}
