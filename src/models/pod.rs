// Pod and container usage models

use serde::{Deserialize, Serialize};

use super::Quantity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerUsage {
    pub name: String,
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl ContainerUsage {
    pub fn new(name: impl Into<String>, cpu: impl Into<Quantity>, memory: impl Into<Quantity>) -> Self {
        Self {
            name: name.into(),
            cpu: cpu.into(),
            memory: memory.into(),
        }
    }
}

/// Per-pod usage; containers keep the order reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodUsage {
    pub namespace: String,
    pub name: String,
    pub containers: Vec<ContainerUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

impl PodUsage {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        containers: Vec<ContainerUsage>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            containers,
            timestamp: None,
            window: None,
        }
    }
}
