// Node usage model

use serde::{Deserialize, Serialize};

use super::Quantity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUsage {
    pub name: String,
    pub cpu: Quantity,
    pub memory: Quantity,
    /// Sample time reported by the source (RFC 3339), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Sampling window reported by the source (e.g. "20s"), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

impl NodeUsage {
    pub fn new(name: impl Into<String>, cpu: impl Into<Quantity>, memory: impl Into<Quantity>) -> Self {
        Self {
            name: name.into(),
            cpu: cpu.into(),
            memory: memory.into(),
            timestamp: None,
            window: None,
        }
    }
}
