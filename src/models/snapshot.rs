// Aggregate snapshot published once per collection cycle

use serde::{Deserialize, Serialize};

use super::{NodeUsage, PodUsage};

/// One complete capture of node and pod usage. Built whole by the collector and
/// never mutated after it is handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub nodes: Vec<NodeUsage>,
    pub pods: Vec<PodUsage>,
    /// Unix time in milliseconds when the cycle finished fetching.
    pub collected_at: u64,
}

impl Snapshot {
    pub fn new(nodes: Vec<NodeUsage>, pods: Vec<PodUsage>) -> Self {
        Self {
            nodes,
            pods,
            collected_at: now_millis(),
        }
    }
}

/// Current unix time in milliseconds; 0 if the clock is before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}
