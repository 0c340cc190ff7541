// Kubernetes resource quantity, passed through verbatim

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw quantity string as reported by the metrics source (e.g. "250m", "1024Ki").
/// No unit parsing or arithmetic happens on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Quantity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
