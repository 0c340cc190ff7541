// Latest-snapshot store shared between the collector and HTTP handlers.
// A held snapshot is never replaced by "nothing", so readiness is one-way.

use crate::models::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held snapshot wholesale. Readers holding the previous `Arc` keep a
    /// consistent view of it until they drop it.
    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        // The guarded value is a single pointer swap; a poisoned lock cannot hold a torn snapshot.
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(next);
    }

    /// Latest published snapshot, or `None` while not ready.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
