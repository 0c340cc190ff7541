// Snapshot store tests: readiness and publish atomicity under concurrent readers

use kmonitor::models::{NodeUsage, PodUsage, Snapshot};
use kmonitor::store::SnapshotStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Snapshot whose node and pod lists both have `n` entries tagged with `n`.
fn generation(n: usize) -> Snapshot {
    let nodes = (0..n)
        .map(|i| NodeUsage::new(format!("gen{}-node{}", n, i), "1m", "1Mi"))
        .collect();
    let pods = (0..n)
        .map(|i| PodUsage::new(format!("gen{}", n), format!("pod{}", i), vec![]))
        .collect();
    Snapshot::new(nodes, pods)
}

#[test]
fn readiness_is_one_way() {
    let store = SnapshotStore::new();
    assert!(!store.is_ready());
    store.publish(generation(1));
    assert!(store.is_ready());
    for n in 2..5 {
        store.publish(generation(n));
        assert!(store.is_ready());
    }
    assert_eq!(store.read().unwrap().nodes.len(), 4);
}

#[test]
fn concurrent_readers_never_see_torn_snapshots() {
    let store = Arc::new(SnapshotStore::new());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut last_seen = 0usize;
                while !done.load(Ordering::Acquire) {
                    if let Some(s) = store.read() {
                        let n = s.nodes.len();
                        assert_eq!(n, s.pods.len());
                        let tag = format!("gen{}", n);
                        assert!(s.nodes.iter().all(|node| node.name.starts_with(&tag)));
                        assert!(s.pods.iter().all(|pod| pod.namespace == tag));
                        // Publishes are ordered; a reader never goes back in time.
                        assert!(n >= last_seen);
                        last_seen = n;
                    }
                }
            })
        })
        .collect();

    for n in 1..=300 {
        store.publish(generation(n));
    }
    done.store(true, Ordering::Release);

    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(store.read().unwrap().nodes.len(), 300);
}
