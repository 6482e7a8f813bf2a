#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use strata::graph::{Disposition, EntityId, Event, EventKind, GraphStore, ListenerId, NodeId, SubgraphId};

pub type Seen = Arc<Mutex<Vec<EventKind>>>;

/// Subscribe a listener that records every event kind it receives
pub fn record(store: &GraphStore, entity: impl Into<EntityId>) -> (Seen, ListenerId) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = store
        .subscribe(
            entity,
            Arc::new(move |e: &Event| {
                sink.lock().unwrap().push(e.kind.clone());
                Disposition::Keep
            }),
        )
        .unwrap();
    (seen, id)
}

pub fn take(seen: &Seen) -> Vec<EventKind> {
    std::mem::take(&mut *seen.lock().unwrap())
}

/// Nodes A..E with edges A-B, A-C, B-D, C-E, D-E
pub fn five_nodes() -> (GraphStore, [NodeId; 5]) {
    let mut store = GraphStore::new();
    let root = SubgraphId::ROOT;
    let n = store.add_nodes(root, 5).unwrap();
    let nodes = [n[0], n[1], n[2], n[3], n[4]];
    let [a, b, c, d, e] = nodes;
    for (src, dst) in [(a, b), (a, c), (b, d), (c, e), (d, e)] {
        store.add_edge(root, src, dst).unwrap();
    }
    (store, nodes)
}
