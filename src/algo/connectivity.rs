//! Incremental connectivity verdicts
//!
//! The cache subscribes to every subgraph it answers for and reacts to
//! structural events instead of recomputing on every query:
//!
//! | event | cached `true` | cached `false` |
//! |---|---|---|
//! | edge added | kept | dropped |
//! | edge deleted | dropped | kept |
//! | node added | dropped | dropped |
//! | node deleted | dropped | dropped |
//!
//! Dropping a verdict also ends the subscription; the next query
//! recomputes and subscribes again. When the subgraph is destroyed the
//! entry is discarded.

use super::is_connected;
use crate::graph::{
    Disposition, Element, Event, EventKind, GraphResult, GraphStore, Listener, ListenerId,
    SubgraphId,
};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Default)]
struct CacheState {
    verdicts: FxHashMap<SubgraphId, bool>,
    subscribed: FxHashMap<SubgraphId, ListenerId>,
}

/// Caches [`is_connected`] per subgraph
#[derive(Debug, Default)]
pub struct ConnectivityCache {
    state: Mutex<CacheState>,
}

impl ConnectivityCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connectivity of `sg`, from the cache when a verdict is still valid
    pub fn is_connected(self: &Arc<Self>, store: &GraphStore, sg: SubgraphId) -> GraphResult<bool> {
        if let Some(verdict) = self.cached(sg) {
            return Ok(verdict);
        }
        let verdict = is_connected(store, sg)?;

        let needs_subscription = {
            let mut state = self.state();
            state.verdicts.insert(sg, verdict);
            !state.subscribed.contains_key(&sg)
        };
        if needs_subscription {
            let listener: Arc<dyn Listener> = self.clone();
            let id = store.subscribe(sg, listener)?;
            self.state().subscribed.insert(sg, id);
        }
        trace!(subgraph = %sg, verdict, "computed connectivity");
        Ok(verdict)
    }

    /// The cached verdict for `sg`, if any
    pub fn cached(&self, sg: SubgraphId) -> Option<bool> {
        self.state().verdicts.get(&sg).copied()
    }

    /// Whether the cache currently listens to `sg`
    pub fn is_subscribed(&self, sg: SubgraphId) -> bool {
        self.state().subscribed.contains_key(&sg)
    }

    pub fn len(&self) -> usize {
        self.state().verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Listener for ConnectivityCache {
    fn on_event(&self, event: &Event) -> Disposition {
        let Some(sg) = event.subgraph() else {
            return Disposition::Keep;
        };
        let mut state = self.state();

        if event.is_destroy() {
            state.verdicts.remove(&sg);
            state.subscribed.remove(&sg);
            return Disposition::Unsubscribe;
        }

        let cached = state.verdicts.get(&sg).copied();
        let keep = match (&event.kind, cached) {
            (EventKind::ElementAdded(Element::Edge(_)), Some(true)) => true,
            (EventKind::ElementDeleted(Element::Edge(_)), Some(false)) => true,
            (EventKind::ElementAdded(_), _) | (EventKind::ElementDeleted(_), _) => false,
            _ => true,
        };
        if keep {
            return Disposition::Keep;
        }

        trace!(subgraph = %sg, event = ?event.kind, "connectivity verdict invalidated");
        state.verdicts.remove(&sg);
        state.subscribed.remove(&sg);
        Disposition::Unsubscribe
    }
}
