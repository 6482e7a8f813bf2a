//! Incremental minimum and maximum of numeric properties
//!
//! The cache answers "smallest and largest value of a property over the
//! nodes (or edges) of a subgraph" and keeps each answer until an event
//! shows it may be stale. Besides the two extremes an entry remembers the
//! elements holding them, its witnesses:
//!
//! | event | entry |
//! |---|---|
//! | value changed (matching kind) | dropped |
//! | value changed of an element that left the subgraph | kept |
//! | all values changed | dropped |
//! | element added (matching kind) | dropped |
//! | element deleted, a witness | dropped |
//! | element deleted, not a witness | kept |
//!
//! Deleting a non-witness leaves both extremes attained, so the entry is
//! still exact. The value reset that follows a deletion is recognised
//! because the entry remembers which elements left. Size and coordinate
//! values are ranged per component.

use crate::graph::{
    Disposition, Element, ElementKind, EntityId, Event, EventKind, GraphError, GraphResult,
    GraphStore, Listener, ListenerId, PropertyId, PropertyType, PropertyValue, SubgraphId,
};
use crate::graph::{EdgeId, NodeId, Vec3};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Smallest and largest value of a property over a subgraph
#[derive(Debug, Clone, PartialEq)]
pub struct MinMax {
    pub min: PropertyValue,
    pub max: PropertyValue,
}

type Key = (PropertyId, SubgraphId, ElementKind);

#[derive(Debug, Clone)]
struct Entry {
    /// `None` when the subgraph holds no element of the kind
    range: Option<MinMax>,
    witnesses: Vec<Element>,
    /// Elements deleted from the subgraph since the range was computed
    departed: Vec<Element>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<Key, Entry>,
    subscribed: FxHashMap<EntityId, ListenerId>,
}

impl CacheState {
    fn references(&self, entity: EntityId) -> bool {
        self.entries.keys().any(|&(p, g, _)| match entity {
            EntityId::Property(q) => p == q,
            EntityId::Subgraph(h) => g == h,
        })
    }
}

/// Caches numeric property ranges per subgraph
#[derive(Debug, Default)]
pub struct MinMaxCache {
    state: Mutex<CacheState>,
}

impl MinMaxCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Range of `prop` over the nodes of `sg`
    pub fn node_range(
        self: &Arc<Self>,
        store: &GraphStore,
        prop: PropertyId,
        sg: SubgraphId,
    ) -> GraphResult<Option<MinMax>> {
        self.range(store, prop, sg, ElementKind::Node)
    }

    /// Range of `prop` over the edges of `sg`
    pub fn edge_range(
        self: &Arc<Self>,
        store: &GraphStore,
        prop: PropertyId,
        sg: SubgraphId,
    ) -> GraphResult<Option<MinMax>> {
        self.range(store, prop, sg, ElementKind::Edge)
    }

    /// Whether a range for this combination is currently cached
    pub fn is_cached(&self, prop: PropertyId, sg: SubgraphId, kind: ElementKind) -> bool {
        self.state().entries.contains_key(&(prop, sg, kind))
    }

    /// Whether the cache currently listens to `entity`
    pub fn is_subscribed(&self, entity: impl Into<EntityId>) -> bool {
        self.state().subscribed.contains_key(&entity.into())
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn range(
        self: &Arc<Self>,
        store: &GraphStore,
        prop: PropertyId,
        sg: SubgraphId,
        kind: ElementKind,
    ) -> GraphResult<Option<MinMax>> {
        let key = (prop, sg, kind);
        if let Some(entry) = self.state().entries.get(&key) {
            return Ok(entry.range.clone());
        }
        let entry = compute(store, prop, sg, kind)?;
        let range = entry.range.clone();

        let missing: Vec<EntityId> = {
            let mut state = self.state();
            state.entries.insert(key, entry);
            [EntityId::Property(prop), EntityId::Subgraph(sg)]
                .into_iter()
                .filter(|e| !state.subscribed.contains_key(e))
                .collect()
        };
        for entity in missing {
            let listener: Arc<dyn Listener> = self.clone();
            let id = store.subscribe(entity, listener)?;
            self.state().subscribed.insert(entity, id);
        }
        trace!(property = %prop, subgraph = %sg, ?kind, "computed range");
        Ok(range)
    }
}

impl Listener for MinMaxCache {
    fn on_event(&self, event: &Event) -> Disposition {
        let entity = event.entity;
        let mut state = self.state();

        if event.is_destroy() {
            state.entries.retain(|&(p, g, _), _| match entity {
                EntityId::Property(q) => p != q,
                EntityId::Subgraph(h) => g != h,
            });
            state.subscribed.remove(&entity);
            return Disposition::Unsubscribe;
        }

        let before = state.entries.len();
        match (entity, &event.kind) {
            (EntityId::Property(q), EventKind::ValueChanged(el)) => {
                let kind = el.kind();
                state
                    .entries
                    .retain(|&(p, _, k), entry| !(p == q && k == kind) || entry.departed.contains(el));
            }
            (EntityId::Property(q), EventKind::ValueChangedAll) => {
                state.entries.retain(|&(p, _, _), _| p != q);
            }
            (EntityId::Subgraph(h), EventKind::ElementAdded(el)) => {
                let kind = el.kind();
                state.entries.retain(|&(_, g, k), _| !(g == h && k == kind));
            }
            (EntityId::Subgraph(h), EventKind::ElementDeleted(el)) => {
                let kind = el.kind();
                state.entries.retain(|&(_, g, k), entry| {
                    if g != h || k != kind {
                        return true;
                    }
                    if entry.witnesses.contains(el) {
                        return false;
                    }
                    entry.departed.push(*el);
                    true
                });
            }
            _ => {}
        }
        if state.entries.len() != before {
            trace!(entity = %entity, event = ?event.kind, "ranges invalidated");
        }

        if state.references(entity) {
            Disposition::Keep
        } else {
            state.subscribed.remove(&entity);
            Disposition::Unsubscribe
        }
    }
}

/// Running extremes of `N` components, with the element holding each
struct Extremes<T, const N: usize> {
    min: [(T, Element); N],
    max: [(T, Element); N],
}

impl<T: PartialOrd + Copy, const N: usize> Extremes<T, N> {
    fn scan(values: impl Iterator<Item = (Element, [T; N])>) -> Option<Self> {
        let mut acc: Option<Self> = None;
        for (el, lanes) in values {
            // NaN compares with nothing and never becomes an extreme
            if lanes.iter().any(|v| v.partial_cmp(v).is_none()) {
                continue;
            }
            match acc.as_mut() {
                None => {
                    acc = Some(Extremes {
                        min: lanes.map(|v| (v, el)),
                        max: lanes.map(|v| (v, el)),
                    })
                }
                Some(x) => {
                    for (i, &v) in lanes.iter().enumerate() {
                        if v < x.min[i].0 {
                            x.min[i] = (v, el);
                        }
                        if v > x.max[i].0 {
                            x.max[i] = (v, el);
                        }
                    }
                }
            }
        }
        acc
    }

    fn witnesses(&self) -> Vec<Element> {
        let mut out: Vec<Element> = self.min.iter().chain(self.max.iter()).map(|&(_, el)| el).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn lanes(&self) -> ([T; N], [T; N]) {
        (self.min.map(|(v, _)| v), self.max.map(|(v, _)| v))
    }
}

fn compute(store: &GraphStore, prop: PropertyId, sg: SubgraphId, kind: ElementKind) -> GraphResult<Entry> {
    let property = store.get_property(prop)?;
    let view = store.subgraph(sg)?;
    let elements: Vec<(Element, PropertyValue)> = match kind {
        ElementKind::Node => view
            .nodes()
            .map(|n: NodeId| (Element::Node(n), property.node_value(n)))
            .collect(),
        ElementKind::Edge => view
            .edges()
            .map(|e: EdgeId| (Element::Edge(e), property.edge_value(e)))
            .collect(),
    };

    let ty = property.property_type();
    let (range, witnesses) = match ty {
        PropertyType::Integer => {
            let lanes = elements.iter().filter_map(|(el, v)| v.as_integer().map(|i| (*el, [i])));
            match Extremes::scan(lanes) {
                Some(x) => {
                    let ([min], [max]) = x.lanes();
                    (Some(MinMax { min: min.into(), max: max.into() }), x.witnesses())
                }
                None => (None, Vec::new()),
            }
        }
        PropertyType::Float => {
            let lanes = elements.iter().filter_map(|(el, v)| v.as_float().map(|f| (*el, [f])));
            match Extremes::scan(lanes) {
                Some(x) => {
                    let ([min], [max]) = x.lanes();
                    (Some(MinMax { min: min.into(), max: max.into() }), x.witnesses())
                }
                None => (None, Vec::new()),
            }
        }
        PropertyType::Coord | PropertyType::Size => {
            let lanes = elements.iter().filter_map(|(el, v)| match v {
                PropertyValue::Coord(p) | PropertyValue::Size(p) => Some((*el, [p.x, p.y, p.z])),
                _ => None,
            });
            match Extremes::scan(lanes) {
                Some(x) => {
                    let ([a, b, c], [d, e, f]) = x.lanes();
                    let wrap = |v: Vec3| match ty {
                        PropertyType::Coord => PropertyValue::Coord(v),
                        _ => PropertyValue::Size(v),
                    };
                    (
                        Some(MinMax {
                            min: wrap(Vec3::new(a, b, c)),
                            max: wrap(Vec3::new(d, e, f)),
                        }),
                        x.witnesses(),
                    )
                }
                None => (None, Vec::new()),
            }
        }
        other => {
            return Err(GraphError::invalid(format!(
                "{} properties have no numeric range",
                other
            )))
        }
    };
    Ok(Entry {
        range,
        witnesses,
        departed: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked() -> (GraphStore, PropertyId, Vec<NodeId>) {
        let mut store = GraphStore::new();
        let root = SubgraphId::ROOT;
        let n = store.add_nodes(root, 4).unwrap();
        let rank = store.create_property(root, "rank", PropertyType::Integer).unwrap();
        for (i, &node) in n.iter().enumerate() {
            store.set_node_value(rank, node, PropertyValue::Integer(i as i64 * 10)).unwrap();
        }
        (store, rank, n)
    }

    fn int_range(min: i64, max: i64) -> Option<MinMax> {
        Some(MinMax {
            min: min.into(),
            max: max.into(),
        })
    }

    #[test]
    fn test_node_range() {
        let (store, rank, _) = ranked();
        let cache = MinMaxCache::new();
        let root = SubgraphId::ROOT;
        assert_eq!(cache.node_range(&store, rank, root).unwrap(), int_range(0, 30));
        assert!(cache.is_cached(rank, root, ElementKind::Node));
        assert!(cache.is_subscribed(rank));
        assert!(cache.is_subscribed(root));
    }

    #[test]
    fn test_value_change_invalidates() {
        let (mut store, rank, n) = ranked();
        let cache = MinMaxCache::new();
        let root = SubgraphId::ROOT;
        cache.node_range(&store, rank, root).unwrap();

        store.set_node_value(rank, n[1], PropertyValue::Integer(-5)).unwrap();
        assert!(!cache.is_cached(rank, root, ElementKind::Node));
        assert_eq!(cache.node_range(&store, rank, root).unwrap(), int_range(-5, 30));
    }

    #[test]
    fn test_deleting_a_witness_invalidates() {
        let (mut store, rank, n) = ranked();
        let cache = MinMaxCache::new();
        let root = SubgraphId::ROOT;
        cache.node_range(&store, rank, root).unwrap();

        // n[1] holds neither extreme; its value reset does not count
        store.delete_node(root, n[1], true).unwrap();
        assert!(cache.is_cached(rank, root, ElementKind::Node));
        assert_eq!(cache.node_range(&store, rank, root).unwrap(), int_range(0, 30));

        store.delete_node(root, n[3], true).unwrap();
        assert!(!cache.is_cached(rank, root, ElementKind::Node));
        assert_eq!(cache.node_range(&store, rank, root).unwrap(), int_range(0, 20));
    }

    #[test]
    fn test_added_node_invalidates() {
        let (mut store, rank, _) = ranked();
        let cache = MinMaxCache::new();
        let root = SubgraphId::ROOT;
        cache.node_range(&store, rank, root).unwrap();
        store.add_node(root).unwrap();
        assert!(!cache.is_cached(rank, root, ElementKind::Node));
        assert!(!cache.is_subscribed(root));
    }

    #[test]
    fn test_ranges_per_subgraph() {
        let (mut store, rank, n) = ranked();
        let cache = MinMaxCache::new();
        let low = store
            .create_induced_subgraph(SubgraphId::ROOT, &n[..2], "low")
            .unwrap();
        assert_eq!(cache.node_range(&store, rank, low).unwrap(), int_range(0, 10));

        let empty = store.create_subgraph(SubgraphId::ROOT, "empty").unwrap();
        assert_eq!(cache.node_range(&store, rank, empty).unwrap(), None);

        store.remove_subgraph(low).unwrap();
        assert!(!cache.is_cached(rank, low, ElementKind::Node));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_size_ranges_per_component() {
        let mut store = GraphStore::new();
        let root = SubgraphId::ROOT;
        let a = store.add_node(root).unwrap();
        let b = store.add_node(root).unwrap();
        let e = store.add_edge(root, a, b).unwrap();
        let f = store.add_edge(root, b, a).unwrap();
        let size = store.create_property(root, "size", PropertyType::Size).unwrap();
        store.set_edge_value(size, e, PropertyValue::Size(Vec3::new(1.0, 5.0, 0.0))).unwrap();
        store.set_edge_value(size, f, PropertyValue::Size(Vec3::new(3.0, 2.0, f64::NAN))).unwrap();

        let cache = MinMaxCache::new();
        // the NaN size is skipped
        assert_eq!(
            cache.edge_range(&store, size, root).unwrap(),
            Some(MinMax {
                min: PropertyValue::Size(Vec3::new(1.0, 5.0, 0.0)),
                max: PropertyValue::Size(Vec3::new(1.0, 5.0, 0.0)),
            })
        );
        store.set_edge_value(size, f, PropertyValue::Size(Vec3::new(3.0, 2.0, 1.0))).unwrap();
        assert_eq!(
            cache.edge_range(&store, size, root).unwrap(),
            Some(MinMax {
                min: PropertyValue::Size(Vec3::new(1.0, 2.0, 0.0)),
                max: PropertyValue::Size(Vec3::new(3.0, 5.0, 1.0)),
            })
        );
    }

    #[test]
    fn test_non_numeric_property() {
        let mut store = GraphStore::new();
        let label = store
            .create_property(SubgraphId::ROOT, "label", PropertyType::String)
            .unwrap();
        let cache = MinMaxCache::new();
        assert!(matches!(
            cache.node_range(&store, label, SubgraphId::ROOT),
            Err(GraphError::InvalidOperation(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_erased_property_is_forgotten() {
        let (mut store, rank, _) = ranked();
        let cache = MinMaxCache::new();
        cache.node_range(&store, rank, SubgraphId::ROOT).unwrap();
        store.erase_property(SubgraphId::ROOT, "rank").unwrap();
        assert!(cache.is_empty());
        assert!(!cache.is_subscribed(rank));
    }
}
