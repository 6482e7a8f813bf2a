mod common;

use common::{record, take};
use proptest::prelude::*;
use std::collections::BTreeSet;
use strata::graph::{Direction, Element, EventKind, GraphError, GraphStore, SubgraphId};

const ROOT: SubgraphId = SubgraphId::ROOT;

/// root > a > b, root > c, every view holding nodes x and y and the edge x-y
fn nested() -> (GraphStore, [SubgraphId; 3], [strata::NodeId; 2], strata::EdgeId) {
    let mut store = GraphStore::new();
    let a = store.create_subgraph(ROOT, "a").unwrap();
    let b = store.create_subgraph(a, "b").unwrap();
    let c = store.create_subgraph(ROOT, "c").unwrap();
    let x = store.add_node(b).unwrap();
    let y = store.add_node(b).unwrap();
    let xy = store.add_edge(b, x, y).unwrap();
    store.add_existing_node(c, x).unwrap();
    store.add_existing_node(c, y).unwrap();
    store.add_existing_edge(c, xy).unwrap();
    (store, [a, b, c], [x, y], xy)
}

#[test]
fn test_additions_show_along_ancestors() {
    let (store, [a, b, c], [x, _], xy) = nested();
    for g in [ROOT, a, b, c] {
        assert!(store.contains_node(g, x));
        assert!(store.contains_edge(g, xy));
    }
    assert_eq!(store.subgraphs(), vec![ROOT, a, b, c]);
    assert!(store.is_descendant_of(b, ROOT));
    assert!(!store.is_descendant_of(c, a));
    assert_eq!(store.subgraph_by_name("b"), Some(b));
}

#[test]
fn test_local_delete_leaves_ancestors_and_siblings() {
    let (mut store, [a, b, c], [x, _], xy) = nested();
    store.delete_node(a, x, false).unwrap();

    assert!(!store.contains_node(a, x));
    assert!(!store.contains_node(b, x));
    assert!(!store.contains_edge(a, xy));
    assert!(store.contains_node(ROOT, x));
    assert!(store.contains_node(c, x));
    assert!(store.contains_edge(c, xy));
    assert!(store.is_node(x));
}

#[test]
fn test_cascading_delete_from_view() {
    let (mut store, [a, b, c], [x, y], xy) = nested();
    store.delete_node(b, x, true).unwrap();
    for g in [ROOT, a, b, c] {
        assert!(!store.contains_node(g, x));
        assert!(!store.contains_edge(g, xy));
        assert!(store.contains_node(g, y));
    }
    assert!(!store.is_node(x));
    assert!(!store.is_edge(xy));
}

#[test]
fn test_local_delete_events_go_children_first() {
    let (mut store, [a, b, _], [_, y], xy) = nested();
    let (seen_a, _) = record(&store, a);
    let (seen_b, _) = record(&store, b);
    let (seen_root, _) = record(&store, ROOT);

    store.delete_node(a, y, false).unwrap();
    let expected = vec![
        EventKind::ElementDeleted(Element::Edge(xy)),
        EventKind::ElementDeleted(Element::Node(y)),
    ];
    assert_eq!(take(&seen_b), expected);
    assert_eq!(take(&seen_a), expected);
    assert!(take(&seen_root).is_empty());
}

#[test]
fn test_remove_subgraph_cascades() {
    let (mut store, [a, b, c], [x, _], _) = nested();
    let (seen_root, _) = record(&store, ROOT);
    let (seen_b, _) = record(&store, b);

    store.remove_subgraph(a).unwrap();
    assert!(!store.has_subgraph(a));
    assert!(!store.has_subgraph(b));
    assert!(store.has_subgraph(c));
    assert!(store.contains_node(ROOT, x));
    assert_eq!(take(&seen_b), vec![EventKind::EntityDestroyed]);
    assert_eq!(take(&seen_root), vec![EventKind::SubgraphRemoved(a)]);
    assert!(matches!(store.subgraph(b), Err(GraphError::SubgraphNotFound(_))));
    assert!(store.remove_subgraph(ROOT).is_err());
}

#[test]
fn test_induced_subgraph_takes_inner_edges() {
    let mut store = GraphStore::new();
    let n = store.add_nodes(ROOT, 3).unwrap();
    let e01 = store.add_edge(ROOT, n[0], n[1]).unwrap();
    let e12 = store.add_edge(ROOT, n[1], n[2]).unwrap();
    let loop0 = store.add_edge(ROOT, n[0], n[0]).unwrap();

    let sg = store.create_induced_subgraph(ROOT, &[n[0], n[1], n[0]], "pair").unwrap();
    assert_eq!(store.node_count_in(sg).unwrap(), 2);
    assert!(store.contains_edge(sg, e01));
    assert!(store.contains_edge(sg, loop0));
    assert!(!store.contains_edge(sg, e12));
    assert_eq!(store.degree_in(sg, n[1]).unwrap(), 1);
    assert_eq!(store.incident_edges_in(sg, n[1], Direction::Both).unwrap(), vec![e01]);
}

#[test]
fn test_existing_edge_needs_both_ends() {
    let mut store = GraphStore::new();
    let n = store.add_nodes(ROOT, 2).unwrap();
    let e = store.add_edge(ROOT, n[0], n[1]).unwrap();
    let sg = store.create_subgraph(ROOT, "s").unwrap();
    store.add_existing_node(sg, n[0]).unwrap();
    assert!(matches!(
        store.add_existing_edge(sg, e),
        Err(GraphError::InvalidOperation(_))
    ));
    assert_eq!(store.edge_count_in(sg).unwrap(), 0);
}

#[derive(Debug, Clone)]
enum Op {
    AddNode(usize),
    AddEdge(usize, usize, usize),
    DeleteNode(usize, usize, bool),
    DeleteEdge(usize, usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize).prop_map(Op::AddNode),
        (0..3usize, 0..16usize, 0..16usize).prop_map(|(g, s, d)| Op::AddEdge(g, s, d)),
        (0..3usize, 0..16usize, any::<bool>()).prop_map(|(g, n, p)| Op::DeleteNode(g, n, p)),
        (0..3usize, 0..16usize, any::<bool>()).prop_map(|(g, e, p)| Op::DeleteEdge(g, e, p)),
    ]
}

proptest! {
    #[test]
    fn prop_views_stay_consistent(ops in prop::collection::vec(op(), 1..80)) {
        let mut store = GraphStore::new();
        let a = store.create_subgraph(ROOT, "a").unwrap();
        let b = store.create_subgraph(a, "b").unwrap();
        let views = [ROOT, a, b];
        let mut known_nodes = BTreeSet::new();
        let mut known_edges = BTreeSet::new();

        for op in ops {
            // Failures are fine; they must leave no trace
            let _ = match op {
                Op::AddNode(g) => store.add_node(views[g]).map(|_| ()),
                Op::AddEdge(g, s, d) => {
                    let nodes: Vec<_> = store.subgraph(views[g]).unwrap().nodes().collect();
                    if nodes.is_empty() {
                        continue;
                    }
                    let (src, dst) = (nodes[s % nodes.len()], nodes[d % nodes.len()]);
                    store.add_edge(views[g], src, dst).map(|_| ())
                }
                Op::DeleteNode(g, n, propagate) => {
                    let nodes: Vec<_> = store.subgraph(views[g]).unwrap().nodes().collect();
                    if nodes.is_empty() {
                        continue;
                    }
                    store.delete_node(views[g], nodes[n % nodes.len()], propagate)
                }
                Op::DeleteEdge(g, e, propagate) => {
                    let edges: Vec<_> = store.subgraph(views[g]).unwrap().edges().collect();
                    if edges.is_empty() {
                        continue;
                    }
                    store.delete_edge(views[g], edges[e % edges.len()], propagate)
                }
            };

            for &g in &views {
                let view = store.subgraph(g).unwrap();
                for e in view.edges() {
                    let (src, dst) = store.endpoints(e).unwrap();
                    prop_assert!(view.contains_node(src) && view.contains_node(dst));
                }
                if let Some(parent) = view.parent() {
                    let parent = store.subgraph(parent).unwrap();
                    prop_assert!(view.nodes().all(|n| parent.contains_node(n)));
                    prop_assert!(view.edges().all(|e| parent.contains_edge(e)));
                }
            }
            for n in store.root().nodes() {
                for &e in store.incidence(n).unwrap() {
                    let (src, dst) = store.endpoints(e).unwrap();
                    prop_assert!(src == n || dst == n);
                }
            }
            for e in store.root().edges() {
                let (src, dst) = store.endpoints(e).unwrap();
                let count = |n| store.incidence(n).unwrap().iter().filter(|&&x| x == e).count();
                if src == dst {
                    prop_assert_eq!(count(src), 2);
                } else {
                    prop_assert_eq!(count(src), 1);
                    prop_assert_eq!(count(dst), 1);
                }
            }

            known_nodes.extend(store.root().nodes());
            known_edges.extend(store.root().edges());
            for &n in &known_nodes {
                prop_assert_eq!(store.is_node(n), store.root().contains_node(n));
            }
            for &e in &known_edges {
                prop_assert_eq!(store.is_edge(e), store.root().contains_edge(e));
            }
            prop_assert_eq!(store.root().node_count(), store.node_count());
            prop_assert_eq!(store.root().edge_count(), store.edge_count());
        }
    }
}
