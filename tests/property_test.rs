mod common;

use common::{record, take};
use proptest::prelude::*;
use strata::graph::{Element, EventKind, GraphError, GraphStore, PropertyType, PropertyValue, SubgraphId};

const ROOT: SubgraphId = SubgraphId::ROOT;

#[test]
fn test_properties_resolve_through_ancestors() {
    let mut store = GraphStore::new();
    let child = store.create_subgraph(ROOT, "child").unwrap();
    let grandchild = store.create_subgraph(child, "grandchild").unwrap();
    let color = store.create_property(ROOT, "color", PropertyType::Integer).unwrap();

    assert_eq!(store.property(grandchild, "color").unwrap(), color);
    assert!(store.property_exists(child, "color"));
    assert!(!store.local_property_exists(child, "color"));

    let shadow = store.create_property(child, "color", PropertyType::String).unwrap();
    assert_eq!(store.property(grandchild, "color").unwrap(), shadow);
    assert_eq!(store.property(ROOT, "color").unwrap(), color);
    assert_eq!(store.inherited_properties(grandchild).unwrap(), vec![shadow]);
    assert!(store.inherited_properties(child).unwrap().is_empty());
    assert_eq!(store.local_properties(child).unwrap(), vec![shadow]);
}

#[test]
fn test_duplicate_and_unknown_names() {
    let mut store = GraphStore::new();
    store.create_property(ROOT, "size", PropertyType::Size).unwrap();
    assert!(matches!(
        store.create_property(ROOT, "size", PropertyType::Size),
        Err(GraphError::DuplicateProperty { .. })
    ));
    assert!(matches!(
        store.property(ROOT, "missing"),
        Err(GraphError::UnknownProperty { .. })
    ));
    assert!(matches!(
        store.erase_property(ROOT, "missing"),
        Err(GraphError::UnknownProperty { .. })
    ));
}

#[test]
fn test_get_or_create_checks_type() {
    let mut store = GraphStore::new();
    let child = store.create_subgraph(ROOT, "child").unwrap();
    let label = store.get_or_create_property(ROOT, "label", PropertyType::String).unwrap();
    assert_eq!(
        store.get_or_create_property(child, "label", PropertyType::String).unwrap(),
        label
    );
    assert_eq!(
        store.get_or_create_property(child, "label", PropertyType::Float),
        Err(GraphError::TypeMismatch {
            expected: PropertyType::Float,
            found: PropertyType::String,
        })
    );
}

#[test]
fn test_erase_and_rename_events() {
    let mut store = GraphStore::new();
    let flag = store.create_property(ROOT, "flag", PropertyType::Boolean).unwrap();
    let (on_root, _) = record(&store, ROOT);
    let (on_flag, _) = record(&store, flag);

    store.rename_property(ROOT, "flag", "visible").unwrap();
    assert_eq!(store.property(ROOT, "visible").unwrap(), flag);
    store.erase_property(ROOT, "visible").unwrap();

    assert_eq!(
        take(&on_root),
        vec![
            EventKind::PropertyRenamed {
                from: "flag".to_string(),
                to: "visible".to_string(),
            },
            EventKind::PropertyRemoved("visible".to_string()),
        ]
    );
    assert_eq!(take(&on_flag), vec![EventKind::EntityDestroyed]);
    assert!(matches!(store.get_property(flag), Err(GraphError::PropertyNotFound(_))));
}

#[test]
fn test_set_all_on_root_and_view() {
    let mut store = GraphStore::new();
    let n = store.add_nodes(ROOT, 4).unwrap();
    let view = store.create_induced_subgraph(ROOT, &n[..2], "half").unwrap();
    let rank = store.create_property(ROOT, "rank", PropertyType::Integer).unwrap();
    store.set_node_value(rank, n[3], 9.into()).unwrap();
    let (seen, _) = record(&store, rank);

    store.set_all_node_values(rank, 5.into(), view).unwrap();
    assert_eq!(
        take(&seen),
        vec![
            EventKind::ValueChanged(Element::Node(n[0])),
            EventKind::ValueChanged(Element::Node(n[1])),
        ]
    );
    assert_eq!(store.node_value(rank, n[2]).unwrap(), PropertyValue::Integer(0));
    assert_eq!(store.node_value(rank, n[3]).unwrap(), PropertyValue::Integer(9));

    store.set_all_node_values(rank, 7.into(), ROOT).unwrap();
    assert_eq!(take(&seen), vec![EventKind::ValueChangedAll]);
    assert_eq!(store.node_default(rank).unwrap(), PropertyValue::Integer(7));
    assert!(store.node_overrides(rank).unwrap().is_empty());
}

#[test]
fn test_local_delete_resets_local_values() {
    let mut store = GraphStore::new();
    let n = store.add_node(ROOT).unwrap();
    let view = store.create_induced_subgraph(ROOT, &[n], "v").unwrap();
    let global = store.create_property(ROOT, "global", PropertyType::Integer).unwrap();
    let local = store.create_property(view, "local", PropertyType::Integer).unwrap();
    store.set_node_value(global, n, 1.into()).unwrap();
    store.set_node_value(local, n, 2.into()).unwrap();

    store.delete_node(view, n, false).unwrap();
    assert!(!store.has_node_override(local, n).unwrap());
    assert!(store.has_node_override(global, n).unwrap());

    store.delete_node(ROOT, n, true).unwrap();
    assert!(store.node_overrides(global).unwrap().is_empty());
}

#[test]
fn test_graph_references_cleared_with_subgraph() {
    let mut store = GraphStore::new();
    let n = store.add_node(ROOT).unwrap();
    let target = store.create_subgraph(ROOT, "target").unwrap();
    let link = store.create_property(ROOT, "link", PropertyType::Graph).unwrap();
    store.set_node_value(link, n, PropertyValue::Graph(Some(target))).unwrap();
    store.set_node_default(link, PropertyValue::Graph(Some(target))).unwrap();

    store.remove_subgraph(target).unwrap();
    assert_eq!(store.node_value(link, n).unwrap(), PropertyValue::Graph(None));
    assert_eq!(store.node_default(link).unwrap(), PropertyValue::Graph(None));
    assert!(matches!(
        store.set_node_value(link, n, PropertyValue::Graph(Some(target))),
        Err(GraphError::SubgraphNotFound(_))
    ));
}

#[test]
fn test_deleted_edges_leave_edge_sets() {
    let mut store = GraphStore::new();
    let n = store.add_nodes(ROOT, 3).unwrap();
    let e0 = store.add_edge(ROOT, n[0], n[1]).unwrap();
    let e1 = store.add_edge(ROOT, n[1], n[2]).unwrap();
    let members = store.create_property(ROOT, "members", PropertyType::Graph).unwrap();
    store.set_edge_value(members, e1, PropertyValue::EdgeSet(vec![e0, e1])).unwrap();
    store.set_edge_default(members, PropertyValue::EdgeSet(vec![e0])).unwrap();
    let (seen, _) = record(&store, members);

    store.delete_edge(ROOT, e0, true).unwrap();
    assert_eq!(
        take(&seen),
        vec![EventKind::ValueChanged(Element::Edge(e1)), EventKind::ValueChangedAll]
    );
    assert_eq!(store.edge_value(members, e1).unwrap(), PropertyValue::EdgeSet(vec![e1]));
    assert_eq!(store.edge_default(members).unwrap(), PropertyValue::EdgeSet(vec![]));

    // the freed id comes back for the next edge without inheriting membership
    let recycled = store.add_edge(ROOT, n[2], n[0]).unwrap();
    assert_eq!(recycled, e0);
    assert_eq!(store.edge_value(members, e1).unwrap(), PropertyValue::EdgeSet(vec![e1]));
    assert_eq!(store.edge_value(members, recycled).unwrap(), PropertyValue::EdgeSet(vec![]));
}

#[test]
fn test_set_all_on_defining_view_replaces_default() {
    let mut store = GraphStore::new();
    let n = store.add_nodes(ROOT, 3).unwrap();
    let outer = store.create_induced_subgraph(ROOT, &n[..2], "outer").unwrap();
    let inner = store.create_induced_subgraph(outer, &n[..1], "inner").unwrap();
    let local = store.create_property(outer, "local", PropertyType::Integer).unwrap();
    store.set_node_value(local, n[1], 4.into()).unwrap();
    let (seen, _) = record(&store, local);

    store.set_all_node_values(local, 3.into(), outer).unwrap();
    assert_eq!(take(&seen), vec![EventKind::ValueChangedAll]);
    assert_eq!(store.node_default(local).unwrap(), PropertyValue::Integer(3));
    assert!(store.node_overrides(local).unwrap().is_empty());

    // a scope below the owner only touches its own nodes
    store.set_all_node_values(local, 8.into(), inner).unwrap();
    assert_eq!(take(&seen), vec![EventKind::ValueChanged(Element::Node(n[0]))]);
    assert_eq!(store.node_value(local, n[1]).unwrap(), PropertyValue::Integer(3));

    // the root lies above the owner, which also resets everything
    store.set_all_node_values(local, 1.into(), ROOT).unwrap();
    assert_eq!(take(&seen), vec![EventKind::ValueChangedAll]);
    assert_eq!(store.node_default(local).unwrap(), PropertyValue::Integer(1));
    assert!(store.node_overrides(local).unwrap().is_empty());
}

proptest! {
    #[test]
    fn prop_override_iff_not_default(
        writes in prop::collection::vec((0..64u32, -3i64..3), 0..200),
        default in -3i64..3,
    ) {
        let mut store = GraphStore::new();
        let nodes = store.add_nodes(ROOT, 64).unwrap();
        let prop = store.create_property(ROOT, "value", PropertyType::Integer).unwrap();
        for (n, v) in writes {
            store.set_node_value(prop, nodes[n as usize], v.into()).unwrap();
        }
        store.set_node_default(prop, default.into()).unwrap();

        let default = store.node_default(prop).unwrap();
        let overrides = store.node_overrides(prop).unwrap();
        let mut listed = 0;
        for &n in &nodes {
            let value = store.node_value(prop, n).unwrap();
            let has = store.has_node_override(prop, n).unwrap();
            prop_assert_eq!(value == default, !has);
            if has {
                listed += 1;
                prop_assert!(overrides.contains(&(n, value)));
            }
        }
        prop_assert_eq!(overrides.len(), listed);
    }
}
