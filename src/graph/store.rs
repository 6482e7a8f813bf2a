//! The graph store facade
//!
//! `GraphStore` owns the adjacency store, the subgraph tree, the property
//! registry and the notification bus, and is the only way to mutate any of
//! them. Every mutating call validates its arguments before touching
//! state, so a failed call changes nothing and raises no event.
//!
//! Structural changes always go through the root: a node or edge is
//! created in the adjacency store and then made visible along the ancestor
//! chain of the subgraph it was added to. Removal runs the other way,
//! descendants first.

use super::adjacency::{AdjacencyStore, IncidentEdges};
use super::error::{GraphError, GraphResult};
use super::event::{EntityId, Event, EventKind};
use super::hierarchy::{Hierarchy, SubgraphView};
use super::meta::{MetaState, META_GRAPH_PROPERTY};
use super::notify::{Listener, ListenerId, NotificationBus};
use super::property::{PropertyType, PropertyValue};
use super::registry::{Property, PropertyRegistry};
use super::storage::Scope;
use super::types::{Direction, EdgeId, Element, ElementKind, NodeId, PropertyId, SubgraphId};
use crate::config::StoreConfig;
use rustc_hash::FxHashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Size summary of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub subgraph_count: usize,
    pub property_count: usize,
}

/// Where [`GraphStore::clone_subgraph`] puts the copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClonePlacement {
    /// Below the subgraph being cloned
    Child,
    /// Under the same parent as the subgraph being cloned
    Sibling,
    /// Like `Sibling`, also copying the properties the subgraph defines
    SiblingWithProperties,
}

/// In-memory attributed multigraph with nested views
#[derive(Debug)]
pub struct GraphStore {
    adjacency: AdjacencyStore,
    hierarchy: Hierarchy,
    registry: PropertyRegistry,
    bus: NotificationBus,
    config: StoreConfig,
    pub(crate) meta: MetaState,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        GraphStore {
            adjacency: AdjacencyStore::with_capacity(config.node_capacity, config.edge_capacity),
            hierarchy: Hierarchy::new(config.chunk_size),
            registry: PropertyRegistry::new(config.chunk_size),
            bus: NotificationBus::new(config.max_hold_depth),
            config,
            meta: MetaState::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read-only access to the canonical adjacency data
    pub fn adjacency(&self) -> &AdjacencyStore {
        &self.adjacency
    }

    pub fn stats(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.adjacency.node_count(),
            edge_count: self.adjacency.edge_count(),
            subgraph_count: self.hierarchy.len(),
            property_count: self.registry.len(),
        }
    }

    // ---- Notifications ----

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Subscribe to a live subgraph or property
    pub fn subscribe(
        &self,
        entity: impl Into<EntityId>,
        listener: Arc<dyn Listener>,
    ) -> GraphResult<ListenerId> {
        let entity = entity.into();
        match entity {
            EntityId::Subgraph(g) => {
                self.hierarchy.view(g)?;
            }
            EntityId::Property(p) => {
                self.registry.get(p)?;
            }
        }
        Ok(self.bus.subscribe(entity, listener))
    }

    pub fn unsubscribe(&self, entity: impl Into<EntityId>, listener: ListenerId) -> bool {
        self.bus.unsubscribe(entity.into(), listener)
    }

    pub fn hold(&self) -> GraphResult<()> {
        self.bus.hold()
    }

    pub fn release(&self) -> GraphResult<()> {
        self.bus.release()
    }

    /// Hold notifications until the returned guard is dropped
    pub fn hold_notifications(&mut self) -> GraphResult<NotificationHold<'_>> {
        self.bus.hold()?;
        Ok(NotificationHold { store: self })
    }

    pub(crate) fn emit(&self, entity: impl Into<EntityId>, kind: EventKind) {
        self.bus.notify(Event::new(entity, kind));
    }

    // ---- Element queries ----

    pub fn is_node(&self, n: NodeId) -> bool {
        self.adjacency.is_node(n)
    }

    pub fn is_edge(&self, e: EdgeId) -> bool {
        self.adjacency.is_edge(e)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.edge_count()
    }

    /// Whether `n` is visible in `sg`; `false` for an unknown subgraph
    pub fn contains_node(&self, sg: SubgraphId, n: NodeId) -> bool {
        self.hierarchy
            .view(sg)
            .map(|v| v.contains_node(n))
            .unwrap_or(false)
    }

    /// Whether `e` is visible in `sg`; `false` for an unknown subgraph
    pub fn contains_edge(&self, sg: SubgraphId, e: EdgeId) -> bool {
        self.hierarchy
            .view(sg)
            .map(|v| v.contains_edge(e))
            .unwrap_or(false)
    }

    pub fn degree(&self, n: NodeId) -> GraphResult<usize> {
        self.check_node(n)?;
        Ok(self.adjacency.degree(n))
    }

    pub fn in_degree(&self, n: NodeId) -> GraphResult<usize> {
        self.check_node(n)?;
        Ok(self.adjacency.in_degree(n))
    }

    pub fn out_degree(&self, n: NodeId) -> GraphResult<usize> {
        self.check_node(n)?;
        Ok(self.adjacency.out_degree(n))
    }

    /// Rotation order of `n` at the root
    pub fn incidence(&self, n: NodeId) -> GraphResult<&[EdgeId]> {
        self.check_node(n)?;
        Ok(self.adjacency.incidence(n))
    }

    pub fn incident_edges(&self, n: NodeId, direction: Direction) -> GraphResult<IncidentEdges<'_>> {
        self.check_node(n)?;
        Ok(self.adjacency.incident_edges(n, direction))
    }

    pub fn neighbors(&self, n: NodeId, direction: Direction) -> GraphResult<Vec<NodeId>> {
        self.check_node(n)?;
        Ok(self.adjacency.neighbors(n, direction).collect())
    }

    pub fn endpoints(&self, e: EdgeId) -> GraphResult<(NodeId, NodeId)> {
        self.check_edge(e)?;
        Ok(self.adjacency.endpoints(e))
    }

    pub fn source(&self, e: EdgeId) -> GraphResult<NodeId> {
        Ok(self.endpoints(e)?.0)
    }

    pub fn target(&self, e: EdgeId) -> GraphResult<NodeId> {
        Ok(self.endpoints(e)?.1)
    }

    pub fn opposite(&self, e: EdgeId, n: NodeId) -> GraphResult<NodeId> {
        let (src, dst) = self.endpoints(e)?;
        if src != n && dst != n {
            return Err(GraphError::invalid(format!("{} is not an end of {}", n, e)));
        }
        Ok(self.adjacency.opposite(e, n))
    }

    pub fn edges_between(&self, src: NodeId, dst: NodeId, directed: bool) -> GraphResult<Vec<EdgeId>> {
        self.check_node(src)?;
        self.check_node(dst)?;
        Ok(self.adjacency.edges_between(src, dst, directed))
    }

    /// Incident edge slots of `n` visible in `sg` (a self-loop counts twice)
    pub fn degree_in(&self, sg: SubgraphId, n: NodeId) -> GraphResult<usize> {
        let view = self.visible_node(sg, n)?;
        Ok(self
            .adjacency
            .incidence(n)
            .iter()
            .filter(|&&e| view.contains_edge(e))
            .count())
    }

    pub fn incident_edges_in(
        &self,
        sg: SubgraphId,
        n: NodeId,
        direction: Direction,
    ) -> GraphResult<Vec<EdgeId>> {
        let view = self.visible_node(sg, n)?;
        Ok(self
            .adjacency
            .incident_edges(n, direction)
            .filter(|&e| view.contains_edge(e))
            .collect())
    }

    // ---- Structural mutation ----

    /// Create a node at the root and show it in `sg` and all its ancestors
    pub fn add_node(&mut self, sg: SubgraphId) -> GraphResult<NodeId> {
        let chain = self.hierarchy.ancestors(sg)?;
        let n = self.adjacency.add_node();
        self.show_node(&chain, n);
        trace!(node = %n, subgraph = %sg, "added node");
        Ok(n)
    }

    /// Create `count` nodes with contiguous ids
    pub fn add_nodes(&mut self, sg: SubgraphId, count: u32) -> GraphResult<Vec<NodeId>> {
        let chain = self.hierarchy.ancestors(sg)?;
        let nodes = self.adjacency.add_nodes(count);
        for &n in &nodes {
            self.show_node(&chain, n);
        }
        debug!(count, subgraph = %sg, "added nodes");
        Ok(nodes)
    }

    /// Create an edge; both ends must be visible in `sg`
    pub fn add_edge(&mut self, sg: SubgraphId, src: NodeId, dst: NodeId) -> GraphResult<EdgeId> {
        let chain = self.hierarchy.ancestors(sg)?;
        self.visible_node(sg, src)?;
        self.visible_node(sg, dst)?;
        let e = self.adjacency.add_edge(src, dst);
        self.show_edge(&chain, e);
        trace!(edge = %e, source = %src, target = %dst, subgraph = %sg, "added edge");
        Ok(e)
    }

    /// Create one edge per pair; all ends must be visible in `sg`
    pub fn add_edges(&mut self, sg: SubgraphId, pairs: &[(NodeId, NodeId)]) -> GraphResult<Vec<EdgeId>> {
        let chain = self.hierarchy.ancestors(sg)?;
        for &(src, dst) in pairs {
            self.visible_node(sg, src)?;
            self.visible_node(sg, dst)?;
        }
        let edges = self.adjacency.add_edges(pairs);
        for &e in &edges {
            self.show_edge(&chain, e);
        }
        debug!(count = edges.len(), subgraph = %sg, "added edges");
        Ok(edges)
    }

    /// Show an existing node in `sg`, and in every ancestor lacking it
    pub fn add_existing_node(&mut self, sg: SubgraphId, n: NodeId) -> GraphResult<()> {
        let chain = self.hierarchy.ancestors(sg)?;
        self.check_node(n)?;
        self.show_node(&chain, n);
        Ok(())
    }

    /// Show an existing edge in `sg`; both ends must already be visible there
    pub fn add_existing_edge(&mut self, sg: SubgraphId, e: EdgeId) -> GraphResult<()> {
        let chain = self.hierarchy.ancestors(sg)?;
        self.check_edge(e)?;
        let (src, dst) = self.adjacency.endpoints(e);
        let view = self.hierarchy.view(sg)?;
        if !view.contains_node(src) || !view.contains_node(dst) {
            return Err(GraphError::invalid(format!(
                "cannot show {} in {}: its ends are not both visible there",
                e, sg
            )));
        }
        self.show_edge(&chain, e);
        Ok(())
    }

    /// Delete a node from `sg`.
    ///
    /// With `propagate` (or when `sg` is the root) the node and its edges
    /// are deleted everywhere and their ids released. Otherwise the node
    /// only leaves `sg` and its descendants.
    pub fn delete_node(&mut self, sg: SubgraphId, n: NodeId, propagate: bool) -> GraphResult<()> {
        self.visible_node(sg, n)?;
        if propagate || sg.is_root() {
            self.delete_node_everywhere(n)
        } else {
            self.hide_node(sg, n)
        }
    }

    /// Delete an edge from `sg`, see [`GraphStore::delete_node`]
    pub fn delete_edge(&mut self, sg: SubgraphId, e: EdgeId, propagate: bool) -> GraphResult<()> {
        self.check_edge(e)?;
        if !self.hierarchy.view(sg)?.contains_edge(e) {
            return Err(GraphError::invalid(format!("{} is not visible in {}", e, sg)));
        }
        if propagate || sg.is_root() {
            self.delete_edge_everywhere(e)
        } else {
            self.hide_edge(sg, e)
        }
    }

    /// Swap source and target of `e`, keeping its id
    pub fn reverse(&mut self, e: EdgeId) -> GraphResult<()> {
        self.check_edge(e)?;
        self.adjacency.reverse(e);
        for g in self.hierarchy.pre_order(SubgraphId::ROOT)? {
            if self.hierarchy.view(g)?.contains_edge(e) {
                self.emit(g, EventKind::EdgeReversed(e));
            }
        }
        Ok(())
    }

    /// Replace the rotation order of `n` with a permutation of it
    pub fn set_incidence_order(&mut self, n: NodeId, order: &[EdgeId]) -> GraphResult<()> {
        self.check_node(n)?;
        self.adjacency.set_incidence_order(n, order)?;
        self.emit_reordered(n)
    }

    pub fn swap_incidence_order(&mut self, n: NodeId, e1: EdgeId, e2: EdgeId) -> GraphResult<()> {
        self.check_node(n)?;
        self.check_edge(e1)?;
        self.check_edge(e2)?;
        self.adjacency.swap_incidence_order(n, e1, e2)?;
        self.emit_reordered(n)
    }

    // ---- Subgraphs ----

    pub fn subgraph(&self, sg: SubgraphId) -> GraphResult<&SubgraphView> {
        self.hierarchy.view(sg)
    }

    pub fn root(&self) -> &SubgraphView {
        self.hierarchy.root()
    }

    pub fn has_subgraph(&self, sg: SubgraphId) -> bool {
        self.hierarchy.contains(sg)
    }

    pub fn subgraph_count(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn rename_subgraph(&mut self, sg: SubgraphId, name: &str) -> GraphResult<()> {
        self.hierarchy.view_mut(sg)?.set_name(name);
        Ok(())
    }

    pub fn parent(&self, sg: SubgraphId) -> GraphResult<Option<SubgraphId>> {
        Ok(self.hierarchy.view(sg)?.parent())
    }

    pub fn children(&self, sg: SubgraphId) -> GraphResult<&[SubgraphId]> {
        Ok(self.hierarchy.view(sg)?.children())
    }

    /// Whether `a` lies strictly below `b`
    pub fn is_descendant_of(&self, a: SubgraphId, b: SubgraphId) -> bool {
        self.hierarchy.is_descendant_of(a, b)
    }

    /// Every subgraph strictly below `sg`, parents first
    pub fn descendants(&self, sg: SubgraphId) -> GraphResult<Vec<SubgraphId>> {
        let mut all = self.hierarchy.pre_order(sg)?;
        all.remove(0);
        Ok(all)
    }

    pub fn depth(&self, sg: SubgraphId) -> GraphResult<usize> {
        self.hierarchy.depth(sg)
    }

    pub fn subgraph_by_name(&self, name: &str) -> Option<SubgraphId> {
        self.hierarchy.by_name(name)
    }

    /// All subgraphs in pre-order, starting with the root
    pub fn subgraphs(&self) -> Vec<SubgraphId> {
        self.hierarchy
            .pre_order(SubgraphId::ROOT)
            .unwrap_or_default()
    }

    pub fn node_count_in(&self, sg: SubgraphId) -> GraphResult<usize> {
        Ok(self.hierarchy.view(sg)?.node_count())
    }

    pub fn edge_count_in(&self, sg: SubgraphId) -> GraphResult<usize> {
        Ok(self.hierarchy.view(sg)?.edge_count())
    }

    /// Create an empty child of `parent`
    pub fn create_subgraph(&mut self, parent: SubgraphId, name: &str) -> GraphResult<SubgraphId> {
        let id = self.hierarchy.create(parent, name)?;
        debug!(subgraph = %id, parent = %parent, name, "created subgraph");
        self.emit(parent, EventKind::SubgraphAdded(id));
        Ok(id)
    }

    /// Create a child of `parent` holding `nodes` and every edge of
    /// `parent` whose two ends are among them
    pub fn create_induced_subgraph(
        &mut self,
        parent: SubgraphId,
        nodes: &[NodeId],
        name: &str,
    ) -> GraphResult<SubgraphId> {
        let mut members = FxHashSet::default();
        let mut ordered = Vec::with_capacity(nodes.len());
        for &n in nodes {
            self.visible_node(parent, n)?;
            if members.insert(n) {
                ordered.push(n);
            }
        }
        let parent_view = self.hierarchy.view(parent)?;
        let mut edges = Vec::new();
        for &n in &ordered {
            // Each inner edge is visited once, from its source
            for e in self.adjacency.incident_edges(n, Direction::Out) {
                if members.contains(&self.adjacency.target(e)) && parent_view.contains_edge(e) {
                    edges.push(e);
                }
            }
        }

        let id = self.create_subgraph(parent, name)?;
        self.fill_subgraph(id, &ordered, &edges)?;
        debug!(subgraph = %id, nodes = ordered.len(), edges = edges.len(), "induced subgraph");
        Ok(id)
    }

    /// Create a subgraph showing every node and edge of `sg`
    pub fn clone_subgraph(
        &mut self,
        sg: SubgraphId,
        name: &str,
        placement: ClonePlacement,
    ) -> GraphResult<SubgraphId> {
        let view = self.hierarchy.view(sg)?;
        let parent = match placement {
            ClonePlacement::Child => sg,
            ClonePlacement::Sibling | ClonePlacement::SiblingWithProperties => view
                .parent()
                .ok_or_else(|| GraphError::invalid("the root graph has no siblings"))?,
        };
        let nodes: Vec<NodeId> = view.nodes().collect();
        let edges: Vec<EdgeId> = view.edges().collect();

        let id = self.create_subgraph(parent, name)?;
        self.fill_subgraph(id, &nodes, &edges)?;
        if placement == ClonePlacement::SiblingWithProperties {
            for prop in self.registry.local_ids(sg) {
                self.copy_property(prop, id)?;
            }
        }
        debug!(subgraph = %id, source = %sg, ?placement, "cloned subgraph");
        Ok(id)
    }

    /// Destroy `sg` and all of its descendants, children first
    pub fn remove_subgraph(&mut self, sg: SubgraphId) -> GraphResult<()> {
        if sg.is_root() {
            return Err(GraphError::invalid("the root graph cannot be removed"));
        }
        for g in self.hierarchy.post_order(sg)? {
            for prop in self.registry.drop_scope(g) {
                self.emit(g, EventKind::PropertyRemoved(prop.name().to_string()));
                self.bus.destroy(EntityId::Property(prop.id()));
            }
            let parent = self.hierarchy.view(g)?.parent();
            self.bus.destroy(EntityId::Subgraph(g));
            self.hierarchy.detach(g)?;
            if let Some(parent) = parent {
                self.emit(parent, EventKind::SubgraphRemoved(g));
            }
            self.clear_references_to(g)?;
            debug!(subgraph = %g, "removed subgraph");
        }
        Ok(())
    }

    // ---- Attributes ----

    /// Attach a named value to `sg` itself.
    ///
    /// Attributes hold plain values; subgraph and edge references are
    /// rejected.
    pub fn set_attribute(&mut self, sg: SubgraphId, name: &str, value: PropertyValue) -> GraphResult<()> {
        self.hierarchy.view(sg)?;
        if matches!(value, PropertyValue::Graph(_) | PropertyValue::EdgeSet(_)) {
            return Err(GraphError::invalid(format!(
                "attribute {} cannot hold a {} value",
                name,
                value.type_name()
            )));
        }
        if self.hierarchy.view_mut(sg)?.set_attribute(name, value) {
            self.emit(sg, EventKind::AttributeSet(name.to_string()));
        }
        Ok(())
    }

    pub fn attribute(&self, sg: SubgraphId, name: &str) -> GraphResult<Option<&PropertyValue>> {
        Ok(self.hierarchy.view(sg)?.attribute(name))
    }

    pub fn remove_attribute(&mut self, sg: SubgraphId, name: &str) -> GraphResult<Option<PropertyValue>> {
        let removed = self.hierarchy.view_mut(sg)?.remove_attribute(name);
        if removed.is_some() {
            self.emit(sg, EventKind::AttributeRemoved(name.to_string()));
        }
        Ok(removed)
    }

    // ---- Properties ----

    /// Define a property local to `sg`
    pub fn create_property(&mut self, sg: SubgraphId, name: &str, ty: PropertyType) -> GraphResult<PropertyId> {
        self.hierarchy.view(sg)?;
        let is_meta = sg.is_root() && name == META_GRAPH_PROPERTY;
        if is_meta && ty != PropertyType::Graph {
            return Err(GraphError::TypeMismatch {
                expected: PropertyType::Graph,
                found: ty,
            });
        }
        let id = self.registry.create(sg, name, ty)?;
        if is_meta {
            self.meta.property = Some(id);
        }
        debug!(property = %id, subgraph = %sg, name, ty = %ty, "created property");
        self.emit(sg, EventKind::PropertyAdded(name.to_string()));
        Ok(id)
    }

    /// Resolve `name` from `sg`, creating it locally if nothing visible defines it
    pub fn get_or_create_property(
        &mut self,
        sg: SubgraphId,
        name: &str,
        ty: PropertyType,
    ) -> GraphResult<PropertyId> {
        let chain = self.hierarchy.ancestors(sg)?;
        match self.registry.resolve(&chain, name) {
            Some(id) => {
                let found = self.registry.get(id)?.property_type();
                if found != ty {
                    return Err(GraphError::TypeMismatch { expected: ty, found });
                }
                Ok(id)
            }
            None => self.create_property(sg, name, ty),
        }
    }

    /// The property `name` resolves to from `sg`
    pub fn property(&self, sg: SubgraphId, name: &str) -> GraphResult<PropertyId> {
        let chain = self.hierarchy.ancestors(sg)?;
        self.registry
            .resolve(&chain, name)
            .ok_or_else(|| GraphError::UnknownProperty {
                subgraph: sg,
                name: name.to_string(),
            })
    }

    pub fn property_exists(&self, sg: SubgraphId, name: &str) -> bool {
        self.property(sg, name).is_ok()
    }

    pub fn local_property_exists(&self, sg: SubgraphId, name: &str) -> bool {
        self.registry.local(sg, name).is_some()
    }

    pub fn get_property(&self, id: PropertyId) -> GraphResult<&Property> {
        self.registry.get(id)
    }

    /// Every property of the store, ascending by id
    pub fn properties(&self) -> Vec<PropertyId> {
        self.registry.ids()
    }

    /// Properties defined by `sg` itself, in definition order
    pub fn local_properties(&self, sg: SubgraphId) -> GraphResult<Vec<PropertyId>> {
        self.hierarchy.view(sg)?;
        Ok(self.registry.local_ids(sg))
    }

    /// Properties visible from `sg` that an ancestor defines and nothing closer shadows
    pub fn inherited_properties(&self, sg: SubgraphId) -> GraphResult<Vec<PropertyId>> {
        let chain = self.hierarchy.ancestors(sg)?;
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for id in self.registry.local_ids(sg) {
            seen.insert(self.registry.get(id)?.name().to_string());
        }
        let mut inherited = Vec::new();
        for &g in &chain[1..] {
            for id in self.registry.local_ids(g) {
                let name = self.registry.get(id)?.name();
                if seen.insert(name.to_string()) {
                    inherited.push(id);
                }
            }
        }
        Ok(inherited)
    }

    /// Remove the local property `name` of `sg`; it raises its final event
    pub fn erase_property(&mut self, sg: SubgraphId, name: &str) -> GraphResult<()> {
        self.hierarchy.view(sg)?;
        self.guard_meta_name(sg, name)?;
        let prop = self.registry.remove(sg, name)?;
        debug!(property = %prop.id(), subgraph = %sg, name, "erased property");
        self.emit(sg, EventKind::PropertyRemoved(name.to_string()));
        self.bus.destroy(EntityId::Property(prop.id()));
        Ok(())
    }

    pub fn rename_property(&mut self, sg: SubgraphId, from: &str, to: &str) -> GraphResult<()> {
        self.hierarchy.view(sg)?;
        self.guard_meta_name(sg, from)?;
        self.guard_meta_name(sg, to)?;
        self.registry.rename(sg, from, to)?;
        self.emit(
            sg,
            EventKind::PropertyRenamed {
                from: from.to_string(),
                to: to.to_string(),
            },
        );
        Ok(())
    }

    // ---- Property values ----

    pub fn node_value(&self, prop: PropertyId, n: NodeId) -> GraphResult<PropertyValue> {
        let p = self.registry.get(prop)?;
        self.check_node(n)?;
        Ok(p.node_value(n))
    }

    pub fn edge_value(&self, prop: PropertyId, e: EdgeId) -> GraphResult<PropertyValue> {
        let p = self.registry.get(prop)?;
        self.check_edge(e)?;
        Ok(p.edge_value(e))
    }

    pub fn node_default(&self, prop: PropertyId) -> GraphResult<PropertyValue> {
        Ok(self.registry.get(prop)?.node_default())
    }

    pub fn edge_default(&self, prop: PropertyId) -> GraphResult<PropertyValue> {
        Ok(self.registry.get(prop)?.edge_default())
    }

    pub fn has_node_override(&self, prop: PropertyId, n: NodeId) -> GraphResult<bool> {
        Ok(self.registry.get(prop)?.has_node_override(n))
    }

    pub fn has_edge_override(&self, prop: PropertyId, e: EdgeId) -> GraphResult<bool> {
        Ok(self.registry.get(prop)?.has_edge_override(e))
    }

    pub fn node_overrides(&self, prop: PropertyId) -> GraphResult<Vec<(NodeId, PropertyValue)>> {
        Ok(self.registry.get(prop)?.node_overrides())
    }

    pub fn edge_overrides(&self, prop: PropertyId) -> GraphResult<Vec<(EdgeId, PropertyValue)>> {
        Ok(self.registry.get(prop)?.edge_overrides())
    }

    pub fn set_node_value(&mut self, prop: PropertyId, n: NodeId, value: PropertyValue) -> GraphResult<()> {
        self.guard_generic_write(prop)?;
        self.check_node(n)?;
        self.check_references(&value)?;
        self.write_value(prop, Element::Node(n), value)
    }

    pub fn set_edge_value(&mut self, prop: PropertyId, e: EdgeId, value: PropertyValue) -> GraphResult<()> {
        self.guard_generic_write(prop)?;
        self.check_edge(e)?;
        self.check_references(&value)?;
        self.write_value(prop, Element::Edge(e), value)
    }

    /// Replace the node default; existing overrides are kept
    pub fn set_node_default(&mut self, prop: PropertyId, value: PropertyValue) -> GraphResult<()> {
        self.set_default(prop, ElementKind::Node, value)
    }

    /// Replace the edge default; existing overrides are kept
    pub fn set_edge_default(&mut self, prop: PropertyId, value: PropertyValue) -> GraphResult<()> {
        self.set_default(prop, ElementKind::Edge, value)
    }

    /// Assign `value` to every node of `scope`. When `scope` is the
    /// subgraph defining the property, or does not lie below it, this
    /// replaces the default and drops every override.
    pub fn set_all_node_values(
        &mut self,
        prop: PropertyId,
        value: PropertyValue,
        scope: SubgraphId,
    ) -> GraphResult<()> {
        self.set_all(prop, ElementKind::Node, value, scope)
    }

    /// Assign `value` to every edge of `scope`, see [`GraphStore::set_all_node_values`]
    pub fn set_all_edge_values(
        &mut self,
        prop: PropertyId,
        value: PropertyValue,
        scope: SubgraphId,
    ) -> GraphResult<()> {
        self.set_all(prop, ElementKind::Edge, value, scope)
    }

    pub(crate) fn write_value(&mut self, prop: PropertyId, el: Element, value: PropertyValue) -> GraphResult<()> {
        let changed = self
            .registry
            .get_mut(prop)?
            .column_mut(el.kind())
            .set(el.as_u32(), value)?;
        if changed {
            trace!(property = %prop, element = %el, "value changed");
            self.emit(prop, EventKind::ValueChanged(el));
        }
        Ok(())
    }

    fn set_default(&mut self, prop: PropertyId, kind: ElementKind, value: PropertyValue) -> GraphResult<()> {
        self.guard_generic_write(prop)?;
        self.check_references(&value)?;
        let changed = self
            .registry
            .get_mut(prop)?
            .column_mut(kind)
            .set_default(value)?;
        if changed {
            self.emit(prop, EventKind::ValueChangedAll);
        }
        Ok(())
    }

    fn set_all(
        &mut self,
        prop: PropertyId,
        kind: ElementKind,
        value: PropertyValue,
        scope: SubgraphId,
    ) -> GraphResult<()> {
        self.guard_generic_write(prop)?;
        self.check_references(&value)?;
        let view = self.hierarchy.view(scope)?;
        let owner = self.registry.get(prop)?.owner();
        let replaces_default = scope == owner || !self.hierarchy.is_descendant_of(scope, owner);
        let targets: Vec<u32> = if replaces_default {
            Vec::new()
        } else {
            match kind {
                ElementKind::Node => view.nodes().map(|n| n.as_u32()).collect(),
                ElementKind::Edge => view.edges().map(|e| e.as_u32()).collect(),
            }
        };
        let column = self.registry.get_mut(prop)?.column_mut(kind);
        column.accepts(&value)?;

        if replaces_default {
            let changed = !column.default_value().same(&value) || column.override_count() > 0;
            column.set_all(value, Scope::All)?;
            if changed {
                self.emit(prop, EventKind::ValueChangedAll);
            }
            return Ok(());
        }

        let mut changed = Vec::new();
        for id in targets {
            if column.set(id, value.clone())? {
                changed.push(id);
            }
        }
        for id in changed {
            let el = match kind {
                ElementKind::Node => Element::Node(NodeId(id)),
                ElementKind::Edge => Element::Edge(EdgeId(id)),
            };
            self.emit(prop, EventKind::ValueChanged(el));
        }
        Ok(())
    }

    // ---- Internals ----

    pub(crate) fn check_node(&self, n: NodeId) -> GraphResult<()> {
        if self.adjacency.is_node(n) {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(n))
        }
    }

    pub(crate) fn check_edge(&self, e: EdgeId) -> GraphResult<()> {
        if self.adjacency.is_edge(e) {
            Ok(())
        } else {
            Err(GraphError::EdgeNotFound(e))
        }
    }

    /// The view of `sg`, provided `n` is live and visible there
    fn visible_node(&self, sg: SubgraphId, n: NodeId) -> GraphResult<&SubgraphView> {
        let view = self.hierarchy.view(sg)?;
        self.check_node(n)?;
        if !view.contains_node(n) {
            return Err(GraphError::invalid(format!("{} is not visible in {}", n, sg)));
        }
        Ok(view)
    }

    fn check_references(&self, value: &PropertyValue) -> GraphResult<()> {
        match value {
            PropertyValue::Graph(Some(g)) => {
                self.hierarchy.view(*g)?;
            }
            PropertyValue::EdgeSet(edges) => {
                for &e in edges {
                    self.check_edge(e)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn guard_generic_write(&self, prop: PropertyId) -> GraphResult<()> {
        self.registry.get(prop)?;
        if self.meta.property == Some(prop) {
            return Err(GraphError::invalid(format!(
                "{} is maintained by meta node operations",
                META_GRAPH_PROPERTY
            )));
        }
        Ok(())
    }

    fn guard_meta_name(&self, sg: SubgraphId, name: &str) -> GraphResult<()> {
        if sg.is_root() && name == META_GRAPH_PROPERTY && self.meta.property.is_some() {
            return Err(GraphError::invalid(format!(
                "{} cannot be erased or renamed",
                META_GRAPH_PROPERTY
            )));
        }
        Ok(())
    }

    /// Show `nodes` and `edges` in a freshly created `sg`
    fn fill_subgraph(&mut self, sg: SubgraphId, nodes: &[NodeId], edges: &[EdgeId]) -> GraphResult<()> {
        for &n in nodes {
            self.hierarchy.view_mut(sg)?.insert_node(n);
            self.emit(sg, EventKind::ElementAdded(Element::Node(n)));
        }
        for &e in edges {
            self.hierarchy.view_mut(sg)?.insert_edge(e);
            self.emit(sg, EventKind::ElementAdded(Element::Edge(e)));
        }
        Ok(())
    }

    /// Define a property like `prop` in `into`, with the same defaults and values
    fn copy_property(&mut self, prop: PropertyId, into: SubgraphId) -> GraphResult<PropertyId> {
        let source = self.registry.get(prop)?;
        let name = source.name().to_string();
        let ty = source.property_type();
        let defaults = [
            (ElementKind::Node, source.node_default()),
            (ElementKind::Edge, source.edge_default()),
        ];
        let mut values: Vec<(Element, PropertyValue)> = source
            .node_overrides()
            .into_iter()
            .map(|(n, v)| (Element::Node(n), v))
            .collect();
        values.extend(source.edge_overrides().into_iter().map(|(e, v)| (Element::Edge(e), v)));

        let copy = self.create_property(into, &name, ty)?;
        for (kind, value) in defaults {
            self.registry.get_mut(copy)?.column_mut(kind).set_default(value)?;
        }
        for (el, value) in values {
            self.write_value(copy, el, value)?;
        }
        Ok(copy)
    }

    /// Show `n` along `chain` (a subgraph followed by its ancestors), root first
    fn show_node(&mut self, chain: &[SubgraphId], n: NodeId) {
        for &g in chain.iter().rev() {
            if let Ok(view) = self.hierarchy.view_mut(g) {
                if view.insert_node(n) {
                    self.emit(g, EventKind::ElementAdded(Element::Node(n)));
                }
            }
        }
    }

    fn show_edge(&mut self, chain: &[SubgraphId], e: EdgeId) {
        for &g in chain.iter().rev() {
            if let Ok(view) = self.hierarchy.view_mut(g) {
                if view.insert_edge(e) {
                    self.emit(g, EventKind::ElementAdded(Element::Edge(e)));
                }
            }
        }
    }

    fn emit_reordered(&self, n: NodeId) -> GraphResult<()> {
        for g in self.hierarchy.pre_order(SubgraphId::ROOT)? {
            if self.hierarchy.view(g)?.contains_node(n) {
                self.emit(g, EventKind::IncidenceReordered(n));
            }
        }
        Ok(())
    }

    fn delete_node_everywhere(&mut self, n: NodeId) -> GraphResult<()> {
        let incident: Vec<EdgeId> = self.adjacency.incident_edges(n, Direction::Both).collect();
        for e in incident {
            self.delete_edge_everywhere(e)?;
        }
        for g in self.hierarchy.post_order(SubgraphId::ROOT)? {
            if self.hierarchy.view_mut(g)?.remove_node(n) {
                self.emit(g, EventKind::ElementDeleted(Element::Node(n)));
            }
        }
        self.reset_everywhere(Element::Node(n))?;
        self.adjacency.delete_node(n)?;
        trace!(node = %n, "deleted node");
        Ok(())
    }

    fn delete_edge_everywhere(&mut self, e: EdgeId) -> GraphResult<()> {
        for g in self.hierarchy.post_order(SubgraphId::ROOT)? {
            if self.hierarchy.view_mut(g)?.remove_edge(e) {
                self.emit(g, EventKind::ElementDeleted(Element::Edge(e)));
            }
        }
        self.reset_everywhere(Element::Edge(e))?;
        self.clear_edge_references(e)?;
        self.adjacency.delete_edge(e)?;
        trace!(edge = %e, "deleted edge");
        Ok(())
    }

    /// Remove `n` and its visible edges from `sg` and its descendants
    fn hide_node(&mut self, sg: SubgraphId, n: NodeId) -> GraphResult<()> {
        let incident: Vec<EdgeId> = self.adjacency.incident_edges(n, Direction::Both).collect();
        for g in self.hierarchy.post_order(sg)? {
            let view = self.hierarchy.view_mut(g)?;
            if !view.contains_node(n) {
                continue;
            }
            let mut removed = Vec::new();
            for &e in &incident {
                if view.remove_edge(e) {
                    removed.push(Element::Edge(e));
                }
            }
            view.remove_node(n);
            removed.push(Element::Node(n));
            for &el in &removed {
                self.emit(g, EventKind::ElementDeleted(el));
            }
            self.reset_local(g, &removed)?;
        }
        Ok(())
    }

    fn hide_edge(&mut self, sg: SubgraphId, e: EdgeId) -> GraphResult<()> {
        for g in self.hierarchy.post_order(sg)? {
            if self.hierarchy.view_mut(g)?.remove_edge(e) {
                let el = Element::Edge(e);
                self.emit(g, EventKind::ElementDeleted(el));
                self.reset_local(g, &[el])?;
            }
        }
        Ok(())
    }

    /// Reset elements leaving `g` in the properties `g` defines
    fn reset_local(&mut self, g: SubgraphId, elements: &[Element]) -> GraphResult<()> {
        for prop in self.registry.local_ids(g) {
            for &el in elements {
                self.reset_value(prop, el)?;
            }
        }
        Ok(())
    }

    /// Reset a deleted element in every property so a recycled id starts clean
    fn reset_everywhere(&mut self, el: Element) -> GraphResult<()> {
        for prop in self.registry.ids() {
            // Releasing a meta group may drop properties local to it
            if self.registry.contains(prop) {
                self.reset_value(prop, el)?;
            }
        }
        Ok(())
    }

    fn reset_value(&mut self, prop: PropertyId, el: Element) -> GraphResult<()> {
        let owned_group = match el {
            Element::Node(n) if self.meta.property == Some(prop) => self
                .registry
                .get(prop)?
                .node_value(n)
                .as_graph()
                .filter(|g| self.meta.owners.get(g) == Some(&n)),
            _ => None,
        };
        let changed = self
            .registry
            .get_mut(prop)?
            .column_mut(el.kind())
            .clear_override(el.as_u32());
        if changed {
            self.emit(prop, EventKind::ValueChanged(el));
        }
        if let Some(group) = owned_group {
            self.meta.owners.remove(&group);
            if self.hierarchy.contains(group) {
                self.remove_subgraph(group)?;
            }
        }
        Ok(())
    }

    /// Take a deleted edge out of every edge-set value so a recycled id
    /// is never mistaken for it
    fn clear_edge_references(&mut self, e: EdgeId) -> GraphResult<()> {
        for prop in self.registry.ids() {
            if !self.registry.contains(prop) {
                continue;
            }
            let column = self.registry.get_mut(prop)?.column_mut(ElementKind::Edge);
            let (changed, default_hit) = column.remove_edge_references(e);
            for id in changed {
                self.emit(prop, EventKind::ValueChanged(Element::Edge(EdgeId(id))));
            }
            if default_hit {
                self.emit(prop, EventKind::ValueChangedAll);
            }
        }
        Ok(())
    }

    /// Drop every graph-valued reference to a destroyed subgraph
    fn clear_references_to(&mut self, g: SubgraphId) -> GraphResult<()> {
        if let Some(owner) = self.meta.owners.remove(&g) {
            if let Some(prop) = self.meta.property {
                let changed = self
                    .registry
                    .get_mut(prop)?
                    .column_mut(ElementKind::Node)
                    .clear_override(owner.as_u32());
                if changed {
                    self.emit(prop, EventKind::ValueChanged(Element::Node(owner)));
                }
            }
        }
        let stale = PropertyValue::Graph(Some(g));
        for prop in self.registry.ids() {
            let column = self.registry.get_mut(prop)?.column_mut(ElementKind::Node);
            if column.property_type() != PropertyType::Graph {
                continue;
            }
            let hits: Vec<u32> = column
                .overrides()
                .into_iter()
                .filter(|(_, v)| *v == stale)
                .map(|(id, _)| id)
                .collect();
            for &id in &hits {
                column.clear_override(id);
            }
            let default_hit = column.default_value() == stale;
            if default_hit {
                column.set_default(PropertyValue::Graph(None))?;
            }
            for id in hits {
                self.emit(prop, EventKind::ValueChanged(Element::Node(NodeId(id))));
            }
            if default_hit {
                self.emit(prop, EventKind::ValueChangedAll);
            }
        }
        Ok(())
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GraphStore {
    /// Every entity dies with the store: properties first, then the
    /// subgraphs children first, the root last
    fn drop(&mut self) {
        self.bus.release_all();
        let order = self.hierarchy.post_order(SubgraphId::ROOT).unwrap_or_default();
        for &g in &order {
            for prop in self.registry.local_ids(g) {
                self.bus.destroy(EntityId::Property(prop));
            }
        }
        for g in order {
            self.bus.destroy(EntityId::Subgraph(g));
        }
    }
}

/// Holds notifications on a store until dropped
pub struct NotificationHold<'a> {
    store: &'a mut GraphStore,
}

impl Deref for NotificationHold<'_> {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        self.store
    }
}

impl DerefMut for NotificationHold<'_> {
    fn deref_mut(&mut self) -> &mut GraphStore {
        self.store
    }
}

impl Drop for NotificationHold<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.bus.release() {
            warn!(error = %e, "failed to release notification hold");
        }
    }
}
