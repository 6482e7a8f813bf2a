//! Meta nodes: collapsing a set of nodes into one representative
//!
//! Grouping creates a sibling subgraph holding the grouped nodes and a new
//! node standing for them. The root property [`META_GRAPH_PROPERTY`] maps
//! the meta node to its group and every meta edge to the underlying edges
//! it summarizes. That property owns the groups it references: clearing a
//! meta node's value destroys its group.

use super::error::{GraphError, GraphResult};
use super::property::{PropertyType, PropertyValue};
use super::store::GraphStore;
use super::types::{Direction, EdgeId, Element, NodeId, PropertyId, SubgraphId};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Name of the root property holding meta node groups
pub const META_GRAPH_PROPERTY: &str = "viewMetaGraph";

/// Ownership bookkeeping for meta node groups
#[derive(Debug, Default)]
pub(crate) struct MetaState {
    pub(crate) property: Option<PropertyId>,
    /// Group subgraph -> the meta node owning it
    pub(crate) owners: FxHashMap<SubgraphId, NodeId>,
}

impl GraphStore {
    /// Whether `n` stands for a group of nodes
    pub fn is_meta_node(&self, n: NodeId) -> bool {
        self.meta_graph(n).is_some()
    }

    /// The group subgraph behind a meta node
    pub fn meta_graph(&self, n: NodeId) -> Option<SubgraphId> {
        let prop = self.meta.property?;
        if !self.is_node(n) {
            return None;
        }
        self.get_property(prop).ok()?.node_value(n).as_graph()
    }

    /// The underlying edges a meta edge summarizes
    pub fn meta_edge_members(&self, e: EdgeId) -> Vec<EdgeId> {
        let Some(prop) = self.meta.property else {
            return Vec::new();
        };
        if !self.is_edge(e) {
            return Vec::new();
        }
        match self.get_property(prop).map(|p| p.edge_value(e)) {
            Ok(PropertyValue::EdgeSet(edges)) => edges,
            _ => Vec::new(),
        }
    }

    /// Collapse `nodes` of `sg` into a single new node.
    ///
    /// The group becomes an induced child of `sg`'s parent. One meta edge
    /// per outside neighbour and direction replaces the edges crossing the
    /// group boundary, and the grouped nodes leave `sg`. All of it is
    /// delivered to subscribers as one held batch.
    pub fn create_meta_node(&mut self, sg: SubgraphId, nodes: &[NodeId]) -> GraphResult<NodeId> {
        if sg.is_root() {
            return Err(GraphError::invalid("meta nodes cannot be created in the root graph"));
        }
        if nodes.is_empty() {
            return Err(GraphError::invalid("cannot group an empty set of nodes"));
        }
        let view = self.subgraph(sg)?;
        for &n in nodes {
            self.check_node(n)?;
            if !view.contains_node(n) {
                return Err(GraphError::invalid(format!("{} is not visible in {}", n, sg)));
            }
        }
        let parent = view
            .parent()
            .ok_or_else(|| GraphError::invalid("the root graph has no parent"))?;

        self.hold()?;
        let result = self.group_nodes(sg, parent, nodes);
        self.release()?;
        result
    }

    /// Undo [`GraphStore::create_meta_node`]: show the group again in `sg`
    /// and delete the meta node, which releases the group subgraph.
    pub fn open_meta_node(&mut self, sg: SubgraphId, meta: NodeId) -> GraphResult<()> {
        self.check_node(meta)?;
        if !self.subgraph(sg)?.contains_node(meta) {
            return Err(GraphError::invalid(format!("{} is not visible in {}", meta, sg)));
        }
        let group = self
            .meta_graph(meta)
            .ok_or_else(|| GraphError::invalid(format!("{} is not a meta node", meta)))?;

        self.hold()?;
        let result = self.ungroup(sg, meta, group);
        self.release()?;
        result
    }

    fn group_nodes(&mut self, sg: SubgraphId, parent: SubgraphId, nodes: &[NodeId]) -> GraphResult<NodeId> {
        let group = self.create_induced_subgraph(parent, nodes, "")?;
        self.rename_subgraph(group, &format!("grp_{:05}", group.as_u32()))?;
        let grouped: Vec<NodeId> = self.subgraph(group)?.nodes().collect();
        let members: FxHashSet<NodeId> = grouped.iter().copied().collect();

        let meta = self.add_node(sg)?;
        self.set_meta_graph(meta, group)?;

        // (outside neighbour, edge leaves the group) -> crossing edges
        let mut crossing: IndexMap<(NodeId, bool), Vec<EdgeId>> = IndexMap::new();
        for &n in &grouped {
            for e in self.incident_edges_in(sg, n, Direction::Both)? {
                let (src, dst) = self.endpoints(e)?;
                let outgoing = src == n;
                let other = if outgoing { dst } else { src };
                if members.contains(&other) {
                    continue;
                }
                crossing.entry((other, outgoing)).or_default().push(e);
            }
        }
        for ((other, outgoing), underlying) in crossing {
            let edge = if outgoing {
                self.add_edge(sg, meta, other)?
            } else {
                self.add_edge(sg, other, meta)?
            };
            self.set_meta_edge(edge, underlying)?;
        }

        for &n in &grouped {
            self.delete_node(sg, n, false)?;
        }
        debug!(meta = %meta, group = %group, nodes = grouped.len(), "created meta node");
        Ok(meta)
    }

    fn ungroup(&mut self, sg: SubgraphId, meta: NodeId, group: SubgraphId) -> GraphResult<()> {
        let view = self.subgraph(group)?;
        let nodes: Vec<NodeId> = view.nodes().collect();
        let edges: Vec<EdgeId> = view.edges().collect();
        for n in nodes {
            self.add_existing_node(sg, n)?;
        }
        for e in edges {
            self.add_existing_edge(sg, e)?;
        }

        let meta_edges: Vec<EdgeId> = self.incident_edges(meta, Direction::Both)?.collect();
        for me in meta_edges {
            for e in self.meta_edge_members(me) {
                if !self.is_edge(e) || self.contains_edge(sg, e) {
                    continue;
                }
                let (src, dst) = self.endpoints(e)?;
                if self.contains_node(sg, src) && self.contains_node(sg, dst) {
                    self.add_existing_edge(sg, e)?;
                }
            }
        }

        self.delete_node(SubgraphId::ROOT, meta, true)?;
        debug!(meta = %meta, group = %group, "opened meta node");
        Ok(())
    }

    fn meta_property(&mut self) -> GraphResult<PropertyId> {
        match self.meta.property {
            Some(prop) => Ok(prop),
            None => self.create_property(SubgraphId::ROOT, META_GRAPH_PROPERTY, PropertyType::Graph),
        }
    }

    /// Record `group` as owned by `meta`
    pub(crate) fn set_meta_graph(&mut self, meta: NodeId, group: SubgraphId) -> GraphResult<()> {
        self.check_node(meta)?;
        self.subgraph(group)?;
        let prop = self.meta_property()?;
        self.meta.owners.insert(group, meta);
        self.write_value(prop, Element::Node(meta), PropertyValue::Graph(Some(group)))
    }

    /// Record the underlying edges of a meta edge
    pub(crate) fn set_meta_edge(&mut self, edge: EdgeId, underlying: Vec<EdgeId>) -> GraphResult<()> {
        self.check_edge(edge)?;
        for &e in &underlying {
            self.check_edge(e)?;
        }
        let prop = self.meta_property()?;
        self.write_value(prop, Element::Edge(edge), PropertyValue::EdgeSet(underlying))
    }
}
