//! Canonical node/edge storage (the root graph's universe)
//!
//! The adjacency store owns, for every live node, its ordered incidence
//! list, and for every live edge, its `(source, target)` pair. An edge
//! appears once in the incidence list of each end, twice in the list of
//! a node it loops on. Views never copy any of this; they only filter it.
//!
//! Accessors on this type treat an invalid id as a contract violation and
//! panic. The [`GraphStore`](super::GraphStore) facade validates ids before
//! reaching this layer and reports `NodeNotFound`/`EdgeNotFound` instead.

use super::error::{GraphError, GraphResult};
use super::id::IdAllocator;
use super::types::{Direction, EdgeId, NodeId};

#[derive(Debug, Clone, Default)]
struct NodeRecord {
    /// Incident edges in rotation order
    edges: Vec<EdgeId>,
    out_degree: u32,
}

/// Storage for all nodes and edges
#[derive(Debug, Clone, Default)]
pub struct AdjacencyStore {
    node_ids: IdAllocator,
    edge_ids: IdAllocator,
    /// Node arena indexed by NodeId
    nodes: Vec<NodeRecord>,
    /// Edge arena indexed by EdgeId
    ends: Vec<(NodeId, NodeId)>,
}

impl AdjacencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        AdjacencyStore {
            node_ids: IdAllocator::with_capacity(nodes),
            edge_ids: IdAllocator::with_capacity(edges),
            nodes: Vec::with_capacity(nodes),
            ends: Vec::with_capacity(edges),
        }
    }

    /// Grow backing storage ahead of a bulk insertion
    pub fn reserve(&mut self, nodes: usize, edges: usize) {
        self.nodes.reserve(nodes);
        self.ends.reserve(edges);
    }

    pub fn is_node(&self, n: NodeId) -> bool {
        self.node_ids.is_valid(n.0)
    }

    pub fn is_edge(&self, e: EdgeId) -> bool {
        self.edge_ids.is_valid(e.0)
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_ids.len()
    }

    /// Live node ids in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids.ids().map(NodeId)
    }

    /// Live edge ids in ascending order
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_ids.ids().map(EdgeId)
    }

    pub fn add_node(&mut self) -> NodeId {
        let n = NodeId(self.node_ids.allocate());
        self.restore_node_slot(n);
        n
    }

    /// Add `count` nodes with contiguous fresh ids
    pub fn add_nodes(&mut self, count: u32) -> Vec<NodeId> {
        let range = self.node_ids.reserve(count);
        let end = range.end as usize;
        if self.nodes.len() < end {
            self.nodes.resize_with(end, NodeRecord::default);
        }
        range.map(NodeId).collect()
    }

    /// # Panics
    ///
    /// Panics if either end is not a live node.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> EdgeId {
        assert!(self.is_node(src), "source {} is not a live node", src);
        assert!(self.is_node(dst), "target {} is not a live node", dst);
        let e = EdgeId(self.edge_ids.allocate());
        if e.index() >= self.ends.len() {
            self.ends.resize(e.index() + 1, (NodeId(0), NodeId(0)));
        }
        self.link(e, src, dst);
        e
    }

    /// Add one edge per pair with contiguous fresh ids
    pub fn add_edges(&mut self, pairs: &[(NodeId, NodeId)]) -> Vec<EdgeId> {
        for &(src, dst) in pairs {
            assert!(self.is_node(src), "source {} is not a live node", src);
            assert!(self.is_node(dst), "target {} is not a live node", dst);
        }
        let range = self.edge_ids.reserve(pairs.len() as u32);
        let end = range.end as usize;
        if self.ends.len() < end {
            self.ends.resize(end, (NodeId(0), NodeId(0)));
        }
        range
            .zip(pairs.iter())
            .map(|(id, &(src, dst))| {
                let e = EdgeId(id);
                self.link(e, src, dst);
                e
            })
            .collect()
    }

    /// Detach an edge from both ends and release its id
    pub fn delete_edge(&mut self, e: EdgeId) -> GraphResult<()> {
        let (src, dst) = self.endpoints(e);
        self.nodes[src.index()].out_degree -= 1;
        self.nodes[src.index()].edges.retain(|&x| x != e);
        if dst != src {
            self.nodes[dst.index()].edges.retain(|&x| x != e);
        }
        self.edge_ids.free(e.0)
    }

    /// Release a node id. The node must already be detached from every
    /// edge; the facade deletes incident edges one by one first so that
    /// each deletion is observed.
    pub fn delete_node(&mut self, n: NodeId) -> GraphResult<()> {
        if !self.is_node(n) {
            return Err(GraphError::NodeNotFound(n));
        }
        if !self.nodes[n.index()].edges.is_empty() {
            return Err(GraphError::invalid(format!(
                "{} still has {} incident edges",
                n,
                self.nodes[n.index()].edges.len()
            )));
        }
        self.node_ids.free(n.0)?;
        self.nodes[n.index()] = NodeRecord::default();
        Ok(())
    }

    /// Number of incident edge slots (a self-loop counts twice)
    pub fn degree(&self, n: NodeId) -> usize {
        self.record(n).edges.len()
    }

    pub fn out_degree(&self, n: NodeId) -> usize {
        self.record(n).out_degree as usize
    }

    pub fn in_degree(&self, n: NodeId) -> usize {
        let rec = self.record(n);
        rec.edges.len() - rec.out_degree as usize
    }

    /// Raw rotation order; a self-loop appears twice
    pub fn incidence(&self, n: NodeId) -> &[EdgeId] {
        &self.record(n).edges
    }

    /// Incident edges in rotation order, each edge yielded once
    pub fn incident_edges(&self, n: NodeId, direction: Direction) -> IncidentEdges<'_> {
        IncidentEdges {
            store: self,
            node: n,
            direction,
            inner: self.record(n).edges.iter(),
            loops_seen: Vec::new(),
        }
    }

    /// Opposite ends of the incident edges, in rotation order
    pub fn neighbors(&self, n: NodeId, direction: Direction) -> impl Iterator<Item = NodeId> + '_ {
        self.incident_edges(n, direction)
            .map(move |e| self.opposite(e, n))
    }

    /// `(source, target)` of a live edge
    pub fn endpoints(&self, e: EdgeId) -> (NodeId, NodeId) {
        assert!(self.is_edge(e), "{} is not a live edge", e);
        self.ends[e.index()]
    }

    pub fn source(&self, e: EdgeId) -> NodeId {
        self.endpoints(e).0
    }

    pub fn target(&self, e: EdgeId) -> NodeId {
        self.endpoints(e).1
    }

    /// The end of `e` that is not `n` (or `n` itself for a self-loop)
    pub fn opposite(&self, e: EdgeId, n: NodeId) -> NodeId {
        let (src, dst) = self.endpoints(e);
        if src == n {
            dst
        } else {
            src
        }
    }

    /// All edges between two nodes, without duplicates
    pub fn edges_between(&self, src: NodeId, dst: NodeId, directed: bool) -> Vec<EdgeId> {
        let mut found: Vec<EdgeId> = self
            .record(src)
            .edges
            .iter()
            .copied()
            .filter(|&e| {
                let (s, t) = self.ends[e.index()];
                (s == src && t == dst) || (!directed && s == dst && t == src)
            })
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Replace the rotation order of `n`. The new order must be a
    /// permutation of the current incidence list.
    pub fn set_incidence_order(&mut self, n: NodeId, order: &[EdgeId]) -> GraphResult<()> {
        let current = &self.record(n).edges;
        if current.len() != order.len() {
            return Err(GraphError::invalid(format!(
                "new order for {} has {} edges, expected {}",
                n,
                order.len(),
                current.len()
            )));
        }
        let mut a = current.clone();
        let mut b = order.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        if a != b {
            return Err(GraphError::invalid(format!(
                "new order for {} is not a permutation of its incidence list",
                n
            )));
        }
        self.nodes[n.index()].edges = order.to_vec();
        Ok(())
    }

    /// Exchange the positions of two incident edges of `n`
    pub fn swap_incidence_order(&mut self, n: NodeId, e1: EdgeId, e2: EdgeId) -> GraphResult<()> {
        if e1 == e2 {
            return Ok(());
        }
        let edges = &mut self.nodes[n.index()].edges;
        let p1 = edges.iter().position(|&e| e == e1);
        let p2 = edges.iter().position(|&e| e == e2);
        match (p1, p2) {
            (Some(p1), Some(p2)) => {
                edges.swap(p1, p2);
                Ok(())
            }
            _ => Err(GraphError::invalid(format!(
                "{} and {} are not both incident to {}",
                e1, e2, n
            ))),
        }
    }

    /// Swap source and target in place; the id and rotation positions are kept
    pub fn reverse(&mut self, e: EdgeId) {
        let (src, dst) = self.endpoints(e);
        self.nodes[src.index()].out_degree -= 1;
        self.nodes[dst.index()].out_degree += 1;
        self.ends[e.index()] = (dst, src);
    }

    pub fn clear(&mut self) {
        self.node_ids.clear();
        self.edge_ids.clear();
        self.nodes.clear();
        self.ends.clear();
    }

    fn record(&self, n: NodeId) -> &NodeRecord {
        assert!(self.is_node(n), "{} is not a live node", n);
        &self.nodes[n.index()]
    }

    fn restore_node_slot(&mut self, n: NodeId) {
        if n.index() >= self.nodes.len() {
            self.nodes.resize_with(n.index() + 1, NodeRecord::default);
        } else {
            self.nodes[n.index()] = NodeRecord::default();
        }
    }

    fn link(&mut self, e: EdgeId, src: NodeId, dst: NodeId) {
        self.ends[e.index()] = (src, dst);
        let src_rec = &mut self.nodes[src.index()];
        src_rec.out_degree += 1;
        src_rec.edges.push(e);
        self.nodes[dst.index()].edges.push(e);
    }
}

/// Iterator over the incident edges of a node
pub struct IncidentEdges<'a> {
    store: &'a AdjacencyStore,
    node: NodeId,
    direction: Direction,
    inner: std::slice::Iter<'a, EdgeId>,
    /// Self-loops already yielded (they occupy two incidence slots)
    loops_seen: Vec<EdgeId>,
}

impl Iterator for IncidentEdges<'_> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        for &e in self.inner.by_ref() {
            let (src, dst) = self.store.ends[e.index()];
            if src == dst {
                if self.loops_seen.contains(&e) {
                    continue;
                }
                self.loops_seen.push(e);
                return Some(e);
            }
            let keep = match self.direction {
                Direction::Out => src == self.node,
                Direction::In => dst == self.node,
                Direction::Both => true,
            };
            if keep {
                return Some(e);
            }
        }
        None
    }
}
