//! Graph algorithms module
//!
//! Algorithms are implemented in the `strata-graph-algorithms` crate over a
//! dense CSR [`GraphView`]. This module provides the integration layer:
//! turning a subgraph into a view, and caching results that stay valid
//! across monotone edits.

pub mod connectivity;
pub mod minmax;

use crate::graph::{GraphResult, GraphStore, NodeId, SubgraphId};
use strata_graph_algorithms::NodeId as AlgoNodeId;
use tracing::trace;

pub use connectivity::ConnectivityCache;
pub use minmax::{MinMax, MinMaxCache};

// Re-export algorithms
pub use strata_graph_algorithms::{
    bfs, bfs_reachable, weakly_connected_components, GraphView, PathResult, WccResult,
};

/// Build a GraphView of the nodes and edges visible in `sg`
pub fn build_view(store: &GraphStore, sg: SubgraphId) -> GraphResult<GraphView> {
    let view = store.subgraph(sg)?;

    let index_to_node: Vec<AlgoNodeId> = view.nodes().map(|n| n.as_u32() as AlgoNodeId).collect();
    let node_count = index_to_node.len();
    let node_to_index: std::collections::HashMap<AlgoNodeId, usize> = index_to_node
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];

    for e in view.edges() {
        let (src, dst) = store.endpoints(e)?;
        // Visible edges always have visible ends
        let (Some(&u), Some(&v)) = (
            node_to_index.get(&(src.as_u32() as AlgoNodeId)),
            node_to_index.get(&(dst.as_u32() as AlgoNodeId)),
        ) else {
            continue;
        };
        outgoing[u].push(v);
        incoming[v].push(u);
    }

    trace!(subgraph = %sg, nodes = node_count, "built algorithm view");
    Ok(GraphView::from_adjacency_list(index_to_node, outgoing, incoming))
}

/// Whether every node of `sg` reaches every other ignoring direction.
///
/// The empty graph counts as connected.
pub fn is_connected(store: &GraphStore, sg: SubgraphId) -> GraphResult<bool> {
    let view = build_view(store, sg)?;
    let Some(&first) = view.index_to_node.first() else {
        return Ok(true);
    };
    Ok(bfs_reachable(&view, first, false).len() == view.node_count)
}

/// Weakly connected components of `sg`, each sorted, largest first
pub fn connected_components(store: &GraphStore, sg: SubgraphId) -> GraphResult<Vec<Vec<NodeId>>> {
    let view = build_view(store, sg)?;
    let result = weakly_connected_components(&view);
    Ok(result
        .sorted_components()
        .into_iter()
        .map(|c| c.into_iter().map(|id| NodeId::new(id as u32)).collect())
        .collect())
}
