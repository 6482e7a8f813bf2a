//! Community detection algorithms
//!
//! Weakly connected components via union-find.

use super::common::{GraphView, NodeId};
use std::collections::HashMap;

/// Result of WCC algorithm
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WccResult {
    /// Map of Component ID -> List of NodeIds
    pub components: HashMap<usize, Vec<NodeId>>,
    /// Map of NodeId -> Component ID
    pub node_component: HashMap<NodeId, usize>,
}

impl WccResult {
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Node sets of every component, each sorted, largest first
    pub fn sorted_components(&self) -> Vec<Vec<NodeId>> {
        let mut out: Vec<Vec<NodeId>> = self
            .components
            .values()
            .map(|c| {
                let mut c = c.clone();
                c.sort_unstable();
                c
            })
            .collect();
        out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        out
    }
}

/// Union-Find data structure
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            // Path halving
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i == root_j {
            return;
        }
        match self.rank[root_i].cmp(&self.rank[root_j]) {
            std::cmp::Ordering::Less => self.parent[root_i] = root_j,
            std::cmp::Ordering::Greater => self.parent[root_j] = root_i,
            std::cmp::Ordering::Equal => {
                self.parent[root_j] = root_i;
                self.rank[root_i] += 1;
            }
        }
    }
}

/// Weakly Connected Components (WCC)
///
/// Finds all disjoint subgraphs in the graph.
/// Ignores edge direction.
pub fn weakly_connected_components(view: &GraphView) -> WccResult {
    let n = view.node_count;
    let mut uf = UnionFind::new(n);

    for u_idx in 0..n {
        for &v_idx in view.successors(u_idx) {
            uf.union(u_idx, v_idx);
        }
    }

    let mut components = HashMap::new();
    let mut node_component = HashMap::new();

    for i in 0..n {
        let root = uf.find(i);
        let node_id = view.index_to_node[i];

        components.entry(root).or_insert_with(Vec::new).push(node_id);
        node_component.insert(node_id, root);
    }

    WccResult {
        components,
        node_component,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(ids: Vec<NodeId>, edges: &[(usize, usize)]) -> GraphView {
        let n = ids.len();
        let mut outgoing = vec![vec![]; n];
        let mut incoming = vec![vec![]; n];
        for &(u, v) in edges {
            outgoing[u].push(v);
            incoming[v].push(u);
        }
        GraphView::from_adjacency_list(ids, outgoing, incoming)
    }

    #[test]
    fn test_wcc() {
        // Nodes: 1, 2, 3, 4, 5, 6
        // Edges: 1->2, 3->4->5, 6 (isolated)
        let view = view(vec![1, 2, 3, 4, 5, 6], &[(0, 1), (2, 3), (3, 4)]);
        let result = weakly_connected_components(&view);

        assert_eq!(result.component_count(), 3);

        let c1 = result.node_component[&1];
        let c2 = result.node_component[&2];
        assert_eq!(c1, c2);

        let c3 = result.node_component[&3];
        let c4 = result.node_component[&4];
        let c5 = result.node_component[&5];
        assert_eq!(c3, c4);
        assert_eq!(c4, c5);
        assert_ne!(c1, c3);

        assert_eq!(
            result.sorted_components(),
            vec![vec![3, 4, 5], vec![1, 2], vec![6]]
        );
    }

    #[test]
    fn test_direction_ignored() {
        // 1 -> 2 <- 3
        let view = view(vec![1, 2, 3], &[(0, 1), (2, 1)]);
        assert_eq!(weakly_connected_components(&view).component_count(), 1);
    }

    #[test]
    fn test_self_loop_and_empty() {
        let looped = view(vec![7], &[(0, 0)]);
        assert_eq!(weakly_connected_components(&looped).component_count(), 1);

        let empty = view(vec![], &[]);
        assert_eq!(weakly_connected_components(&empty).component_count(), 0);
    }
}
