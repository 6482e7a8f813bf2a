//! Pathfinding algorithms
//!
//! Breadth-first search, both as an unweighted shortest path and as a
//! reachability sweep.

use super::common::{GraphView, NodeId};
use std::collections::{HashMap, VecDeque};

/// Result of a pathfinding algorithm
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Vec<NodeId>,
    pub cost: f64,
}

/// Breadth-First Search (Unweighted Shortest Path) along edge direction
pub fn bfs(view: &GraphView, source: NodeId, target: NodeId) -> Option<PathResult> {
    let source_idx = *view.node_to_index.get(&source)?;
    let target_idx = *view.node_to_index.get(&target)?;

    let mut queue = VecDeque::new();
    let mut visited = HashMap::new(); // index -> parent_index

    queue.push_back(source_idx);
    visited.insert(source_idx, None);

    while let Some(current_idx) = queue.pop_front() {
        if current_idx == target_idx {
            let mut path = Vec::new();
            let mut curr = Some(target_idx);
            while let Some(idx) = curr {
                path.push(view.index_to_node[idx]);
                curr = visited.get(&idx).copied().flatten();
            }
            path.reverse();
            return Some(PathResult {
                source,
                target,
                cost: (path.len() - 1) as f64,
                path,
            });
        }

        for &next_idx in view.successors(current_idx) {
            if !visited.contains_key(&next_idx) {
                visited.insert(next_idx, Some(current_idx));
                queue.push_back(next_idx);
            }
        }
    }

    None
}

/// Every node reachable from `source`, in visiting order.
///
/// With `directed == false` edges are followed both ways. Returns an empty
/// list when `source` is not in the view.
pub fn bfs_reachable(view: &GraphView, source: NodeId, directed: bool) -> Vec<NodeId> {
    let Some(&source_idx) = view.node_to_index.get(&source) else {
        return Vec::new();
    };

    let mut visited = vec![false; view.node_count];
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    visited[source_idx] = true;
    queue.push_back(source_idx);

    while let Some(idx) = queue.pop_front() {
        order.push(view.index_to_node[idx]);
        let backwards: &[usize] = if directed { &[] } else { view.predecessors(idx) };
        for &next in view.successors(idx).iter().chain(backwards) {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 -> 2 -> 3, 4 -> 3
    fn chain() -> GraphView {
        GraphView::from_adjacency_list(
            vec![1, 2, 3, 4],
            vec![vec![1], vec![2], vec![], vec![2]],
            vec![vec![], vec![0], vec![1, 3], vec![]],
        )
    }

    #[test]
    fn test_bfs_path() {
        let view = chain();
        let result = bfs(&view, 1, 3).unwrap();
        assert_eq!(result.path, vec![1, 2, 3]);
        assert_eq!(result.cost, 2.0);
        assert!(bfs(&view, 3, 1).is_none());
        assert!(bfs(&view, 1, 99).is_none());
    }

    #[test]
    fn test_reachable_directed() {
        let view = chain();
        assert_eq!(bfs_reachable(&view, 1, true), vec![1, 2, 3]);
        assert_eq!(bfs_reachable(&view, 3, true), vec![3]);
    }

    #[test]
    fn test_reachable_undirected() {
        let view = chain();
        let mut all = bfs_reachable(&view, 3, false);
        all.sort_unstable();
        assert_eq!(all, vec![1, 2, 3, 4]);
        assert!(bfs_reachable(&view, 42, false).is_empty());
    }
}
