//! Pure-topology graph algorithms
//!
//! Algorithms run over a [`GraphView`], a dense CSR snapshot of a graph
//! built by the caller. They never see the store the view was built from.

pub mod common;
pub mod community;
pub mod pathfinding;

pub use common::{GraphView, NodeId};
pub use community::{weakly_connected_components, WccResult};
pub use pathfinding::{bfs, bfs_reachable, PathResult};
