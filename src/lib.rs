//! Strata Graph Store
//!
//! An in-memory attributed multigraph with a tree of subgraph views,
//! sparse typed properties and batched change notification.
//!
//! # Architecture
//!
//! - A single canonical adjacency store owns every node and edge
//! - Subgraphs are lightweight views holding membership sets only
//! - Properties keep one default per element kind plus sparse overrides,
//!   and resolve by name along the subgraph ancestor chain
//! - Every mutation is announced on a notification bus that can be held
//!   so subscribers observe one coalesced update per batch
//! - Meta nodes collapse a node set into one node backed by a group subgraph
//!
//! ## Example Usage
//!
//! ```rust
//! use strata::graph::{GraphStore, PropertyType, PropertyValue, SubgraphId};
//!
//! let mut store = GraphStore::new();
//! let root = SubgraphId::ROOT;
//!
//! let nodes = store.add_nodes(root, 3).unwrap();
//! let ab = store.add_edge(root, nodes[0], nodes[1]).unwrap();
//! store.add_edge(root, nodes[1], nodes[2]).unwrap();
//!
//! let weight = store.create_property(root, "weight", PropertyType::Float).unwrap();
//! store.set_edge_default(weight, PropertyValue::Float(1.0)).unwrap();
//! store.set_edge_value(weight, ab, PropertyValue::Float(2.5)).unwrap();
//! assert_eq!(store.edge_overrides(weight).unwrap().len(), 1);
//!
//! let view = store.create_induced_subgraph(root, &nodes[..2], "first-two").unwrap();
//! assert_eq!(store.edge_count_in(view).unwrap(), 1);
//! assert!(strata::algo::is_connected(&store, view).unwrap());
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod graph;
pub mod persistence;

// Re-export main types for convenience
pub use graph::{
    ClonePlacement, Direction, EdgeId, Element, ElementKind, EntityId, Event, EventKind, GraphError, GraphResult,
    GraphStatistics, GraphStore, Listener, ListenerId, NodeId, PropertyId, PropertyType,
    PropertyValue, SubgraphId,
};

pub use algo::{ConnectivityCache, MinMaxCache};

pub use config::{ConfigError, ConfigResult, StoreConfig};

pub use persistence::{PersistenceError, PersistenceResult, Snapshot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
