//! Core graph store
//!
//! This module implements the attributed multigraph with:
//! - Recycled integer ids for nodes and edges (`id`)
//! - Canonical incidence storage with rotation order (`adjacency`)
//! - A tree of filtered subgraph views over that storage (`hierarchy`)
//! - Sparse typed properties with inheritance along the tree (`storage`, `registry`)
//! - Change notification with hold-batching (`event`, `notify`)
//! - Meta nodes standing for grouped subgraphs (`meta`)

pub mod adjacency;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod id;
pub mod meta;
pub mod notify;
pub mod property;
pub mod registry;
pub mod storage;
pub mod store;
pub mod types;

// Re-export main types
pub use adjacency::{AdjacencyStore, IncidentEdges};
pub use error::{GraphError, GraphResult};
pub use event::{EntityId, Event, EventKind};
pub use hierarchy::{Hierarchy, SubgraphView};
pub use id::IdAllocator;
pub use meta::META_GRAPH_PROPERTY;
pub use notify::{Disposition, Listener, ListenerId, NotificationBus};
pub use property::{Color, PropertyType, PropertyValue, Vec3};
pub use registry::{Property, PropertyRegistry};
pub use storage::{Column, IdSet, Scope, SparseStore};
pub use store::{ClonePlacement, GraphStatistics, GraphStore, NotificationHold};
pub use types::{Direction, EdgeId, Element, ElementKind, NodeId, PropertyId, SubgraphId};
