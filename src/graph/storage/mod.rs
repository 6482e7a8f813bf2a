//! Storage building blocks for views and properties
//!
//! - `sparse`: chunked default-plus-overrides store backing every property
//! - `column`: the typed property columns built on it
//! - `idset`: O(1) membership sets used by subgraph views

pub mod column;
pub mod idset;
pub mod sparse;

pub use column::Column;
pub use idset::IdSet;
pub use sparse::{Overrides, Scope, SlotValue, SparseStore, DEFAULT_CHUNK_SIZE};
