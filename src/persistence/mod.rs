//! Persistence layer
//!
//! A store is saved as a [`Snapshot`]: a self-contained image with dense
//! renumbered ids, written as JSON or as compact bincode.

pub mod snapshot;

pub use snapshot::{PropertyImage, Snapshot, SubgraphImage, SNAPSHOT_FORMAT_VERSION};

use crate::graph::GraphError;
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Malformed snapshot: {0}")]
    Format(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
