//! Errors that can occur during graph operations

use super::property::PropertyType;
use super::types::{EdgeId, NodeId, PropertyId, SubgraphId};
use thiserror::Error;

/// Errors that can occur during graph operations
///
/// `InvalidOperation` and the `*NotFound` variants are contract violations:
/// the caller handed the store something it never issued or asked for a
/// mutation that would break an invariant. `DuplicateProperty` and
/// `UnknownProperty` are expected to be checked for and recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Subgraph {0} not found")]
    SubgraphNotFound(SubgraphId),

    #[error("Property {0} not found")]
    PropertyNotFound(PropertyId),

    #[error("Property '{name}' already exists in {subgraph}")]
    DuplicateProperty { subgraph: SubgraphId, name: String },

    #[error("Property '{name}' is not defined for {subgraph}")]
    UnknownProperty { subgraph: SubgraphId, name: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: PropertyType,
        found: PropertyType,
    },
}

impl GraphError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GraphError::InvalidOperation(msg.into())
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
