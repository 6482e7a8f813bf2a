//! Change events raised by subgraphs and properties
//!
//! Every mutation of the store is announced as an [`Event`] on the entity
//! that changed. Events are plain values so they can be queued while
//! notifications are held and compared for de-duplication.

use super::types::{EdgeId, Element, NodeId, PropertyId, SubgraphId};
use std::fmt;

/// An observable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Subgraph(SubgraphId),
    Property(PropertyId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Subgraph(g) => write!(f, "{}", g),
            EntityId::Property(p) => write!(f, "{}", p),
        }
    }
}

impl From<SubgraphId> for EntityId {
    fn from(g: SubgraphId) -> Self {
        EntityId::Subgraph(g)
    }
}

impl From<PropertyId> for EntityId {
    fn from(p: PropertyId) -> Self {
        EntityId::Property(p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A node or edge became visible in a subgraph
    ElementAdded(Element),
    /// A node or edge stopped being visible in a subgraph
    ElementDeleted(Element),
    /// The value of one element changed in a property
    ValueChanged(Element),
    /// A property default or bulk assignment changed many values at once
    ValueChangedAll,
    /// Last event an entity ever raises
    EntityDestroyed,
    EdgeReversed(EdgeId),
    IncidenceReordered(NodeId),
    SubgraphAdded(SubgraphId),
    SubgraphRemoved(SubgraphId),
    PropertyAdded(String),
    PropertyRemoved(String),
    PropertyRenamed { from: String, to: String },
    /// A subgraph attribute was added or given a new value
    AttributeSet(String),
    AttributeRemoved(String),
}

/// An event together with the entity that raised it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub entity: EntityId,
    pub kind: EventKind,
}

impl Event {
    pub fn new(entity: impl Into<EntityId>, kind: EventKind) -> Self {
        Event {
            entity: entity.into(),
            kind,
        }
    }

    pub fn is_destroy(&self) -> bool {
        self.kind == EventKind::EntityDestroyed
    }

    /// The subgraph that raised this event, if any
    pub fn subgraph(&self) -> Option<SubgraphId> {
        match self.entity {
            EntityId::Subgraph(g) => Some(g),
            EntityId::Property(_) => None,
        }
    }

    /// The property that raised this event, if any
    pub fn property(&self) -> Option<PropertyId> {
        match self.entity {
            EntityId::Property(p) => Some(p),
            EntityId::Subgraph(_) => None,
        }
    }
}
