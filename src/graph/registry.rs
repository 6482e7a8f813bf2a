//! Property catalogue
//!
//! Each subgraph owns a name-ordered table of the properties it defined.
//! Name resolution walks from a subgraph towards the root and stops at the
//! first table holding the name, so a local definition shadows inherited
//! ones. There is exactly one [`Property`] per (defining subgraph, name).
//!
//! The registry only keeps data. Events are raised by the
//! [`GraphStore`](super::GraphStore) that drives it.

use super::error::{GraphError, GraphResult};
use super::id::IdAllocator;
use super::property::{PropertyType, PropertyValue};
use super::storage::Column;
use super::types::{EdgeId, ElementKind, NodeId, PropertyId, SubgraphId};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// A named, typed mapping from nodes and edges to values
#[derive(Debug, Clone)]
pub struct Property {
    id: PropertyId,
    name: String,
    owner: SubgraphId,
    nodes: Column,
    edges: Column,
}

impl Property {
    fn new(id: PropertyId, owner: SubgraphId, name: String, ty: PropertyType, chunk_size: usize) -> Self {
        Property {
            id,
            name,
            owner,
            nodes: Column::new(ty, ElementKind::Node, chunk_size),
            edges: Column::new(ty, ElementKind::Edge, chunk_size),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subgraph that defined this property
    pub fn owner(&self) -> SubgraphId {
        self.owner
    }

    pub fn property_type(&self) -> PropertyType {
        self.nodes.property_type()
    }

    pub fn node_value(&self, n: NodeId) -> PropertyValue {
        self.nodes.get(n.as_u32())
    }

    pub fn edge_value(&self, e: EdgeId) -> PropertyValue {
        self.edges.get(e.as_u32())
    }

    pub fn node_default(&self) -> PropertyValue {
        self.nodes.default_value()
    }

    pub fn edge_default(&self) -> PropertyValue {
        self.edges.default_value()
    }

    pub fn has_node_override(&self, n: NodeId) -> bool {
        self.nodes.has_override(n.as_u32())
    }

    pub fn has_edge_override(&self, e: EdgeId) -> bool {
        self.edges.has_override(e.as_u32())
    }

    /// Nodes with a non-default value, ascending
    pub fn node_overrides(&self) -> Vec<(NodeId, PropertyValue)> {
        self.nodes
            .overrides()
            .into_iter()
            .map(|(id, v)| (NodeId(id), v))
            .collect()
    }

    /// Edges with a non-default value, ascending
    pub fn edge_overrides(&self) -> Vec<(EdgeId, PropertyValue)> {
        self.edges
            .overrides()
            .into_iter()
            .map(|(id, v)| (EdgeId(id), v))
            .collect()
    }

    /// The column for one element kind
    pub fn column(&self, kind: ElementKind) -> &Column {
        match kind {
            ElementKind::Node => &self.nodes,
            ElementKind::Edge => &self.edges,
        }
    }

    pub(crate) fn column_mut(&mut self, kind: ElementKind) -> &mut Column {
        match kind {
            ElementKind::Node => &mut self.nodes,
            ElementKind::Edge => &mut self.edges,
        }
    }
}

/// All properties of a store, indexed by id and by (subgraph, name)
#[derive(Debug, Clone)]
pub struct PropertyRegistry {
    ids: IdAllocator,
    properties: Vec<Option<Property>>,
    scopes: FxHashMap<SubgraphId, IndexMap<String, PropertyId>>,
    chunk_size: usize,
}

impl PropertyRegistry {
    pub fn new(chunk_size: usize) -> Self {
        PropertyRegistry {
            ids: IdAllocator::new(),
            properties: Vec::new(),
            scopes: FxHashMap::default(),
            chunk_size,
        }
    }

    /// Define `name` in `owner`. Fails if `owner` already defines it.
    pub fn create(&mut self, owner: SubgraphId, name: &str, ty: PropertyType) -> GraphResult<PropertyId> {
        if self.local(owner, name).is_some() {
            return Err(GraphError::DuplicateProperty {
                subgraph: owner,
                name: name.to_string(),
            });
        }
        let id = PropertyId(self.ids.allocate());
        if id.index() >= self.properties.len() {
            self.properties.resize_with(id.index() + 1, || None);
        }
        self.properties[id.index()] = Some(Property::new(id, owner, name.to_string(), ty, self.chunk_size));
        self.scopes
            .entry(owner)
            .or_default()
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// The property `owner` defines itself under `name`
    pub fn local(&self, owner: SubgraphId, name: &str) -> Option<PropertyId> {
        self.scopes.get(&owner).and_then(|t| t.get(name).copied())
    }

    /// First definition of `name` along `chain` (a subgraph followed by its ancestors)
    pub fn resolve(&self, chain: &[SubgraphId], name: &str) -> Option<PropertyId> {
        chain.iter().find_map(|&g| self.local(g, name))
    }

    /// Drop the local definition of `name` in `owner`
    pub fn remove(&mut self, owner: SubgraphId, name: &str) -> GraphResult<Property> {
        let id = self
            .scopes
            .get_mut(&owner)
            .and_then(|t| t.shift_remove(name))
            .ok_or_else(|| GraphError::UnknownProperty {
                subgraph: owner,
                name: name.to_string(),
            })?;
        self.release(id)
    }

    pub fn rename(&mut self, owner: SubgraphId, from: &str, to: &str) -> GraphResult<PropertyId> {
        let unknown = || GraphError::UnknownProperty {
            subgraph: owner,
            name: from.to_string(),
        };
        let table = self.scopes.get_mut(&owner).ok_or_else(unknown)?;
        if !table.contains_key(from) {
            return Err(unknown());
        }
        if table.contains_key(to) {
            return Err(GraphError::DuplicateProperty {
                subgraph: owner,
                name: to.to_string(),
            });
        }
        let id = table.shift_remove(from).ok_or_else(unknown)?;
        table.insert(to.to_string(), id);
        if let Some(Some(prop)) = self.properties.get_mut(id.index()) {
            prop.name = to.to_string();
        }
        Ok(id)
    }

    /// Remove every property `owner` defines, in definition order
    pub fn drop_scope(&mut self, owner: SubgraphId) -> Vec<Property> {
        let Some(table) = self.scopes.remove(&owner) else {
            return Vec::new();
        };
        table
            .into_values()
            .filter_map(|id| self.release(id).ok())
            .collect()
    }

    pub fn get(&self, id: PropertyId) -> GraphResult<&Property> {
        self.properties
            .get(id.index())
            .and_then(|p| p.as_ref())
            .ok_or(GraphError::PropertyNotFound(id))
    }

    pub fn get_mut(&mut self, id: PropertyId) -> GraphResult<&mut Property> {
        self.properties
            .get_mut(id.index())
            .and_then(|p| p.as_mut())
            .ok_or(GraphError::PropertyNotFound(id))
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.get(id).is_ok()
    }

    /// Local properties of `owner` in definition order
    pub fn local_ids(&self, owner: SubgraphId) -> Vec<PropertyId> {
        self.scopes
            .get(&owner)
            .map(|t| t.values().copied().collect())
            .unwrap_or_default()
    }

    /// Every live property, ascending by id
    pub fn ids(&self) -> Vec<PropertyId> {
        self.ids.ids().map(PropertyId).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn release(&mut self, id: PropertyId) -> GraphResult<Property> {
        let prop = self
            .properties
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::PropertyNotFound(id))?;
        self.ids.free(id.0)?;
        Ok(prop)
    }
}
