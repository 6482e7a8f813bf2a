//! Subgraph views
//!
//! A view never copies adjacency data. It keeps a parent link, its
//! children, and two membership sets naming which nodes and edges of the
//! shared [`AdjacencyStore`](super::AdjacencyStore) it shows. Keeping those
//! sets consistent with the parent (subset relation, edge implies both
//! ends) is the job of the [`GraphStore`](super::GraphStore).

use super::error::{GraphError, GraphResult};
use super::id::IdAllocator;
use super::property::PropertyValue;
use super::storage::IdSet;
use super::types::{EdgeId, NodeId, SubgraphId};
use indexmap::IndexMap;

/// One view in the subgraph tree
#[derive(Debug, Clone)]
pub struct SubgraphView {
    id: SubgraphId,
    name: String,
    parent: Option<SubgraphId>,
    children: Vec<SubgraphId>,
    nodes: IdSet,
    edges: IdSet,
    attributes: IndexMap<String, PropertyValue>,
}

impl SubgraphView {
    fn new(id: SubgraphId, name: String, parent: Option<SubgraphId>, chunk_size: usize) -> Self {
        SubgraphView {
            id,
            name,
            parent,
            children: Vec::new(),
            nodes: IdSet::new(chunk_size),
            edges: IdSet::new(chunk_size),
            attributes: IndexMap::new(),
        }
    }

    pub fn id(&self) -> SubgraphId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SubgraphId> {
        self.parent
    }

    pub fn children(&self) -> &[SubgraphId] {
        &self.children
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.nodes.contains(n.as_u32())
    }

    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.edges.contains(e.as_u32())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(NodeId)
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().map(EdgeId)
    }

    pub fn attribute(&self, name: &str) -> Option<&PropertyValue> {
        self.attributes.get(name)
    }

    /// Attributes in the order they were first set
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropertyValue)> + '_ {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Returns whether the stored value changed
    pub(crate) fn set_attribute(&mut self, name: &str, value: PropertyValue) -> bool {
        match self.attributes.get_mut(name) {
            Some(old) if old.same(&value) => false,
            Some(old) => {
                *old = value;
                true
            }
            None => {
                self.attributes.insert(name.to_string(), value);
                true
            }
        }
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<PropertyValue> {
        self.attributes.shift_remove(name)
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn insert_node(&mut self, n: NodeId) -> bool {
        self.nodes.insert(n.as_u32())
    }

    pub(crate) fn remove_node(&mut self, n: NodeId) -> bool {
        self.nodes.remove(n.as_u32())
    }

    pub(crate) fn insert_edge(&mut self, e: EdgeId) -> bool {
        self.edges.insert(e.as_u32())
    }

    pub(crate) fn remove_edge(&mut self, e: EdgeId) -> bool {
        self.edges.remove(e.as_u32())
    }
}

/// Arena of views forming a tree under the root
#[derive(Debug, Clone)]
pub struct Hierarchy {
    ids: IdAllocator,
    views: Vec<Option<SubgraphView>>,
    chunk_size: usize,
}

impl Hierarchy {
    pub fn new(chunk_size: usize) -> Self {
        let mut ids = IdAllocator::new();
        let root = SubgraphId(ids.allocate());
        Hierarchy {
            ids,
            views: vec![Some(SubgraphView::new(root, "root".to_string(), None, chunk_size))],
            chunk_size,
        }
    }

    pub fn contains(&self, id: SubgraphId) -> bool {
        matches!(self.views.get(id.index()), Some(Some(_)))
    }

    pub fn view(&self, id: SubgraphId) -> GraphResult<&SubgraphView> {
        self.views
            .get(id.index())
            .and_then(|v| v.as_ref())
            .ok_or(GraphError::SubgraphNotFound(id))
    }

    pub fn view_mut(&mut self, id: SubgraphId) -> GraphResult<&mut SubgraphView> {
        self.views
            .get_mut(id.index())
            .and_then(|v| v.as_mut())
            .ok_or(GraphError::SubgraphNotFound(id))
    }

    pub fn root(&self) -> &SubgraphView {
        match self.views.first() {
            Some(Some(root)) => root,
            _ => unreachable!("the root view is never removed"),
        }
    }

    pub(crate) fn root_mut(&mut self) -> &mut SubgraphView {
        match self.views.first_mut() {
            Some(Some(root)) => root,
            _ => unreachable!("the root view is never removed"),
        }
    }

    /// Add an empty child of `parent`
    pub fn create(&mut self, parent: SubgraphId, name: &str) -> GraphResult<SubgraphId> {
        self.view(parent)?;
        let id = SubgraphId(self.ids.allocate());
        if id.index() >= self.views.len() {
            self.views.resize_with(id.index() + 1, || None);
        }
        self.views[id.index()] = Some(SubgraphView::new(id, name.to_string(), Some(parent), self.chunk_size));
        self.view_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Take a leaf view out of the tree
    pub(crate) fn detach(&mut self, id: SubgraphId) -> GraphResult<SubgraphView> {
        if id.is_root() {
            return Err(GraphError::invalid("the root graph cannot be removed"));
        }
        let view = self.view(id)?;
        if !view.children.is_empty() {
            return Err(GraphError::invalid(format!("{} still has children", id)));
        }
        let parent = view.parent;
        let view = self.views[id.index()]
            .take()
            .ok_or(GraphError::SubgraphNotFound(id))?;
        if let Some(parent) = parent {
            self.view_mut(parent)?.children.retain(|&c| c != id);
        }
        self.ids.free(id.0)?;
        Ok(view)
    }

    /// `id` followed by its ancestors up to the root
    pub fn ancestors(&self, id: SubgraphId) -> GraphResult<Vec<SubgraphId>> {
        let mut chain = vec![id];
        let mut cursor = self.view(id)?.parent;
        while let Some(g) = cursor {
            chain.push(g);
            cursor = self.view(g)?.parent;
        }
        Ok(chain)
    }

    /// Whether `a` lies strictly below `b`
    pub fn is_descendant_of(&self, a: SubgraphId, b: SubgraphId) -> bool {
        let mut cursor = self.view(a).ok().and_then(|v| v.parent);
        while let Some(g) = cursor {
            if g == b {
                return true;
            }
            cursor = self.view(g).ok().and_then(|v| v.parent);
        }
        false
    }

    /// Number of edges from the root down to `id`
    pub fn depth(&self, id: SubgraphId) -> GraphResult<usize> {
        Ok(self.ancestors(id)?.len() - 1)
    }

    /// `id` and everything below it, parents before children
    pub fn pre_order(&self, id: SubgraphId) -> GraphResult<Vec<SubgraphId>> {
        self.view(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(g) = stack.pop() {
            out.push(g);
            if let Ok(view) = self.view(g) {
                stack.extend(view.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// `id` and everything below it, children before parents
    pub fn post_order(&self, id: SubgraphId) -> GraphResult<Vec<SubgraphId>> {
        self.view(id)?;
        let mut out = Vec::new();
        self.collect_post_order(id, &mut out);
        Ok(out)
    }

    /// First view named `name` in pre-order from the root
    pub fn by_name(&self, name: &str) -> Option<SubgraphId> {
        self.pre_order(SubgraphId::ROOT)
            .ok()?
            .into_iter()
            .find(|&g| self.view(g).map(|v| v.name == name).unwrap_or(false))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn collect_post_order(&self, id: SubgraphId, out: &mut Vec<SubgraphId>) {
        if let Ok(view) = self.view(id) {
            for &child in &view.children {
                self.collect_post_order(child, out);
            }
            out.push(id);
        }
    }
}
