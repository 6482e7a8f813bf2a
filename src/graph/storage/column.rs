//! Typed property columns
//!
//! A column is one [`SparseStore`] instantiated for the value type a
//! property was registered with. The closed set of variants is dispatched
//! through a single `get`/`set`/`default` interface working on
//! [`PropertyValue`].

use super::sparse::{Scope, SparseStore};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::property::{Color, PropertyType, PropertyValue, Vec3};
use crate::graph::types::{EdgeId, ElementKind, SubgraphId};

/// A single property column.
#[derive(Debug, Clone)]
pub enum Column {
    Boolean(SparseStore<bool>),
    Integer(SparseStore<i64>),
    Float(SparseStore<f64>),
    String(SparseStore<String>),
    Coord(SparseStore<Vec3>),
    Size(SparseStore<Vec3>),
    Color(SparseStore<Color>),
    GraphRef(SparseStore<Option<SubgraphId>>),
    EdgeSet(SparseStore<Vec<EdgeId>>),
}

macro_rules! each_column {
    ($col:expr, $store:ident => $body:expr) => {
        match $col {
            Column::Boolean($store) => $body,
            Column::Integer($store) => $body,
            Column::Float($store) => $body,
            Column::String($store) => $body,
            Column::Coord($store) => $body,
            Column::Size($store) => $body,
            Column::Color($store) => $body,
            Column::GraphRef($store) => $body,
            Column::EdgeSet($store) => $body,
        }
    };
}

impl Column {
    /// Column for `ty` holding the type's default value
    pub fn new(ty: PropertyType, kind: ElementKind, chunk_size: usize) -> Self {
        match (ty, kind) {
            (PropertyType::Boolean, _) => Column::Boolean(SparseStore::with_chunk_size(false, chunk_size)),
            (PropertyType::Integer, _) => Column::Integer(SparseStore::with_chunk_size(0, chunk_size)),
            (PropertyType::Float, _) => Column::Float(SparseStore::with_chunk_size(0.0, chunk_size)),
            (PropertyType::String, _) => {
                Column::String(SparseStore::with_chunk_size(String::new(), chunk_size))
            }
            (PropertyType::Coord, _) => Column::Coord(SparseStore::with_chunk_size(Vec3::ZERO, chunk_size)),
            (PropertyType::Size, _) => {
                Column::Size(SparseStore::with_chunk_size(Vec3::new(1.0, 1.0, 0.0), chunk_size))
            }
            (PropertyType::Color, _) => Column::Color(SparseStore::with_chunk_size(Color::BLACK, chunk_size)),
            (PropertyType::Graph, ElementKind::Node) => {
                Column::GraphRef(SparseStore::with_chunk_size(None, chunk_size))
            }
            (PropertyType::Graph, ElementKind::Edge) => {
                Column::EdgeSet(SparseStore::with_chunk_size(Vec::new(), chunk_size))
            }
        }
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            Column::Boolean(_) => PropertyType::Boolean,
            Column::Integer(_) => PropertyType::Integer,
            Column::Float(_) => PropertyType::Float,
            Column::String(_) => PropertyType::String,
            Column::Coord(_) => PropertyType::Coord,
            Column::Size(_) => PropertyType::Size,
            Column::Color(_) => PropertyType::Color,
            Column::GraphRef(_) | Column::EdgeSet(_) => PropertyType::Graph,
        }
    }

    pub fn get(&self, id: u32) -> PropertyValue {
        self.wrap(id, false)
    }

    pub fn default_value(&self) -> PropertyValue {
        self.wrap(0, true)
    }

    pub fn has_override(&self, id: u32) -> bool {
        each_column!(self, s => s.has_override(id))
    }

    pub fn override_count(&self) -> usize {
        each_column!(self, s => s.override_count())
    }

    pub fn touched_chunks(&self) -> usize {
        each_column!(self, s => s.touched_chunks())
    }

    /// Ids holding a non-default value, ascending
    pub fn override_ids(&self) -> Vec<u32> {
        each_column!(self, s => s.overrides().map(|(id, _)| id).collect())
    }

    /// Non-default `(id, value)` pairs, ascending by id
    pub fn overrides(&self) -> Vec<(u32, PropertyValue)> {
        self.override_ids()
            .into_iter()
            .map(|id| (id, self.get(id)))
            .collect()
    }

    pub fn clear_override(&mut self, id: u32) -> bool {
        each_column!(self, s => s.clear_override(id))
    }

    /// Type-checked write. Returns whether the stored value changed.
    pub fn set(&mut self, id: u32, value: PropertyValue) -> GraphResult<bool> {
        let expected = self.property_type();
        match (self, value) {
            (Column::Boolean(s), PropertyValue::Boolean(v)) => Ok(s.set(id, v)),
            (Column::Integer(s), PropertyValue::Integer(v)) => Ok(s.set(id, v)),
            (Column::Float(s), PropertyValue::Float(v)) => Ok(s.set(id, v)),
            (Column::String(s), PropertyValue::String(v)) => Ok(s.set(id, v)),
            (Column::Coord(s), PropertyValue::Coord(v)) => Ok(s.set(id, v)),
            (Column::Size(s), PropertyValue::Size(v)) => Ok(s.set(id, v)),
            (Column::Color(s), PropertyValue::Color(v)) => Ok(s.set(id, v)),
            (Column::GraphRef(s), PropertyValue::Graph(v)) => Ok(s.set(id, v)),
            (Column::EdgeSet(s), PropertyValue::EdgeSet(v)) => Ok(s.set(id, normalize(v))),
            (_, value) => Err(mismatch(expected, &value)),
        }
    }

    /// Type-checked default replacement, see [`SparseStore::set_default`]
    pub fn set_default(&mut self, value: PropertyValue) -> GraphResult<bool> {
        let expected = self.property_type();
        match (self, value) {
            (Column::Boolean(s), PropertyValue::Boolean(v)) => Ok(s.set_default(v)),
            (Column::Integer(s), PropertyValue::Integer(v)) => Ok(s.set_default(v)),
            (Column::Float(s), PropertyValue::Float(v)) => Ok(s.set_default(v)),
            (Column::String(s), PropertyValue::String(v)) => Ok(s.set_default(v)),
            (Column::Coord(s), PropertyValue::Coord(v)) => Ok(s.set_default(v)),
            (Column::Size(s), PropertyValue::Size(v)) => Ok(s.set_default(v)),
            (Column::Color(s), PropertyValue::Color(v)) => Ok(s.set_default(v)),
            (Column::GraphRef(s), PropertyValue::Graph(v)) => Ok(s.set_default(v)),
            (Column::EdgeSet(s), PropertyValue::EdgeSet(v)) => Ok(s.set_default(normalize(v))),
            (_, value) => Err(mismatch(expected, &value)),
        }
    }

    /// Type-checked bulk assignment, see [`SparseStore::set_all`]
    pub fn set_all(&mut self, value: PropertyValue, scope: Scope<'_>) -> GraphResult<()> {
        let expected = self.property_type();
        match (self, value) {
            (Column::Boolean(s), PropertyValue::Boolean(v)) => s.set_all(v, scope),
            (Column::Integer(s), PropertyValue::Integer(v)) => s.set_all(v, scope),
            (Column::Float(s), PropertyValue::Float(v)) => s.set_all(v, scope),
            (Column::String(s), PropertyValue::String(v)) => s.set_all(v, scope),
            (Column::Coord(s), PropertyValue::Coord(v)) => s.set_all(v, scope),
            (Column::Size(s), PropertyValue::Size(v)) => s.set_all(v, scope),
            (Column::Color(s), PropertyValue::Color(v)) => s.set_all(v, scope),
            (Column::GraphRef(s), PropertyValue::Graph(v)) => s.set_all(v, scope),
            (Column::EdgeSet(s), PropertyValue::EdgeSet(v)) => s.set_all(normalize(v), scope),
            (_, value) => return Err(mismatch(expected, &value)),
        }
        Ok(())
    }

    /// Check a value without writing it
    pub fn accepts(&self, value: &PropertyValue) -> GraphResult<()> {
        let ok = matches!(
            (self, value),
            (Column::Boolean(_), PropertyValue::Boolean(_))
                | (Column::Integer(_), PropertyValue::Integer(_))
                | (Column::Float(_), PropertyValue::Float(_))
                | (Column::String(_), PropertyValue::String(_))
                | (Column::Coord(_), PropertyValue::Coord(_))
                | (Column::Size(_), PropertyValue::Size(_))
                | (Column::Color(_), PropertyValue::Color(_))
                | (Column::GraphRef(_), PropertyValue::Graph(_))
                | (Column::EdgeSet(_), PropertyValue::EdgeSet(_))
        );
        if ok {
            Ok(())
        } else {
            Err(mismatch(self.property_type(), value))
        }
    }

    /// Take `edge` out of every edge-set value, the default included.
    ///
    /// Returns the ids whose stored value changed and whether the default
    /// changed. Columns of any other kind are left alone.
    pub fn remove_edge_references(&mut self, edge: EdgeId) -> (Vec<u32>, bool) {
        let Column::EdgeSet(s) = self else {
            return (Vec::new(), false);
        };
        let without = |edges: &[EdgeId]| -> Vec<EdgeId> {
            edges.iter().copied().filter(|&e| e != edge).collect()
        };
        let hits: Vec<(u32, Vec<EdgeId>)> = s
            .overrides()
            .filter(|(_, edges)| edges.contains(&edge))
            .map(|(id, edges)| (id, without(edges)))
            .collect();
        let mut changed = Vec::with_capacity(hits.len());
        for (id, edges) in hits {
            if s.set(id, edges) {
                changed.push(id);
            }
        }
        let default_hit = s.default_value().contains(&edge);
        if default_hit {
            let stripped = without(s.default_value());
            s.set_default(stripped);
        }
        (changed, default_hit)
    }

    /// Drop every override, keeping the default
    pub fn clear(&mut self) {
        each_column!(self, s => s.clear())
    }

    fn wrap(&self, id: u32, default: bool) -> PropertyValue {
        macro_rules! pick {
            ($s:expr) => {
                if default {
                    $s.default_value()
                } else {
                    $s.get(id)
                }
            };
        }
        match self {
            Column::Boolean(s) => PropertyValue::Boolean(*pick!(s)),
            Column::Integer(s) => PropertyValue::Integer(*pick!(s)),
            Column::Float(s) => PropertyValue::Float(*pick!(s)),
            Column::String(s) => PropertyValue::String(pick!(s).clone()),
            Column::Coord(s) => PropertyValue::Coord(*pick!(s)),
            Column::Size(s) => PropertyValue::Size(*pick!(s)),
            Column::Color(s) => PropertyValue::Color(*pick!(s)),
            Column::GraphRef(s) => PropertyValue::Graph(*pick!(s)),
            Column::EdgeSet(s) => PropertyValue::EdgeSet(pick!(s).clone()),
        }
    }
}

/// Edge sets compare as sets
fn normalize(mut edges: Vec<EdgeId>) -> Vec<EdgeId> {
    edges.sort_unstable();
    edges.dedup();
    edges
}

fn mismatch(expected: PropertyType, value: &PropertyValue) -> GraphError {
    let found = value.property_type();
    if found == expected {
        // Graph columns: node reference written to an edge or the reverse
        GraphError::invalid(format!(
            "{} value does not fit this element kind",
            value.type_name()
        ))
    } else {
        GraphError::TypeMismatch { expected, found }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get_set() {
        let mut col = Column::new(PropertyType::Float, ElementKind::Edge, 64);
        assert_eq!(col.default_value(), PropertyValue::Float(0.0));
        assert!(col.set(4, PropertyValue::Float(2.5)).unwrap());
        assert_eq!(col.get(4), PropertyValue::Float(2.5));
        assert_eq!(col.overrides(), vec![(4, PropertyValue::Float(2.5))]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut col = Column::new(PropertyType::Float, ElementKind::Node, 64);
        let err = col.set(0, PropertyValue::from("heavy")).unwrap_err();
        assert_eq!(
            err,
            GraphError::TypeMismatch {
                expected: PropertyType::Float,
                found: PropertyType::String
            }
        );
        assert_eq!(col.override_count(), 0);
    }

    #[test]
    fn test_graph_column_kinds() {
        let mut nodes = Column::new(PropertyType::Graph, ElementKind::Node, 64);
        let mut edges = Column::new(PropertyType::Graph, ElementKind::Edge, 64);
        assert!(nodes.set(1, PropertyValue::Graph(Some(SubgraphId(2)))).unwrap());
        assert!(matches!(
            nodes.set(1, PropertyValue::EdgeSet(vec![])),
            Err(GraphError::InvalidOperation(_))
        ));
        edges
            .set(0, PropertyValue::EdgeSet(vec![EdgeId(5), EdgeId(1), EdgeId(5)]))
            .unwrap();
        assert_eq!(edges.get(0), PropertyValue::EdgeSet(vec![EdgeId(1), EdgeId(5)]));
    }

    #[test]
    fn test_remove_edge_references() {
        let mut col = Column::new(PropertyType::Graph, ElementKind::Edge, 64);
        col.set(0, PropertyValue::EdgeSet(vec![EdgeId(3), EdgeId(7)])).unwrap();
        col.set(1, PropertyValue::EdgeSet(vec![EdgeId(3)])).unwrap();
        col.set(2, PropertyValue::EdgeSet(vec![EdgeId(9)])).unwrap();

        let (changed, default_hit) = col.remove_edge_references(EdgeId(3));
        assert_eq!(changed, vec![0, 1]);
        assert!(!default_hit);
        assert_eq!(col.get(0), PropertyValue::EdgeSet(vec![EdgeId(7)]));
        // an emptied set is the default again
        assert!(!col.has_override(1));
        assert_eq!(col.get(2), PropertyValue::EdgeSet(vec![EdgeId(9)]));

        col.set_default(PropertyValue::EdgeSet(vec![EdgeId(9)])).unwrap();
        let (changed, default_hit) = col.remove_edge_references(EdgeId(9));
        assert!(changed.is_empty());
        assert!(default_hit);
        assert_eq!(col.default_value(), PropertyValue::EdgeSet(vec![]));

        let mut floats = Column::new(PropertyType::Float, ElementKind::Edge, 64);
        assert_eq!(floats.remove_edge_references(EdgeId(0)), (vec![], false));
    }

    #[test]
    fn test_nan_writes_are_idempotent() {
        let mut col = Column::new(PropertyType::Float, ElementKind::Node, 64);
        assert!(col.set(0, PropertyValue::Float(f64::NAN)).unwrap());
        assert!(!col.set(0, PropertyValue::Float(f64::NAN)).unwrap());
        assert!(col.set_default(PropertyValue::Float(f64::NAN)).unwrap());
        assert_eq!(col.override_count(), 0);
    }

    #[test]
    fn test_set_default_through_column() {
        let mut col = Column::new(PropertyType::Integer, ElementKind::Node, 64);
        col.set(1, PropertyValue::Integer(7)).unwrap();
        assert!(col.set_default(PropertyValue::Integer(7)).unwrap());
        assert!(!col.has_override(1));
        assert_eq!(col.get(99), PropertyValue::Integer(7));
    }
}
