//! Property value types for graph nodes and edges
//!
//! The set of value types is closed. A property is registered with one
//! [`PropertyType`] and every value written to it must be the matching
//! [`PropertyValue`] variant.

use super::storage::SlotValue;
use super::types::{EdgeId, ElementKind, SubgraphId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value type a property is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Boolean,
    Integer,
    Float,
    String,
    Coord,
    Size,
    Color,
    /// Nodes hold an optional subgraph reference, edges hold a set of edges
    Graph,
}

impl PropertyType {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "Boolean",
            PropertyType::Integer => "Integer",
            PropertyType::Float => "Float",
            PropertyType::String => "String",
            PropertyType::Coord => "Coord",
            PropertyType::Size => "Size",
            PropertyType::Color => "Color",
            PropertyType::Graph => "Graph",
        }
    }

    /// Default value used for a freshly created property
    pub fn default_value(&self, kind: ElementKind) -> PropertyValue {
        match self {
            PropertyType::Boolean => PropertyValue::Boolean(false),
            PropertyType::Integer => PropertyValue::Integer(0),
            PropertyType::Float => PropertyValue::Float(0.0),
            PropertyType::String => PropertyValue::String(String::new()),
            PropertyType::Coord => PropertyValue::Coord(Vec3::ZERO),
            PropertyType::Size => PropertyValue::Size(Vec3::new(1.0, 1.0, 0.0)),
            PropertyType::Color => PropertyValue::Color(Color::BLACK),
            PropertyType::Graph => match kind {
                ElementKind::Node => PropertyValue::Graph(None),
                ElementKind::Edge => PropertyValue::EdgeSet(Vec::new()),
            },
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-component vector used by coordinate and size values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Coord(Vec3),
    Size(Vec3),
    Color(Color),
    /// Node value of a `Graph` property
    Graph(Option<SubgraphId>),
    /// Edge value of a `Graph` property
    EdgeSet(Vec<EdgeId>),
}

impl PropertyValue {
    /// Equality as the storage layer sees it: floats compare bitwise
    pub fn same(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.same(b),
            (PropertyValue::Coord(a), PropertyValue::Coord(b))
            | (PropertyValue::Size(a), PropertyValue::Size(b)) => a.same(b),
            _ => self == other,
        }
    }

    /// The property type this value can be stored in
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Coord(_) => PropertyType::Coord,
            PropertyValue::Size(_) => PropertyType::Size,
            PropertyValue::Color(_) => PropertyType::Color,
            PropertyValue::Graph(_) | PropertyValue::EdgeSet(_) => PropertyType::Graph,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::EdgeSet(_) => "EdgeSet",
            other => other.property_type().name(),
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coordinate or size payload
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            PropertyValue::Coord(v) | PropertyValue::Size(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<SubgraphId> {
        match self {
            PropertyValue::Graph(g) => *g,
            _ => None,
        }
    }

    pub fn as_edge_set(&self) -> Option<&[EdgeId]> {
        match self {
            PropertyValue::EdgeSet(edges) => Some(edges),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Coord(v) | PropertyValue::Size(v) => write!(f, "{}", v),
            PropertyValue::Color(c) => write!(f, "{}", c),
            PropertyValue::Graph(Some(g)) => write!(f, "{}", g),
            PropertyValue::Graph(None) => write!(f, "none"),
            PropertyValue::EdgeSet(edges) => {
                write!(f, "{{")?;
                for (i, e) in edges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e.as_u32())?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenience conversions
impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<Color> for PropertyValue {
    fn from(c: Color) -> Self {
        PropertyValue::Color(c)
    }
}

impl From<SubgraphId> for PropertyValue {
    fn from(g: SubgraphId) -> Self {
        PropertyValue::Graph(Some(g))
    }
}

impl From<Vec<EdgeId>> for PropertyValue {
    fn from(edges: Vec<EdgeId>) -> Self {
        PropertyValue::EdgeSet(edges)
    }
}
