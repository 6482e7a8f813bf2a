//! Snapshot capture and restore
//!
//! Nodes and edges are renumbered densely in root order, subgraphs by
//! pre-order position (the root is index 0). Ids inside property values
//! are rewritten the same way. Only non-default values are kept.
//!
//! Restoring goes through the public subgraph API, so the rebuilt store
//! satisfies every visibility rule by construction. Numeric ids of the
//! rebuilt store are not those of the captured one.

use super::{PersistenceError, PersistenceResult};
use crate::config::StoreConfig;
use crate::graph::{
    EdgeId, GraphStore, NodeId, PropertyType, PropertyValue, SubgraphId, META_GRAPH_PROPERTY,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Bumped whenever the image layout changes
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

/// Serializable image of a whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub node_count: u32,
    /// Source and target node index of every edge
    pub edges: Vec<(u32, u32)>,
    /// Rotation order of every node, as edge indices
    pub incidence: Vec<Vec<u32>>,
    /// The subgraph tree in pre-order
    pub subgraphs: Vec<SubgraphImage>,
    pub properties: Vec<PropertyImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphImage {
    pub name: String,
    /// Pre-order index of the parent, `None` for the root
    pub parent: Option<u32>,
    /// Member node indices; empty for the root, which holds everything
    pub nodes: Vec<u32>,
    pub edges: Vec<u32>,
    /// Attributes of the subgraph itself, in the order they were set
    #[serde(default)]
    pub attributes: Vec<(String, PropertyValue)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub name: String,
    /// Pre-order index of the defining subgraph
    pub owner: u32,
    pub property_type: PropertyType,
    pub node_default: PropertyValue,
    pub edge_default: PropertyValue,
    pub node_values: Vec<(u32, PropertyValue)>,
    pub edge_values: Vec<(u32, PropertyValue)>,
}

/// Dense numbering of a live store
struct Numbering {
    nodes: FxHashMap<NodeId, u32>,
    edges: FxHashMap<EdgeId, u32>,
    subgraphs: FxHashMap<SubgraphId, u32>,
}

impl Numbering {
    fn node(&self, n: NodeId) -> PersistenceResult<u32> {
        self.nodes
            .get(&n)
            .copied()
            .ok_or_else(|| PersistenceError::Format(format!("{} is not in the root graph", n)))
    }

    fn edge(&self, e: EdgeId) -> PersistenceResult<u32> {
        self.edges
            .get(&e)
            .copied()
            .ok_or_else(|| PersistenceError::Format(format!("{} is not in the root graph", e)))
    }

    fn value(&self, value: PropertyValue) -> PersistenceResult<PropertyValue> {
        Ok(match value {
            PropertyValue::Graph(Some(g)) => {
                let idx = self
                    .subgraphs
                    .get(&g)
                    .copied()
                    .ok_or_else(|| PersistenceError::Format(format!("dangling reference to {}", g)))?;
                PropertyValue::Graph(Some(SubgraphId(idx)))
            }
            // Underlying edges that have since been deleted are dropped
            PropertyValue::EdgeSet(edges) => PropertyValue::EdgeSet(
                edges
                    .into_iter()
                    .filter_map(|e| self.edges.get(&e).map(|&i| EdgeId(i)))
                    .collect(),
            ),
            other => other,
        })
    }
}

/// Ids of a store being rebuilt, indexed by snapshot position
struct Rebuilt {
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    subgraphs: Vec<SubgraphId>,
}

impl Rebuilt {
    fn node(&self, idx: u32) -> PersistenceResult<NodeId> {
        self.nodes
            .get(idx as usize)
            .copied()
            .ok_or_else(|| PersistenceError::Format(format!("node index {} out of range", idx)))
    }

    fn edge(&self, idx: u32) -> PersistenceResult<EdgeId> {
        self.edges
            .get(idx as usize)
            .copied()
            .ok_or_else(|| PersistenceError::Format(format!("edge index {} out of range", idx)))
    }

    fn subgraph(&self, idx: u32) -> PersistenceResult<SubgraphId> {
        self.subgraphs
            .get(idx as usize)
            .copied()
            .ok_or_else(|| PersistenceError::Format(format!("subgraph index {} out of range", idx)))
    }

    fn value(&self, value: PropertyValue) -> PersistenceResult<PropertyValue> {
        Ok(match value {
            PropertyValue::Graph(Some(g)) => PropertyValue::Graph(Some(self.subgraph(g.0)?)),
            PropertyValue::EdgeSet(edges) => PropertyValue::EdgeSet(
                edges
                    .into_iter()
                    .map(|e| self.edge(e.0))
                    .collect::<PersistenceResult<_>>()?,
            ),
            other => other,
        })
    }
}

impl Snapshot {
    /// Build an image of `store`
    pub fn capture(store: &GraphStore) -> PersistenceResult<Self> {
        let root = store.root();
        let nodes: Vec<NodeId> = root.nodes().collect();
        let edges: Vec<EdgeId> = root.edges().collect();
        let order = store.subgraphs();

        let numbering = Numbering {
            nodes: nodes.iter().enumerate().map(|(i, &n)| (n, i as u32)).collect(),
            edges: edges.iter().enumerate().map(|(i, &e)| (e, i as u32)).collect(),
            subgraphs: order.iter().enumerate().map(|(i, &g)| (g, i as u32)).collect(),
        };

        let edge_image = edges
            .iter()
            .map(|&e| {
                let (src, dst) = store.endpoints(e)?;
                Ok((numbering.node(src)?, numbering.node(dst)?))
            })
            .collect::<PersistenceResult<Vec<_>>>()?;

        let incidence = nodes
            .iter()
            .map(|&n| {
                store
                    .incidence(n)?
                    .iter()
                    .map(|&e| numbering.edge(e))
                    .collect::<PersistenceResult<Vec<_>>>()
            })
            .collect::<PersistenceResult<Vec<_>>>()?;

        let mut subgraphs = Vec::with_capacity(order.len());
        for &g in &order {
            let view = store.subgraph(g)?;
            let parent = view.parent().map(|p| numbering.subgraphs[&p]);
            let (nodes, edges) = if g.is_root() {
                (Vec::new(), Vec::new())
            } else {
                (
                    view.nodes().map(|n| numbering.node(n)).collect::<PersistenceResult<_>>()?,
                    view.edges().map(|e| numbering.edge(e)).collect::<PersistenceResult<_>>()?,
                )
            };
            subgraphs.push(SubgraphImage {
                name: view.name().to_string(),
                parent,
                nodes,
                edges,
                attributes: view
                    .attributes()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            });
        }

        let mut properties = Vec::new();
        for id in store.properties() {
            let prop = store.get_property(id)?;
            let owner = numbering.subgraphs.get(&prop.owner()).copied().ok_or_else(|| {
                PersistenceError::Format(format!("{} is owned by a missing subgraph", id))
            })?;
            let node_values = prop
                .node_overrides()
                .into_iter()
                .map(|(n, v)| Ok((numbering.node(n)?, numbering.value(v)?)))
                .collect::<PersistenceResult<Vec<_>>>()?;
            let edge_values = prop
                .edge_overrides()
                .into_iter()
                .map(|(e, v)| Ok((numbering.edge(e)?, numbering.value(v)?)))
                .collect::<PersistenceResult<Vec<_>>>()?;
            properties.push(PropertyImage {
                name: prop.name().to_string(),
                owner,
                property_type: prop.property_type(),
                node_default: numbering.value(prop.node_default())?,
                edge_default: numbering.value(prop.edge_default())?,
                node_values,
                edge_values,
            });
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            subgraphs = subgraphs.len(),
            properties = properties.len(),
            "captured snapshot"
        );
        Ok(Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            node_count: nodes.len() as u32,
            edges: edge_image,
            incidence,
            subgraphs,
            properties,
        })
    }

    /// Rebuild a store from this image
    pub fn restore(&self, config: StoreConfig) -> PersistenceResult<GraphStore> {
        self.validate()?;
        let mut store = GraphStore::with_config(config);
        let root = SubgraphId::ROOT;

        let nodes = store.add_nodes(root, self.node_count)?;
        let mut rebuilt = Rebuilt {
            nodes,
            edges: Vec::new(),
            subgraphs: vec![root],
        };
        let pairs = self
            .edges
            .iter()
            .map(|&(s, d)| Ok((rebuilt.node(s)?, rebuilt.node(d)?)))
            .collect::<PersistenceResult<Vec<_>>>()?;
        rebuilt.edges = store.add_edges(root, &pairs)?;

        for (idx, order) in self.incidence.iter().enumerate() {
            if order.len() < 2 {
                continue;
            }
            let order = order
                .iter()
                .map(|&e| rebuilt.edge(e))
                .collect::<PersistenceResult<Vec<_>>>()?;
            store.set_incidence_order(rebuilt.node(idx as u32)?, &order)?;
        }

        store.rename_subgraph(root, &self.subgraphs[0].name)?;
        for (name, value) in &self.subgraphs[0].attributes {
            store.set_attribute(root, name, value.clone())?;
        }
        for image in &self.subgraphs[1..] {
            let parent = image
                .parent
                .ok_or_else(|| PersistenceError::Format(format!("subgraph '{}' has no parent", image.name)))?;
            let sg = store.create_subgraph(rebuilt.subgraph(parent)?, &image.name)?;
            for &n in &image.nodes {
                store.add_existing_node(sg, rebuilt.node(n)?)?;
            }
            for &e in &image.edges {
                store.add_existing_edge(sg, rebuilt.edge(e)?)?;
            }
            for (name, value) in &image.attributes {
                store.set_attribute(sg, name, value.clone())?;
            }
            rebuilt.subgraphs.push(sg);
        }

        for image in &self.properties {
            let owner = rebuilt.subgraph(image.owner)?;
            if owner.is_root() && image.name == META_GRAPH_PROPERTY {
                restore_meta(&mut store, &rebuilt, image)?;
                continue;
            }
            let prop = store.create_property(owner, &image.name, image.property_type)?;
            store.set_node_default(prop, rebuilt.value(image.node_default.clone())?)?;
            store.set_edge_default(prop, rebuilt.value(image.edge_default.clone())?)?;
            for (n, value) in &image.node_values {
                store.set_node_value(prop, rebuilt.node(*n)?, rebuilt.value(value.clone())?)?;
            }
            for (e, value) in &image.edge_values {
                store.set_edge_value(prop, rebuilt.edge(*e)?, rebuilt.value(value.clone())?)?;
            }
        }

        info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            subgraphs = store.subgraph_count(),
            "restored snapshot"
        );
        Ok(store)
    }

    fn validate(&self) -> PersistenceResult<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistenceError::Format(format!(
                "unsupported format version {}, expected {}",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        if self.incidence.len() != self.node_count as usize {
            return Err(PersistenceError::Format(format!(
                "{} incidence lists for {} nodes",
                self.incidence.len(),
                self.node_count
            )));
        }
        match self.subgraphs.first() {
            Some(root) if root.parent.is_none() => {}
            _ => return Err(PersistenceError::Format("missing root subgraph".to_string())),
        }
        for (idx, image) in self.subgraphs.iter().enumerate().skip(1) {
            match image.parent {
                Some(p) if (p as usize) < idx => {}
                _ => {
                    return Err(PersistenceError::Format(format!(
                        "subgraph '{}' does not follow its parent",
                        image.name
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> PersistenceResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_bytes(&self) -> PersistenceResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> PersistenceResult<Self> {
        let snapshot: Snapshot = bincode::deserialize(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> PersistenceResult<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        debug!(path = %path.as_ref().display(), "wrote snapshot");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Re-establish meta node ownership; the generic setters refuse this property
fn restore_meta(store: &mut GraphStore, rebuilt: &Rebuilt, image: &PropertyImage) -> PersistenceResult<()> {
    if image.property_type != PropertyType::Graph {
        return Err(PersistenceError::Format(format!(
            "{} must be a Graph property",
            META_GRAPH_PROPERTY
        )));
    }
    if !store.local_property_exists(SubgraphId::ROOT, META_GRAPH_PROPERTY) {
        store.create_property(SubgraphId::ROOT, META_GRAPH_PROPERTY, PropertyType::Graph)?;
    }
    for (n, value) in &image.node_values {
        if let PropertyValue::Graph(Some(group)) = rebuilt.value(value.clone())? {
            store.set_meta_graph(rebuilt.node(*n)?, group)?;
        }
    }
    for (e, value) in &image.edge_values {
        if let PropertyValue::EdgeSet(edges) = rebuilt.value(value.clone())? {
            store.set_meta_edge(rebuilt.edge(*e)?, edges)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::is_connected;

    fn sample() -> GraphStore {
        let mut store = GraphStore::new();
        let root = SubgraphId::ROOT;
        let n = store.add_nodes(root, 4).unwrap();
        let e01 = store.add_edge(root, n[0], n[1]).unwrap();
        store.add_edge(root, n[1], n[2]).unwrap();
        store.add_edge(root, n[2], n[0]).unwrap();
        store.add_edge(root, n[3], n[3]).unwrap();

        let weight = store.create_property(root, "weight", PropertyType::Float).unwrap();
        store.set_edge_default(weight, PropertyValue::Float(1.0)).unwrap();
        store.set_edge_value(weight, e01, PropertyValue::Float(2.5)).unwrap();

        let tri = store.create_induced_subgraph(root, &n[..3], "triangle").unwrap();
        let label = store.create_property(tri, "label", PropertyType::String).unwrap();
        store.set_node_value(label, n[1], "b".into()).unwrap();
        store.set_attribute(root, "title", "sample".into()).unwrap();
        store.set_attribute(tri, "closed", true.into()).unwrap();
        store
    }

    #[test]
    fn test_capture_is_dense() {
        let snapshot = Snapshot::capture(&sample()).unwrap();
        assert_eq!(snapshot.node_count, 4);
        assert_eq!(snapshot.edges.len(), 4);
        assert_eq!(snapshot.subgraphs.len(), 2);
        assert_eq!(snapshot.subgraphs[1].parent, Some(0));
        assert!(snapshot.subgraphs[0].nodes.is_empty());
        let weight = snapshot.properties.iter().find(|p| p.name == "weight").unwrap();
        assert_eq!(weight.edge_values.len(), 1);
        // self-loop occupies two incidence slots
        assert_eq!(snapshot.incidence[3].len(), 2);
    }

    #[test]
    fn test_restore_round_trip() {
        let store = sample();
        let snapshot = Snapshot::capture(&store).unwrap();
        let restored = snapshot.restore(StoreConfig::default()).unwrap();

        assert_eq!(restored.stats(), store.stats());
        let tri = restored.subgraph_by_name("triangle").unwrap();
        assert_eq!(restored.node_count_in(tri).unwrap(), 3);
        assert_eq!(restored.edge_count_in(tri).unwrap(), 3);
        assert!(is_connected(&restored, tri).unwrap());

        let weight = restored.property(SubgraphId::ROOT, "weight").unwrap();
        assert_eq!(restored.edge_default(weight).unwrap(), PropertyValue::Float(1.0));
        assert_eq!(restored.edge_overrides(weight).unwrap().len(), 1);
        assert!(restored.property(SubgraphId::ROOT, "label").is_err());
        assert!(restored.property(tri, "label").is_ok());
        assert_eq!(
            restored.attribute(SubgraphId::ROOT, "title").unwrap(),
            Some(&PropertyValue::from("sample"))
        );
        assert_eq!(
            restored.attribute(tri, "closed").unwrap(),
            Some(&PropertyValue::Boolean(true))
        );

        assert_eq!(Snapshot::capture(&restored).unwrap(), snapshot);
    }

    #[test]
    fn test_encodings() {
        let snapshot = Snapshot::capture(&sample()).unwrap();
        let json = snapshot.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_rejects_malformed() {
        let mut snapshot = Snapshot::capture(&sample()).unwrap();
        snapshot.format_version = 99;
        assert!(matches!(
            snapshot.restore(StoreConfig::default()),
            Err(PersistenceError::Format(_))
        ));

        let mut snapshot = Snapshot::capture(&sample()).unwrap();
        snapshot.edges.push((0, 42));
        assert!(matches!(
            snapshot.restore(StoreConfig::default()),
            Err(PersistenceError::Format(_))
        ));
        assert!(matches!(Snapshot::from_json("{"), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn test_meta_nodes_survive() {
        let mut store = GraphStore::new();
        let root = SubgraphId::ROOT;
        let n = store.add_nodes(root, 3).unwrap();
        store.add_edge(root, n[0], n[1]).unwrap();
        store.add_edge(root, n[1], n[2]).unwrap();
        let view = store.create_induced_subgraph(root, &n, "view").unwrap();
        store.create_meta_node(view, &[n[1], n[2]]).unwrap();

        let restored = Snapshot::capture(&store)
            .unwrap()
            .restore(StoreConfig::default())
            .unwrap();
        let view = restored.subgraph_by_name("view").unwrap();
        let metas: Vec<NodeId> = restored
            .subgraph(view)
            .unwrap()
            .nodes()
            .filter(|&m| restored.is_meta_node(m))
            .collect();
        assert_eq!(metas.len(), 1);
        let group = restored.meta_graph(metas[0]).unwrap();
        assert_eq!(restored.node_count_in(group).unwrap(), 2);

        let meta_edge = restored.incident_edges_in(view, metas[0], crate::graph::Direction::Both).unwrap();
        assert_eq!(meta_edge.len(), 1);
        assert_eq!(restored.meta_edge_members(meta_edge[0]).len(), 1);
    }
}
