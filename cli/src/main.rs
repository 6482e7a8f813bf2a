//! Strata CLI: inspect and generate graph snapshots
//!
//! Snapshots ending in `.json` are read and written as JSON, anything else
//! as bincode.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use strata::algo::{connected_components, ConnectivityCache};
use strata::graph::{GraphStore, PropertyType, PropertyValue, SubgraphId};
use strata::{Snapshot, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata", version, about = "Strata graph snapshot tool")]
struct Cli {
    /// Store configuration file (YAML or JSON)
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Node, edge and property counts per subgraph
    Stats {
        snapshot: PathBuf,
    },
    /// Connectivity of every subgraph
    Check {
        snapshot: PathBuf,
    },
    /// Write the five node sample graph
    Demo {
        out: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };

    match &cli.command {
        Commands::Stats { snapshot } => run_stats(&load(snapshot, config)?, &cli.format),
        Commands::Check { snapshot } => run_check(&load(snapshot, config)?, &cli.format),
        Commands::Demo { out } => run_demo(out, config),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn load(path: &Path, config: StoreConfig) -> Result<GraphStore> {
    let snapshot = if is_json(path) {
        Snapshot::load_json(path)
    } else {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Snapshot::from_bytes(&bytes)
    }
    .with_context(|| format!("decoding snapshot {}", path.display()))?;
    let store = snapshot.restore(config)?;
    info!(path = %path.display(), "loaded snapshot");
    Ok(store)
}

fn subgraph_label(store: &GraphStore, sg: SubgraphId) -> Result<String> {
    let depth = store.depth(sg)?;
    Ok(format!("{}{}", "  ".repeat(depth), store.subgraph(sg)?.name()))
}

fn run_stats(store: &GraphStore, format: &OutputFormat) -> Result<()> {
    let mut rows = Vec::new();
    for sg in store.subgraphs() {
        let view = store.subgraph(sg)?;
        rows.push((
            sg,
            view.node_count(),
            view.edge_count(),
            store.local_properties(sg)?.len(),
        ));
    }

    match format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|&(sg, nodes, edges, props)| {
                    Ok(serde_json::json!({
                        "id": sg.as_u32(),
                        "name": store.subgraph(sg)?.name(),
                        "parent": store.parent(sg)?.map(|p| p.as_u32()),
                        "nodes": nodes,
                        "edges": edges,
                        "properties": props,
                    }))
                })
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Subgraph", "Nodes", "Edges", "Properties"]);
            for &(sg, nodes, edges, props) in &rows {
                table.add_row(vec![
                    subgraph_label(store, sg)?,
                    nodes.to_string(),
                    edges.to_string(),
                    props.to_string(),
                ]);
            }
            println!("{}", table);
            println!("{} subgraph(s)", rows.len());
        }
    }
    Ok(())
}

fn run_check(store: &GraphStore, format: &OutputFormat) -> Result<()> {
    let cache = ConnectivityCache::new();
    let mut rows = Vec::new();
    for sg in store.subgraphs() {
        let connected = cache.is_connected(store, sg)?;
        let components = connected_components(store, sg)?.len();
        rows.push((sg, connected, components));
    }

    match format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|&(sg, connected, components)| {
                    Ok(serde_json::json!({
                        "id": sg.as_u32(),
                        "name": store.subgraph(sg)?.name(),
                        "connected": connected,
                        "components": components,
                    }))
                })
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Subgraph", "Connected", "Components"]);
            for &(sg, connected, components) in &rows {
                table.add_row(vec![
                    subgraph_label(store, sg)?,
                    (if connected { "yes" } else { "no" }).to_string(),
                    components.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

/// Nodes A..E with edges A-B, A-C, B-D, C-E, D-E, an edge weight property
/// and a subgraph holding A and B
fn run_demo(out: &Path, config: StoreConfig) -> Result<()> {
    let mut store = GraphStore::with_config(config);
    let root = SubgraphId::ROOT;
    let n = store.add_nodes(root, 5)?;
    let (a, b, c, d, e) = (n[0], n[1], n[2], n[3], n[4]);
    let ab = store.add_edge(root, a, b)?;
    for (src, dst) in [(a, c), (b, d), (c, e), (d, e)] {
        store.add_edge(root, src, dst)?;
    }

    let name = store.create_property(root, "name", PropertyType::String)?;
    for (node, label) in n.iter().zip(["A", "B", "C", "D", "E"]) {
        store.set_node_value(name, *node, label.into())?;
    }
    let weight = store.create_property(root, "weight", PropertyType::Float)?;
    store.set_edge_default(weight, PropertyValue::Float(1.0))?;
    store.set_edge_value(weight, ab, PropertyValue::Float(2.5))?;
    store.create_induced_subgraph(root, &[a, b], "S1")?;

    let snapshot = Snapshot::capture(&store)?;
    if is_json(out) {
        snapshot.save_json(out)?;
    } else {
        std::fs::write(out, snapshot.to_bytes()?)
            .with_context(|| format!("writing {}", out.display()))?;
    }
    println!("wrote {}", out.display());
    Ok(())
}
