use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use strata::algo::is_connected;
use strata::graph::{Direction, GraphStore, PropertyType, PropertyValue, SubgraphId};
use strata::{ConnectivityCache, Snapshot, StoreConfig};

const ROOT: SubgraphId = SubgraphId::ROOT;

/// Ring of `size` nodes with one chord per tenth node
fn ring(size: u32) -> GraphStore {
    let mut store = GraphStore::new();
    let nodes = store.add_nodes(ROOT, size).unwrap();
    for i in 0..nodes.len() {
        store.add_edge(ROOT, nodes[i], nodes[(i + 1) % nodes.len()]).unwrap();
        if i % 10 == 0 {
            store.add_edge(ROOT, nodes[i], nodes[(i * 7) % nodes.len()]).unwrap();
        }
    }
    store
}

/// Benchmark node and edge insertion throughput
fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("insertion");

    for size in [100u32, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("one_by_one", size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new();
                let mut prev = store.add_node(ROOT).unwrap();
                for _ in 1..size {
                    let n = store.add_node(ROOT).unwrap();
                    store.add_edge(ROOT, prev, n).unwrap();
                    prev = n;
                }
                criterion::black_box(store.edge_count());
            });
        });
        group.bench_with_input(BenchmarkId::new("bulk", size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new();
                let nodes = store.add_nodes(ROOT, size).unwrap();
                let pairs: Vec<_> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
                criterion::black_box(store.add_edges(ROOT, &pairs).unwrap().len());
            });
        });
    }
    group.finish();
}

/// Benchmark incidence traversal through the root and through a view
fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");
    let mut store = ring(10_000);
    let half: Vec<_> = store.root().nodes().take(5_000).collect();
    let view = store.create_induced_subgraph(ROOT, &half, "half").unwrap();

    group.bench_function("root_degree_sum", |b| {
        b.iter(|| {
            let total: usize = store
                .root()
                .nodes()
                .map(|n| store.incident_edges(n, Direction::Both).unwrap().count())
                .sum();
            criterion::black_box(total);
        });
    });

    group.bench_function("view_degree_sum", |b| {
        b.iter(|| {
            let total: usize = half.iter().map(|&n| store.degree_in(view, n).unwrap()).sum();
            criterion::black_box(total);
        });
    });

    group.finish();
}

/// Benchmark sparse property reads and writes
fn bench_properties(c: &mut Criterion) {
    let mut group = c.benchmark_group("properties");
    let mut store = ring(10_000);
    let weight = store.create_property(ROOT, "weight", PropertyType::Float).unwrap();
    let edges: Vec<_> = store.root().edges().collect();

    group.bench_function("set_every_tenth", |b| {
        b.iter(|| {
            for (i, &e) in edges.iter().enumerate().step_by(10) {
                store.set_edge_value(weight, e, PropertyValue::Float(i as f64)).unwrap();
            }
        });
    });

    group.bench_function("get_all", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for &e in &edges {
                sum += store.edge_value(weight, e).unwrap().as_float().unwrap_or(0.0);
            }
            criterion::black_box(sum);
        });
    });

    group.finish();
}

/// Benchmark connectivity, direct and cached
fn bench_connectivity(c: &mut Criterion) {
    let mut group = c.benchmark_group("connectivity");
    let store = ring(10_000);

    group.bench_function("direct", |b| {
        b.iter(|| criterion::black_box(is_connected(&store, ROOT).unwrap()));
    });

    let cache = ConnectivityCache::new();
    group.bench_function("cached", |b| {
        b.iter(|| criterion::black_box(cache.is_connected(&store, ROOT).unwrap()));
    });

    group.finish();
}

/// Benchmark snapshot capture and restore
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let store = ring(10_000);
    let snapshot = Snapshot::capture(&store).unwrap();
    let bytes = snapshot.to_bytes().unwrap();

    group.bench_function("capture", |b| {
        b.iter(|| criterion::black_box(Snapshot::capture(&store).unwrap()));
    });

    group.bench_function("restore_bincode", |b| {
        b.iter(|| {
            let snapshot = Snapshot::from_bytes(&bytes).unwrap();
            criterion::black_box(snapshot.restore(StoreConfig::default()).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insertion,
    bench_traversal,
    bench_properties,
    bench_connectivity,
    bench_snapshot,
);
criterion_main!(benches);
