use criterion::{criterion_group, criterion_main, Criterion};
use once_cell::sync::Lazy;
use roadplan_lib::graph::{synthesize, NodeId, Synthesis};
use roadplan_lib::{
    Coordinate, DirectionsProvider, FixtureProvider, Heuristic, PsoConfig, RoutePlanner,
};
use std::hint::black_box;
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures/sample_routes.json")
}

static SYNTHESIS: Lazy<Synthesis> = Lazy::new(|| {
    let provider = FixtureProvider::load(&fixture_path()).expect("fixture loads");
    let variants = provider.multi_route(
        Coordinate::new(27.882, 112.864),
        Coordinate::new(27.829, 112.944),
    );
    synthesize(&variants).expect("fixture synthesizes")
});

static ENDPOINTS: Lazy<(NodeId, NodeId)> = Lazy::new(|| {
    let graph = &SYNTHESIS.graph;
    let start = graph.nearest_node(27.882, 112.864).expect("start node");
    let end = graph.nearest_node(27.829, 112.944).expect("end node");
    (start, end)
});

fn benchmark_pathfinding(c: &mut Criterion) {
    let graph = &SYNTHESIS.graph;
    let (start, end) = *ENDPOINTS;

    c.bench_function("dijkstra_xiangtan_wanda", |b| {
        let planner = RoutePlanner::Dijkstra;
        b.iter(|| black_box(planner.run(graph, start, end).cost));
    });

    c.bench_function("astar_planar_xiangtan_wanda", |b| {
        let planner = RoutePlanner::AStar {
            heuristic: Heuristic::Planar,
        };
        b.iter(|| black_box(planner.run(graph, start, end).path.len()));
    });

    c.bench_function("pso_seeded_xiangtan_wanda", |b| {
        let planner = RoutePlanner::Pso(PsoConfig {
            seed: Some(42),
            ..PsoConfig::default()
        });
        b.iter(|| black_box(planner.run(graph, start, end).metrics.nodes_visited));
    });

    c.bench_function("synthesize_xiangtan_wanda", |b| {
        let provider = FixtureProvider::load(&fixture_path()).expect("fixture loads");
        let variants = provider.multi_route(
            Coordinate::new(27.882, 112.864),
            Coordinate::new(27.829, 112.944),
        );
        b.iter(|| {
            let synthesis = synthesize(&variants).expect("fixture synthesizes");
            black_box(synthesis.graph.edge_count())
        });
    });
}

criterion_group!(benches, benchmark_pathfinding);
criterion_main!(benches);
