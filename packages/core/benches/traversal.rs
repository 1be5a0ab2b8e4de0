//! Benchmarks for tree building and traversal
//!
//! Run with: `cargo bench -p flowchart-core`
//!
//! - Tree builder throughput on wide and deep edge lists
//! - Traversal cost per order on a 10k-node tree
//! - Store replace of a 1000-node flowchart

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowchart_core::db::{DatabaseService, Deadline, FlowChartStore, TursoFlowChartStore};
use flowchart_core::models::{
    build_tree, DepthLimit, Edge, FlowChart, LabelData, TraverseFlags, TraverseOrder, TreeNode,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Node list and edges for a tree where every node has `fanout` children
fn generate_tree(node_count: usize, fanout: usize) -> (Vec<TreeNode<LabelData>>, Vec<Edge>) {
    let nodes = (0..node_count)
        .map(|i| TreeNode::new(i.to_string(), LabelData::new(format!("step {}", i))))
        .collect();
    let edges = (1..node_count)
        .map(|i| Edge::new(((i - 1) / fanout).to_string(), i.to_string()))
        .collect();
    (nodes, edges)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_tree");

    for (name, fanout) in [("wide_10k", 50), ("deep_10k", 2)] {
        let (nodes, edges) = generate_tree(10_000, fanout);
        group.bench_function(name, |b| {
            b.iter(|| build_tree(black_box(nodes.clone()), black_box(&edges)).unwrap())
        });
    }

    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let (nodes, edges) = generate_tree(10_000, 4);
    let built = build_tree(nodes, &edges).unwrap();
    let root = built.root.unwrap();

    let mut group = c.benchmark_group("traverse_10k");
    for (name, order) in [
        ("pre_order", TraverseOrder::PreOrder),
        ("in_order", TraverseOrder::InOrder),
        ("post_order", TraverseOrder::PostOrder),
        ("level_order", TraverseOrder::LevelOrder),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut visited = 0usize;
                built
                    .tree
                    .traverse(root, order, TraverseFlags::ALL, DepthLimit::Unbounded, |_, node| {
                        visited += black_box(node.id.len());
                        ControlFlow::Continue(())
                    })
                    .unwrap();
                visited
            })
        });
    }
    group.finish();
}

fn bench_store_replace(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let store = rt.block_on(async {
        let db = Arc::new(
            DatabaseService::new(temp_dir.path().join("bench.db"))
                .await
                .unwrap(),
        );
        TursoFlowChartStore::new(db)
    });

    let (nodes, edges) = generate_tree(1_000, 8);
    let chart = FlowChart::build("Bench", "bench", nodes, &edges).unwrap();
    rt.block_on(store.store_flowchart(&Deadline::after(Duration::from_secs(30)), &chart))
        .unwrap();

    let mut group = c.benchmark_group("store");
    group.sample_size(10); // Fewer samples for expensive operations
    group.bench_function("replace_1000_nodes", |b| {
        b.iter(|| {
            rt.block_on(store.update_flowchart(&Deadline::after(Duration::from_secs(30)), &chart))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_traverse, bench_store_replace);
criterion_main!(benches);
