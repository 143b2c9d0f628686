use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vellum_core::{linearize, Node, NodeId, NodeKind, Parent, SceneGraph};

/// Balanced tree: every container holds `fanout` children
fn balanced(depth: u32, fanout: u64) -> SceneGraph {
    let mut graph = SceneGraph::new();
    let mut next = 0u64;
    let mut frontier = vec![Parent::Root];

    for _ in 0..depth {
        let mut level = Vec::new();
        for parent in frontier {
            for _ in 0..fanout {
                let node = Node::new(NodeId(next), NodeKind::container(10.0, 10.0));
                next += 1;
                if let Ok(id) = graph.insert(parent, node, None) {
                    level.push(Parent::Node(id));
                }
            }
        }
        frontier = level;
    }
    graph
}

fn linearize_small_page(c: &mut Criterion) {
    let graph = balanced(3, 6);
    c.bench_function("linearize_258_nodes", |b| {
        b.iter(|| linearize(black_box(&graph), Parent::Root))
    });
}

fn linearize_large_page(c: &mut Criterion) {
    let graph = balanced(5, 8);
    c.bench_function("linearize_37448_nodes", |b| {
        b.iter(|| linearize(black_box(&graph), Parent::Root))
    });
}

fn clone_and_edit(c: &mut Criterion) {
    let graph = balanced(5, 8);
    c.bench_function("snapshot_then_move", |b| {
        b.iter(|| {
            let mut next = graph.clone();
            let _ = next.move_node(NodeId(9), Parent::Root, None);
            black_box(next)
        })
    });
}

criterion_group!(benches, linearize_small_page, linearize_large_page, clone_and_edit);
criterion_main!(benches);
