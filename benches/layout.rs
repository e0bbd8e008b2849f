use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mindtree::config::{LayoutAlgorithm, LayoutConfig};
use mindtree::ir::Node;
use mindtree::layout::compute_layout;
use mindtree::parser::parse_response;
use std::hint::black_box;

/// Complete tree with `fanout` children per node, `depth` levels below the
/// root.
fn wide_tree(fanout: usize, depth: usize) -> Node {
    let mut next = 0usize;
    build(&mut next, fanout, depth)
}

fn build(next: &mut usize, fanout: usize, depth: usize) -> Node {
    let id = if *next == 0 {
        "root".to_string()
    } else {
        format!("n{}", *next)
    };
    *next += 1;
    let mut node = Node::new(id.as_str(), id.clone());
    if depth > 0 {
        node.children = (0..fanout)
            .map(|_| build(next, fanout, depth - 1))
            .collect();
    }
    node
}

/// Single chain of `len` nodes.
fn deep_tree(len: usize) -> Node {
    let mut node = Node::new(format!("n{len}").as_str(), "leaf");
    for i in (1..len).rev() {
        node = Node::new(format!("n{i}").as_str(), format!("level {i}")).with_children(vec![node]);
    }
    Node::new("root", "root").with_children(vec![node])
}

fn outline_source(entries: usize) -> String {
    let mut out = String::from("Here is an outline:\n");
    for i in 0..entries {
        out.push_str(&format!("- **Topic {i}**\n"));
        for j in 0..3 {
            out.push_str(&format!("  - Detail {i}.{j}\n"));
        }
    }
    out
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let trees = [
        ("wide_4x4", wide_tree(4, 4)),
        ("wide_8x3", wide_tree(8, 3)),
        ("wide_16x2", wide_tree(16, 2)),
        ("deep_200", deep_tree(200)),
    ];
    for algorithm in [
        LayoutAlgorithm::TopDown,
        LayoutAlgorithm::Radial,
        LayoutAlgorithm::Balanced,
    ] {
        let config = LayoutConfig {
            algorithm,
            ..LayoutConfig::default()
        };
        for (name, tree) in &trees {
            let id = format!("{algorithm:?}/{name}");
            group.bench_with_input(BenchmarkId::from_parameter(id), tree, |b, tree| {
                b.iter(|| {
                    let layout = compute_layout(black_box(tree), &config).expect("layout failed");
                    black_box(layout.len());
                });
            });
        }
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for entries in [8usize, 64, 256] {
        let input = outline_source(entries);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &input, |b, data| {
            b.iter(|| {
                let outline = parse_response(black_box(data));
                black_box(outline.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_parse
);
criterion_main!(benches);
