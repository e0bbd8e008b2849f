use std::collections::HashSet;
use std::path::Path;

use mindtree::config::{Config, GenerationConfig, LayoutAlgorithm};
use mindtree::generator::{GeneratedContent, normalize};
use mindtree::ir::OutlineNode;
use mindtree::{Layout, MindMapController};

fn load_fixture(rel: &str, topic: &str) -> Vec<OutlineNode> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    assert!(path.exists(), "fixture missing: {}", rel);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    let generation = GenerationConfig {
        max_children: 16,
        ..GenerationConfig::default()
    };
    normalize(GeneratedContent::Raw(input), &generation, Some(topic))
}

fn build(outline: &[OutlineNode], topic: &str, algorithm: LayoutAlgorithm) -> MindMapController {
    let mut config = Config::default();
    config.layout.algorithm = algorithm;
    let mut map = MindMapController::new(topic, config).expect("seed failed");
    map.seed_outline(outline).expect("outline insert failed");
    map
}

fn assert_consistent(map: &MindMapController, fixture: &str) {
    let layout = map.layout();
    let visible = map.store().visible_ids();
    assert_eq!(layout.len(), visible.len(), "{fixture}: visible node count");
    for id in &visible {
        assert!(layout.contains(id.as_str()), "{fixture}: `{id}` not laid out");
    }
    assert_eq!(layout.edges.len(), visible.len() - 1, "{fixture}: edge count");
    assert_eq!(map.scene().nodes.len(), visible.len(), "{fixture}: scene nodes");

    let ids: HashSet<&str> = map.root().iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids.len(), map.store().len(), "{fixture}: duplicate ids");
}

fn assert_siblings_disjoint(layout: &Layout, map: &MindMapController, fixture: &str) {
    for parent in map.root().iter() {
        if !parent.shows_children() || !layout.contains(parent.id.as_str()) {
            continue;
        }
        let spans: Vec<(f32, f32)> = parent
            .children
            .iter()
            .map(|child| layout.get(child.id.as_str()).expect("child laid out").span())
            .collect();
        for pair in spans.windows(2) {
            assert!(
                pair[0].1 <= pair[1].0 + 1e-3,
                "{fixture}: siblings of `{}` overlap: {pair:?}",
                parent.id
            );
        }
    }
}

#[test]
fn lay_out_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        ("python.txt", "Python", 12),
        ("rust_mindmap.mmd", "Rust", 13),
        ("chat_reply.md", "Machine Learning", 10),
        ("history.json", "World History", 11),
    ];

    for (rel, topic, expected_nodes) in candidates {
        let outline = load_fixture(rel, topic);
        assert!(!outline.is_empty(), "{rel}: nothing parsed");
        for algorithm in [
            LayoutAlgorithm::TopDown,
            LayoutAlgorithm::Radial,
            LayoutAlgorithm::Balanced,
        ] {
            let map = build(&outline, topic, algorithm);
            assert_eq!(map.store().len(), expected_nodes, "{rel}: node count");
            assert_consistent(&map, rel);
            if algorithm == LayoutAlgorithm::TopDown {
                assert_siblings_disjoint(map.layout(), &map, rel);
            }
        }
    }
}

#[test]
fn python_scenario() {
    let config = Config::default();
    let level = config.layout.level_height;
    let mut map = MindMapController::new("Python", config).unwrap();
    let ids = map
        .add_children("root", ["Basics", "OOP", "Libraries"])
        .unwrap();
    let (basics, oop, libs) = (ids[0].clone(), ids[1].clone(), ids[2].clone());

    let layout = map.layout().clone();
    let root = layout.get("root").unwrap();
    assert_eq!((root.x, root.y), (0.0, 0.0));
    for id in &ids {
        assert_eq!(layout.get(id.as_str()).unwrap().y, level);
    }
    let x = |layout: &Layout, id: &str| layout.get(id).unwrap().x;
    assert!(x(&layout, basics.as_str()) < x(&layout, oop.as_str()));
    assert!(x(&layout, oop.as_str()) < x(&layout, libs.as_str()));
    assert!((x(&layout, basics.as_str()) + x(&layout, libs.as_str())).abs() < 1e-4);

    // a grandchild under OOP, then collapse OOP
    map.add_children(oop.as_str(), ["Classes", "Inheritance"])
        .unwrap();
    let grandchild = map.store().find(oop.as_str()).unwrap().children[0]
        .id
        .clone();
    let open = map.layout().clone();
    map.toggle_collapse(oop.as_str()).unwrap();
    let folded = map.layout().clone();
    assert!(!folded.contains(grandchild.as_str()));
    assert!(x(&folded, basics.as_str()) > x(&open, basics.as_str()));
    assert!(x(&folded, libs.as_str()) < x(&open, libs.as_str()));

    // expanding restores the exact coordinates
    map.toggle_collapse(oop.as_str()).unwrap();
    assert_eq!(map.layout().positions(), open.positions());

    // delete Libraries: the other two re-center around the root
    map.delete(libs.as_str()).unwrap();
    let after = map.layout();
    assert!(!after.contains(libs.as_str()));
    let left = x(after, basics.as_str());
    let right = x(after, oop.as_str());
    let center = (left + right) / 2.0;
    let oop_half = after.get(oop.as_str()).unwrap().subtree_width / 2.0;
    let basics_half = after.get(basics.as_str()).unwrap().subtree_width / 2.0;
    // the children block, not the two centers, is centered on the root
    let block_mid = ((left - basics_half) + (right + oop_half)) / 2.0;
    assert!(block_mid.abs() < 1e-3, "block midpoint {block_mid}, centers {center}");
}

#[test]
fn relayout_without_mutation_is_identical() {
    let outline = load_fixture("rust_mindmap.mmd", "Rust");
    let mut map = build(&outline, "Rust", LayoutAlgorithm::TopDown);
    let first = serde_json::to_string(map.layout()).unwrap();
    map.relayout().unwrap();
    let second = serde_json::to_string(map.layout()).unwrap();
    assert_eq!(first, second);
}
