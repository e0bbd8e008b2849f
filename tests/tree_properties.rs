//! Property tests for the tree, layout and viewport invariants:
//!
//! 1. Any sequence of inserts and deletes keeps ids unique.
//! 2. Root deletion always fails and leaves the tree unchanged.
//! 3. Layout is deterministic.
//! 4. Sibling subtree spans never overlap in the top-down layout.
//! 5. Collapse hides all descendants; re-expanding restores coordinates.
//! 6. Zoom at a pointer keeps the world point under it.

use std::collections::HashSet;

use mindtree::config::LayoutConfig;
use mindtree::geometry::Point;
use mindtree::ir::{NewNode, NodeId};
use mindtree::layout::compute_layout;
use mindtree::viewport::ViewportController;
use mindtree::{NodeStore, StoreError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert { parent: usize, label: String },
    Delete { target: usize },
    Toggle { target: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), "[a-z ]{0,8}")
            .prop_map(|(parent, label)| Op::Insert { parent, label }),
        1 => any::<usize>().prop_map(|target| Op::Delete { target }),
        1 => any::<usize>().prop_map(|target| Op::Toggle { target }),
    ]
}

fn pick(store: &NodeStore, index: usize) -> NodeId {
    let ids: Vec<NodeId> = store.root().iter().map(|node| node.id.clone()).collect();
    ids[index % ids.len()].clone()
}

fn apply(store: &mut NodeStore, ops: &[Op]) {
    for op in ops {
        match op {
            Op::Insert { parent, label } => {
                let parent = pick(store, *parent);
                let _ = store.insert_child(parent.as_str(), NewNode::new(label.clone()));
            }
            Op::Delete { target } => {
                let target = pick(store, *target);
                let _ = store.delete_subtree(target.as_str());
            }
            Op::Toggle { target } => {
                let target = pick(store, *target);
                let _ = store.toggle_collapse(target.as_str());
            }
        }
    }
}

fn random_store(ops: &[Op]) -> NodeStore {
    let mut store = NodeStore::new("Topic").unwrap();
    apply(&mut store, ops);
    store
}

proptest! {
    #[test]
    fn ids_stay_unique(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let store = random_store(&ops);
        let ids: Vec<&str> = store.root().iter().map(|node| node.id.as_str()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(ids.len(), unique.len());
        prop_assert_eq!(ids.len(), store.len());
        prop_assert!(store.root().id.is_root());
    }

    #[test]
    fn root_deletion_is_always_rejected(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let mut store = random_store(&ops);
        let before = store.snapshot();
        let root = store.root_id().clone();
        prop_assert_eq!(
            store.delete_subtree(root.as_str()),
            Err(StoreError::RootDeletionForbidden)
        );
        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn layout_is_deterministic(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let store = random_store(&ops);
        let config = LayoutConfig::default();
        let first = compute_layout(store.root(), &config).unwrap();
        let second = compute_layout(store.root(), &config).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn sibling_spans_never_overlap(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let store = random_store(&ops);
        let layout = compute_layout(store.root(), &LayoutConfig::default()).unwrap();
        for parent in store.root().iter() {
            if !parent.shows_children() || !layout.contains(parent.id.as_str()) {
                continue;
            }
            let spans: Vec<(f32, f32)> = parent
                .children
                .iter()
                .map(|child| layout.get(child.id.as_str()).unwrap().span())
                .collect();
            for pair in spans.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0 + 1e-3, "{:?}", pair);
            }
        }
    }

    #[test]
    fn collapse_round_trip(
        ops in prop::collection::vec(op_strategy(), 0..40),
        target in any::<usize>(),
    ) {
        let mut store = random_store(&ops);
        // start from a fully expanded tree so the target's descendants are visible
        let ids: Vec<NodeId> = store.root().iter().map(|node| node.id.clone()).collect();
        for id in &ids {
            store.set_collapsed(id.as_str(), false).unwrap();
        }
        let config = LayoutConfig::default();
        let open = compute_layout(store.root(), &config).unwrap();

        let target = pick(&store, target);
        store.toggle_collapse(target.as_str()).unwrap();
        let folded = compute_layout(store.root(), &config).unwrap();
        let node = store.find(target.as_str()).unwrap();
        for descendant in node.iter().skip(1) {
            prop_assert!(!folded.contains(descendant.id.as_str()));
        }
        prop_assert!(folded.contains(target.as_str()));

        store.toggle_collapse(target.as_str()).unwrap();
        let restored = compute_layout(store.root(), &config).unwrap();
        prop_assert_eq!(restored.positions(), open.positions());
    }

    #[test]
    fn zoom_keeps_world_point_under_pointer(
        px in -2000.0f32..2000.0,
        py in -2000.0f32..2000.0,
        pan_x in -500.0f32..500.0,
        pan_y in -500.0f32..500.0,
        start in 0.2f32..4.0,
        factor in 0.1f32..10.0,
    ) {
        let mut view = ViewportController::new();
        view.pan_by(pan_x, pan_y);
        view.set_scale_at(Point::ORIGIN, start);
        let pointer = Point::new(px, py);
        let before = view.screen_to_world(pointer);
        view.zoom_at(pointer, factor);
        let after = view.screen_to_world(pointer);
        let magnitude = before.x.abs().max(before.y.abs()) + (px.abs() + py.abs()) / view.scale();
        let tolerance = 1e-4 * (1.0 + magnitude);
        prop_assert!((before.x - after.x).abs() <= tolerance, "{:?} vs {:?}", before, after);
        prop_assert!((before.y - after.y).abs() <= tolerance, "{:?} vs {:?}", before, after);
    }
}
