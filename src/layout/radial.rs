use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::config::LayoutConfig;
use crate::geometry::Point;
use crate::ir::{Node, NodeId};

use super::{Extents, NodeLayout, node_layout};

/// Radial variant: depth becomes the ring radius and each child receives a
/// slice of its parent's wedge proportional to its subtree width. The first
/// wedge starts at twelve o'clock.
pub(super) fn place(
    root: &Node,
    center: Point,
    widths: &Extents<'_>,
    config: &LayoutConfig,
    out: &mut BTreeMap<NodeId, NodeLayout>,
) {
    out.insert(
        root.id.clone(),
        node_layout(root, center, 0, widths.of(root), config),
    );
    if root.shows_children() {
        place_ring(root, center, 1, -FRAC_PI_2, -FRAC_PI_2 + TAU, widths, config, out);
    }
}

fn place_ring(
    parent: &Node,
    center: Point,
    depth: usize,
    start: f32,
    end: f32,
    widths: &Extents<'_>,
    config: &LayoutConfig,
    out: &mut BTreeMap<NodeId, NodeLayout>,
) {
    let total: f32 = parent.children.iter().map(|child| widths.of(child)).sum();
    if total <= 0.0 {
        return;
    }
    let radius = depth as f32 * config.level_height;
    let mut cursor = start;
    for child in &parent.children {
        let share = (end - start) * widths.of(child) / total;
        let angle = cursor + share / 2.0;
        let position = Point::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        );
        out.insert(
            child.id.clone(),
            node_layout(child, position, depth, widths.of(child), config),
        );
        if child.shows_children() {
            place_ring(child, center, depth + 1, cursor, cursor + share, widths, config, out);
        }
        cursor += share;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{LayoutAlgorithm, LayoutConfig};
    use crate::ir::Node;
    use crate::layout::compute_layout;

    fn radial() -> LayoutConfig {
        LayoutConfig {
            algorithm: LayoutAlgorithm::Radial,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn children_sit_on_the_first_ring() {
        let config = radial();
        let tree = Node::new("root", "R").with_children(vec![
            Node::new("a", "A"),
            Node::new("b", "B"),
            Node::new("c", "C"),
            Node::new("d", "D"),
        ]);
        let layout = compute_layout(&tree, &config).unwrap();
        for id in ["a", "b", "c", "d"] {
            let node = layout.get(id).unwrap();
            let radius = (node.x * node.x + node.y * node.y).sqrt();
            assert!((radius - config.level_height).abs() < 1e-3, "{id}: {radius}");
        }
        // four equal wedges starting at twelve o'clock: first one is up and right
        let a = layout.get("a").unwrap();
        assert!(a.x > 0.0 && a.y < 0.0);
    }

    #[test]
    fn grandchildren_stay_inside_parent_wedge() {
        let config = radial();
        let tree = Node::new("root", "R").with_children(vec![
            Node::new("a", "A").with_children(vec![Node::new("a1", "a1"), Node::new("a2", "a2")]),
            Node::new("b", "B"),
        ]);
        let layout = compute_layout(&tree, &config).unwrap();
        for id in ["a1", "a2"] {
            let node = layout.get(id).unwrap();
            let radius = (node.x * node.x + node.y * node.y).sqrt();
            assert!((radius - 2.0 * config.level_height).abs() < 1e-3);
            assert_eq!(node.depth, 2);
        }
        let angle = |id: &str| {
            let node = layout.get(id).unwrap();
            node.y.atan2(node.x)
        };
        assert!(angle("a1") < angle("a") && angle("a") < angle("a2"));
        // the wider subtree gets the larger wedge, so `b` ends up on the left
        assert!(layout.get("b").unwrap().x < 0.0);
    }
}
