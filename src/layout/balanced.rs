use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::geometry::Point;
use crate::ir::{Node, NodeId};

use super::{Extents, NodeLayout, node_layout};

/// Classic mind-map shape: the root in the middle, first-level branches
/// alternating right and left, every branch growing away from the root
/// with its subtrees stacked vertically.
pub(super) fn place(
    root: &Node,
    center: Point,
    heights: &Extents<'_>,
    config: &LayoutConfig,
    out: &mut BTreeMap<NodeId, NodeLayout>,
) {
    out.insert(
        root.id.clone(),
        node_layout(root, center, 0, heights.of(root), config),
    );
    if !root.shows_children() {
        return;
    }
    let mut right: Vec<&Node> = Vec::new();
    let mut left: Vec<&Node> = Vec::new();
    for (index, child) in root.children.iter().enumerate() {
        if index.is_multiple_of(2) {
            right.push(child);
        } else {
            left.push(child);
        }
    }
    place_children(&right, 1.0, center, 1, heights, config, out);
    place_children(&left, -1.0, center, 1, heights, config, out);
}

fn place_children(
    children: &[&Node],
    direction: f32,
    parent_center: Point,
    depth: usize,
    heights: &Extents<'_>,
    config: &LayoutConfig,
    out: &mut BTreeMap<NodeId, NodeLayout>,
) {
    if children.is_empty() {
        return;
    }
    let stacked: f32 = children.iter().map(|child| heights.of(child)).sum();
    let total = stacked + config.half_gap * (children.len() as f32 - 1.0);
    let child_x = parent_center.x + direction * (config.node_width + config.rank_gap);
    let mut cursor = parent_center.y - total / 2.0;
    for child in children {
        let child_height = heights.of(child);
        let child_center = Point::new(child_x, cursor + child_height / 2.0);
        out.insert(
            child.id.clone(),
            node_layout(child, child_center, depth, child_height, config),
        );
        if child.shows_children() {
            let grandchildren: Vec<&Node> = child.children.iter().collect();
            place_children(
                &grandchildren,
                direction,
                child_center,
                depth + 1,
                heights,
                config,
                out,
            );
        }
        cursor += child_height + config.half_gap;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{LayoutAlgorithm, LayoutConfig};
    use crate::ir::Node;
    use crate::layout::compute_layout;

    fn balanced() -> LayoutConfig {
        LayoutConfig {
            algorithm: LayoutAlgorithm::Balanced,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn branches_alternate_sides() {
        let config = balanced();
        let tree = Node::new("root", "R").with_children(vec![
            Node::new("a", "A"),
            Node::new("b", "B"),
            Node::new("c", "C"),
        ]);
        let layout = compute_layout(&tree, &config).unwrap();
        let offset = config.node_width + config.rank_gap;
        assert_eq!(layout.get("a").unwrap().x, offset);
        assert_eq!(layout.get("b").unwrap().x, -offset);
        assert_eq!(layout.get("c").unwrap().x, offset);
        // the right side stacks two nodes symmetrically around the root
        let a = layout.get("a").unwrap().y;
        let c = layout.get("c").unwrap().y;
        assert!((a + c).abs() < 1e-4 && a < c);
        assert_eq!(layout.get("b").unwrap().y, 0.0);
    }

    #[test]
    fn grandchildren_keep_growing_outward() {
        let config = balanced();
        let tree = Node::new("root", "R").with_children(vec![
            Node::new("a", "A"),
            Node::new("b", "B").with_children(vec![Node::new("b1", "b1")]),
        ]);
        let layout = compute_layout(&tree, &config).unwrap();
        let offset = config.node_width + config.rank_gap;
        let b1 = layout.get("b1").unwrap();
        assert_eq!(b1.x, -2.0 * offset);
        assert_eq!(b1.depth, 2);
    }
}
