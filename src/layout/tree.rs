use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::geometry::Point;
use crate::ir::{Node, NodeId};

use super::{Extents, NodeLayout, node_layout};

/// Pre-order position pass of the top-down layout. The children block is
/// centered under its parent and every child sits in the middle of its own
/// slice of that block, one level band lower.
pub(super) fn place(
    node: &Node,
    anchor: Point,
    depth: usize,
    widths: &Extents<'_>,
    config: &LayoutConfig,
    out: &mut BTreeMap<NodeId, NodeLayout>,
) {
    out.insert(
        node.id.clone(),
        node_layout(node, anchor, depth, widths.of(node), config),
    );
    if !node.shows_children() {
        return;
    }
    let total = widths.children_block(node);
    let child_y = anchor.y + config.level_height;
    let mut cursor = anchor.x - total / 2.0;
    for child in &node.children {
        let child_width = widths.of(child);
        let child_anchor = Point::new(cursor + child_width / 2.0, child_y);
        place(child, child_anchor, depth + 1, widths, config, out);
        cursor += child_width + config.half_gap;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LayoutConfig;
    use crate::ir::Node;
    use crate::layout::compute_layout;

    fn python() -> Node {
        Node::new("root", "Python").with_children(vec![
            Node::new("basics", "Basics"),
            Node::new("oop", "OOP"),
            Node::new("libs", "Libraries"),
        ])
    }

    #[test]
    fn three_children_are_symmetric_around_the_root() {
        let config = LayoutConfig::default();
        let layout = compute_layout(&python(), &config).unwrap();
        let root = layout.get("root").unwrap();
        assert_eq!((root.x, root.y), (0.0, 0.0));

        let basics = layout.get("basics").unwrap();
        let oop = layout.get("oop").unwrap();
        let libs = layout.get("libs").unwrap();
        for child in [basics, oop, libs] {
            assert_eq!(child.y, config.level_height);
            assert_eq!(child.depth, 1);
        }
        assert!(basics.x < oop.x && oop.x < libs.x);
        assert!(oop.x.abs() < 1e-4);
        assert!((basics.x + libs.x).abs() < 1e-4);
        let step = config.footprint() + config.half_gap;
        assert!((libs.x - oop.x - step).abs() < 1e-4);
    }

    #[test]
    fn single_child_sits_directly_below() {
        let tree = Node::new("root", "R").with_children(vec![Node::new("a", "A")]);
        let layout = compute_layout(&tree, &LayoutConfig::default()).unwrap();
        assert_eq!(layout.get("a").unwrap().x, 0.0);
    }

    #[test]
    fn collapsing_a_branch_pulls_siblings_inward() {
        let config = LayoutConfig::default();
        let mut tree = python();
        tree.children[1].children = vec![
            Node::new("classes", "Classes"),
            Node::new("mixins", "Mixins"),
            Node::new("dunder", "Dunder methods"),
        ];
        let open = compute_layout(&tree, &config).unwrap();
        tree.children[1].collapsed = true;
        let folded = compute_layout(&tree, &config).unwrap();

        let open_spread = open.get("libs").unwrap().x - open.get("basics").unwrap().x;
        let folded_spread = folded.get("libs").unwrap().x - folded.get("basics").unwrap().x;
        assert!(folded_spread < open_spread);
        assert_eq!(folded.get("oop").unwrap().subtree_width, config.footprint());
    }

    #[test]
    fn sibling_spans_do_not_overlap() {
        let mut tree = python();
        tree.children[0].children = vec![Node::new("a", "a"), Node::new("b", "b")];
        tree.children[2].children = vec![Node::new("c", "c")];
        let layout = compute_layout(&tree, &LayoutConfig::default()).unwrap();
        let spans: Vec<(f32, f32)> = ["basics", "oop", "libs"]
            .iter()
            .map(|id| layout.get(id).unwrap().span())
            .collect();
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0 + 1e-4, "{pair:?}");
        }
    }
}
