use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::LayoutAlgorithm;
use crate::geometry::{Bounds, Point};
use crate::ir::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: NodeId,
    /// Center of the node in world space.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth: usize,
    /// Room reserved for this node and its visible descendants along the
    /// sibling axis.
    pub subtree_width: f32,
}

impl NodeLayout {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.center(), self.width, self.height)
    }

    /// Horizontal interval `x ± subtree_width / 2` owned by this subtree in
    /// the top-down layout.
    pub fn span(&self) -> (f32, f32) {
        let half = self.subtree_width / 2.0;
        (self.x - half, self.x + half)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub from: NodeId,
    pub to: NodeId,
    /// Boundary point on the parent.
    pub start: Point,
    /// Boundary point on the child.
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub algorithm: LayoutAlgorithm,
    pub anchor: Point,
    pub nodes: BTreeMap<NodeId, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub bounds: Bounds,
}

impl Layout {
    pub fn get(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The coordinate map handed to renderers and written back to the store.
    pub fn positions(&self) -> BTreeMap<NodeId, Point> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.center()))
            .collect()
    }

    pub fn width(&self) -> f32 {
        self.bounds.width()
    }

    pub fn height(&self) -> f32 {
        self.bounds.height()
    }
}
