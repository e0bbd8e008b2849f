use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::{LayoutAlgorithm, LayoutConfig};
use crate::geometry::{Bounds, Point};
use crate::ir::{Node, NodeId};

mod balanced;
pub mod edges;
mod error;
mod radial;
mod tree;
mod types;

pub use error::LayoutError;
pub use types::{EdgeLayout, Layout, NodeLayout};

/// Turns a tree into world-space coordinates for every visible node.
///
/// The engine is stateless apart from its constants: the same tree and
/// anchor always produce the same [`Layout`].
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
    }

    pub fn compute(&self, root: &Node, anchor: Point) -> Result<Layout, LayoutError> {
        let config = &self.config;
        let mut nodes = BTreeMap::new();
        match config.algorithm {
            LayoutAlgorithm::TopDown => {
                let widths = measure(root, config.footprint(), config.half_gap, config.max_depth)?;
                tree::place(root, anchor, 0, &widths, config, &mut nodes);
            }
            LayoutAlgorithm::Radial => {
                let widths = measure(root, config.footprint(), config.half_gap, config.max_depth)?;
                radial::place(root, anchor, &widths, config, &mut nodes);
            }
            LayoutAlgorithm::Balanced => {
                let heights = measure(
                    root,
                    config.node_height + config.half_gap,
                    config.half_gap,
                    config.max_depth,
                )?;
                balanced::place(root, anchor, &heights, config, &mut nodes);
            }
        }

        let edges = collect_edges(root, &nodes, config);
        let bounds = nodes
            .values()
            .map(NodeLayout::bounds)
            .reduce(Bounds::union)
            .unwrap_or_else(|| Bounds::around(anchor, 0.0, 0.0));
        debug!(
            algorithm = ?config.algorithm,
            nodes = nodes.len(),
            edges = edges.len(),
            width = bounds.width(),
            height = bounds.height(),
            "layout pass"
        );
        Ok(Layout {
            algorithm: config.algorithm,
            anchor,
            nodes,
            edges,
            bounds,
        })
    }
}

/// Layout anchored at the origin.
pub fn compute_layout(root: &Node, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    LayoutEngine::new(config.clone()).compute(root, Point::ORIGIN)
}

/// Subtree extents along the sibling axis, keyed by node id.
#[derive(Debug)]
pub(crate) struct Extents<'a> {
    values: HashMap<&'a str, f32>,
    gap: f32,
}

impl Extents<'_> {
    pub(crate) fn of(&self, node: &Node) -> f32 {
        self.values.get(node.id.as_str()).copied().unwrap_or(0.0)
    }

    /// Room taken by the visible children of `node` laid side by side.
    pub(crate) fn children_block(&self, node: &Node) -> f32 {
        children_block(&node.children, self)
    }
}

pub(crate) fn children_block(children: &[Node], extents: &Extents<'_>) -> f32 {
    if children.is_empty() {
        return 0.0;
    }
    let total: f32 = children.iter().map(|child| extents.of(child)).sum();
    total + extents.gap * (children.len() as f32 - 1.0)
}

/// Post-order width pass. Also the malformed-tree guard: every visible id is
/// recorded before its children are visited, so a repeated id or a runaway
/// depth stops the pass with an error.
pub(crate) fn measure(
    root: &Node,
    footprint: f32,
    gap: f32,
    max_depth: usize,
) -> Result<Extents<'_>, LayoutError> {
    let mut extents = Extents {
        values: HashMap::new(),
        gap,
    };
    measure_node(root, 0, footprint, max_depth, &mut extents)?;
    Ok(extents)
}

fn measure_node<'a>(
    node: &'a Node,
    depth: usize,
    footprint: f32,
    max_depth: usize,
    extents: &mut Extents<'a>,
) -> Result<f32, LayoutError> {
    if depth > max_depth {
        return Err(LayoutError::DepthExceeded {
            id: node.id.clone(),
            limit: max_depth,
        });
    }
    if extents.values.insert(node.id.as_str(), footprint).is_some() {
        return Err(LayoutError::DuplicateId(node.id.clone()));
    }
    if !node.shows_children() {
        return Ok(footprint);
    }
    for child in &node.children {
        measure_node(child, depth + 1, footprint, max_depth, extents)?;
    }
    let width = footprint.max(children_block(&node.children, extents));
    extents.values.insert(node.id.as_str(), width);
    Ok(width)
}

pub(crate) fn node_layout(
    node: &Node,
    center: Point,
    depth: usize,
    extent: f32,
    config: &LayoutConfig,
) -> NodeLayout {
    NodeLayout {
        id: node.id.clone(),
        x: center.x,
        y: center.y,
        width: config.node_width,
        height: config.node_height,
        depth,
        subtree_width: extent,
    }
}

fn collect_edges(
    root: &Node,
    nodes: &BTreeMap<NodeId, NodeLayout>,
    config: &LayoutConfig,
) -> Vec<EdgeLayout> {
    let mut edges = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !node.shows_children() {
            continue;
        }
        let Some(parent) = nodes.get(&node.id) else {
            continue;
        };
        for child in &node.children {
            let Some(child_layout) = nodes.get(&child.id) else {
                continue;
            };
            let (start, end) = edges::connector(
                parent.center(),
                child_layout.center(),
                config.node_width,
                config.node_height,
            );
            edges.push(EdgeLayout {
                from: node.id.clone(),
                to: child.id.clone(),
                start,
                end,
            });
        }
        stack.extend(node.children.iter().rev());
    }
    edges
}
