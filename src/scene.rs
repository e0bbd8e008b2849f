use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::geometry::{Bounds, Point};
use crate::ir::{Node, NodeId, NodeShape};
use crate::layout::edges::connector;
use crate::viewport::ViewportController;

/// One visible node as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub text: String,
    /// World-space center.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth: usize,
    pub collapsed: bool,
    /// Children in the model, hidden ones included. Lets the renderer show
    /// a collapse badge.
    pub child_count: usize,
    pub shape: NodeShape,
    pub presentation_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub start: Point,
    pub end: Point,
}

/// Everything the rendering collaborator needs after a mutation: visible
/// nodes in pre-order and one connector per visible parent-child pair.
///
/// Built from the positions cached on the tree, so a dragged node and its
/// connectors show up where the drag left them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderScene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub bounds: Bounds,
}

impl Default for RenderScene {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            bounds: Bounds::around(Point::ORIGIN, 0.0, 0.0),
        }
    }
}

impl RenderScene {
    /// Nodes without a cached position (never laid out) are left out along
    /// with their edges.
    pub fn build(root: &Node, config: &LayoutConfig) -> Self {
        let mut scene = Self::default();
        let mut bounds: Option<Bounds> = None;
        let mut stack: Vec<(&Node, usize)> = vec![(root, 0)];
        while let Some((node, depth)) = stack.pop() {
            let Some(center) = node.position.map(Point::from) else {
                continue;
            };
            let node_bounds = Bounds::around(center, config.node_width, config.node_height);
            bounds = Some(match bounds {
                Some(acc) => acc.union(node_bounds),
                None => node_bounds,
            });
            scene.nodes.push(SceneNode {
                id: node.id.clone(),
                text: node.text.clone(),
                x: center.x,
                y: center.y,
                width: config.node_width,
                height: config.node_height,
                depth,
                collapsed: node.collapsed,
                child_count: node.children.len(),
                shape: node.shape,
                presentation_hint: node.presentation_hint.clone(),
            });
            if !node.shows_children() {
                continue;
            }
            for child in &node.children {
                if let Some(child_center) = child.position.map(Point::from) {
                    let (start, end) =
                        connector(center, child_center, config.node_width, config.node_height);
                    scene.edges.push(SceneEdge {
                        from: node.id.clone(),
                        to: child.id.clone(),
                        start,
                        end,
                    });
                }
            }
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        if let Some(bounds) = bounds {
            scene.bounds = bounds;
        }
        scene
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id.as_str() == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&SceneEdge> {
        self.edges
            .iter()
            .find(|edge| edge.from.as_str() == from && edge.to.as_str() == to)
    }
}

#[derive(Debug, Serialize)]
pub struct SceneDump {
    pub screen_width: f32,
    pub screen_height: f32,
    pub scale: f32,
    pub offset: Point,
    pub bounds: Bounds,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    #[serde(flatten)]
    pub node: SceneNode,
    pub screen: Point,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    #[serde(flatten)]
    pub edge: SceneEdge,
    pub screen_start: Point,
    pub screen_end: Point,
}

impl SceneDump {
    pub fn new(
        scene: &RenderScene,
        viewport: &ViewportController,
        width: f32,
        height: f32,
    ) -> Self {
        let nodes = scene
            .nodes
            .iter()
            .map(|node| NodeDump {
                screen: viewport.world_to_screen(Point::new(node.x, node.y)),
                node: node.clone(),
            })
            .collect();
        let edges = scene
            .edges
            .iter()
            .map(|edge| EdgeDump {
                screen_start: viewport.world_to_screen(edge.start),
                screen_end: viewport.world_to_screen(edge.end),
                edge: edge.clone(),
            })
            .collect();
        SceneDump {
            screen_width: width,
            screen_height: height,
            scale: viewport.scale(),
            offset: viewport.offset(),
            bounds: scene.bounds,
            nodes,
            edges,
        }
    }
}

/// Pretty JSON to `path`, or to stdout when no path is given.
pub fn write_scene_dump(dump: &SceneDump, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}
