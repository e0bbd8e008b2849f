use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Reserved id of the root node of every map.
pub const ROOT_ID: &str = "root";

/// Identity of a node, unique within one tree and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque shape token handed to the renderer. Layout ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    #[default]
    Default,
    Rectangle,
    RoundRect,
    Circle,
    Hexagon,
    Cloud,
    Bang,
}

/// One labeled entry of the mind map. Children are owned exclusively by
/// their parent, so the structure is a strict tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub text: String,
    pub children: Vec<Node>,
    pub collapsed: bool,
    /// Last computed (or dragged) position; `None` until the first layout.
    pub position: Option<(f32, f32)>,
    pub shape: NodeShape,
    pub presentation_hint: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            children: Vec::new(),
            collapsed: false,
            position: None,
            shape: NodeShape::Default,
            presentation_hint: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True when this node's children take part in layout and rendering.
    pub fn shows_children(&self) -> bool {
        !self.collapsed && !self.children.is_empty()
    }

    /// Pre-order walk over this node and all descendants, collapsed or not.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn subtree_len(&self) -> usize {
        self.iter().count()
    }
}

#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Label plus style tokens for a node that does not exist yet. The store
/// assigns the id when the draft is inserted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewNode {
    pub text: String,
    pub shape: NodeShape,
    pub presentation_hint: Option<String>,
}

impl NewNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.presentation_hint = Some(hint.into());
        self
    }
}

impl From<&str> for NewNode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NewNode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Nested label structure, as produced by an outline or a text-generation
/// response. Converted into [`Node`]s by the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlineNode {
    pub label: String,
    #[serde(default)]
    pub shape: NodeShape,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shape: NodeShape::Default,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    /// Number of entries in this outline subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::count).sum::<usize>()
    }
}

/// Supplies ids for new nodes. Injected into the store so tests can use a
/// deterministic sequence.
pub trait IdGenerator: fmt::Debug + Send {
    fn next_id(&mut self) -> NodeId;
}

/// Monotonic counter ids: `n1`, `n2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::with_prefix("n")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}
