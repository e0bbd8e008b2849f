use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::geometry::Point;
use crate::ir::{IdGenerator, NewNode, Node, NodeId, OutlineNode, ROOT_ID, SequentialIds};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("parent node `{0}` not found")]
    ParentNotFound(NodeId),
    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),
    #[error("label is empty after trimming")]
    InvalidLabel,
    #[error("batch contains no usable labels")]
    EmptyBatch,
    #[error("the root node cannot be deleted")]
    RootDeletionForbidden,
    #[error("node id `{0}` is already in use")]
    DuplicateId(NodeId),
    #[error("root node must use the reserved id `root`, found `{0}`")]
    MisplacedRootId(NodeId),
    #[error("children of `{parent}` would sit deeper than the limit of {limit} levels")]
    DepthLimit { parent: NodeId, limit: usize },
}

/// Deepest level a node may sit at below the root.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Owner of the canonical tree.
///
/// Every mutation validates its inputs before touching the tree, so a
/// failed call leaves the tree exactly as it was and a successful call
/// leaves it consistent: one root, unique ids, no orphans, no node deeper
/// than `max_depth`.
#[derive(Debug)]
pub struct NodeStore {
    root: Node,
    ids: Box<dyn IdGenerator>,
    in_use: HashSet<NodeId>,
    max_depth: usize,
}

impl NodeStore {
    /// Fresh tree holding only a root labeled `topic`.
    pub fn new(topic: &str) -> Result<Self, StoreError> {
        Self::with_id_generator(topic, Box::new(SequentialIds::new()))
    }

    pub fn with_id_generator(topic: &str, ids: Box<dyn IdGenerator>) -> Result<Self, StoreError> {
        let text = clean_label(topic).ok_or(StoreError::InvalidLabel)?;
        let root = Node::new(NodeId::root(), text);
        let mut in_use = HashSet::new();
        in_use.insert(root.id.clone());
        Ok(Self {
            root,
            ids,
            in_use,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Adopt an externally built tree. The root must carry the reserved id,
    /// ids must be unique and the tree must fit within [`DEFAULT_MAX_DEPTH`].
    pub fn from_root(root: Node, ids: Box<dyn IdGenerator>) -> Result<Self, StoreError> {
        if !root.id.is_root() {
            return Err(StoreError::MisplacedRootId(root.id.clone()));
        }
        let mut in_use = HashSet::new();
        for node in root.iter() {
            if !in_use.insert(node.id.clone()) {
                return Err(StoreError::DuplicateId(node.id.clone()));
            }
        }
        if let Some(parent) = too_deep(&root, 0, DEFAULT_MAX_DEPTH) {
            return Err(StoreError::DepthLimit {
                parent: parent.id.clone(),
                limit: DEFAULT_MAX_DEPTH,
            });
        }
        Ok(Self {
            root,
            ids,
            in_use,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Refuse inserts that would put a node deeper than `limit` below the
    /// root. Existing nodes are not checked.
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Replace the whole tree with a fresh root labeled `topic`. The id
    /// generator keeps counting, so ids of the discarded tree never return.
    pub fn reset(&mut self, topic: &str) -> Result<(), StoreError> {
        let text = clean_label(topic).ok_or(StoreError::InvalidLabel)?;
        self.root = Node::new(NodeId::root(), text);
        self.in_use.clear();
        self.in_use.insert(self.root.id.clone());
        debug!(topic = %self.root.text, "reset tree");
        Ok(())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root.id
    }

    /// Copy of the current tree.
    pub fn snapshot(&self) -> Node {
        self.root.clone()
    }

    pub fn len(&self) -> usize {
        self.in_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_use.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.in_use.contains(id)
    }

    /// Depth-first search from the root; first match wins.
    pub fn find(&self, id: &str) -> Option<&Node> {
        find_node(&self.root, id)
    }

    /// Nodes from the root down to `id`, both ends included.
    pub fn path_to(&self, id: &str) -> Option<Vec<&Node>> {
        let mut path = Vec::new();
        if collect_path(&self.root, id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.path_to(id).map(|path| path.len() - 1)
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        let path = self.path_to(id)?;
        let len = path.len();
        if len < 2 { None } else { Some(path[len - 2]) }
    }

    /// Ids of nodes that take part in layout, in pre-order.
    pub fn visible_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node.id.clone());
            if node.shows_children() {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    pub fn insert_child(&mut self, parent_id: &str, draft: NewNode) -> Result<NodeId, StoreError> {
        if !self.contains(parent_id) {
            return Err(StoreError::ParentNotFound(NodeId::from(parent_id)));
        }
        let text = clean_label(&draft.text).ok_or(StoreError::InvalidLabel)?;
        self.check_depth(parent_id, 0)?;
        let mut reserved = HashSet::new();
        let node = self.materialize(text, draft, &mut reserved)?;
        let id = node.id.clone();
        self.attach(parent_id, vec![node], reserved)?;
        Ok(id)
    }

    /// Append several children at once. Blank labels are dropped; if nothing
    /// is left the call fails with [`StoreError::EmptyBatch`] and the tree is
    /// untouched.
    pub fn insert_children<I, D>(
        &mut self,
        parent_id: &str,
        drafts: I,
    ) -> Result<Vec<NodeId>, StoreError>
    where
        I: IntoIterator<Item = D>,
        D: Into<NewNode>,
    {
        if !self.contains(parent_id) {
            return Err(StoreError::ParentNotFound(NodeId::from(parent_id)));
        }
        let mut reserved = HashSet::new();
        let mut nodes = Vec::new();
        for draft in drafts {
            let draft = draft.into();
            let Some(text) = clean_label(&draft.text) else {
                continue;
            };
            nodes.push(self.materialize(text, draft, &mut reserved)?);
        }
        if nodes.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        self.check_depth(parent_id, 0)?;
        let ids = nodes.iter().map(|node| node.id.clone()).collect();
        self.attach(parent_id, nodes, reserved)?;
        Ok(ids)
    }

    /// Insert a nested outline under `parent_id`. Entries with blank labels
    /// are dropped together with their sub-outlines. Returns the ids of the
    /// new direct children.
    pub fn insert_outline(
        &mut self,
        parent_id: &str,
        outline: &[OutlineNode],
    ) -> Result<Vec<NodeId>, StoreError> {
        if !self.contains(parent_id) {
            return Err(StoreError::ParentNotFound(NodeId::from(parent_id)));
        }
        let mut reserved = HashSet::new();
        let nodes = self.materialize_outline(outline, &mut reserved)?;
        if nodes.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        let below = nodes.iter().map(height).max().unwrap_or(0);
        self.check_depth(parent_id, below)?;
        let ids = nodes.iter().map(|node| node.id.clone()).collect();
        self.attach(parent_id, nodes, reserved)?;
        Ok(ids)
    }

    /// Remove `id` and all its descendants. Returns the detached subtree.
    pub fn delete_subtree(&mut self, id: &str) -> Result<Node, StoreError> {
        if id == self.root.id.as_str() {
            return Err(StoreError::RootDeletionForbidden);
        }
        let removed = detach(&mut self.root, id)
            .ok_or_else(|| StoreError::NodeNotFound(NodeId::from(id)))?;
        for node in removed.iter() {
            self.in_use.remove(&node.id);
        }
        debug!(node = id, removed = removed.subtree_len(), "deleted subtree");
        Ok(removed)
    }

    /// Flip `collapsed` and return the new value.
    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool, StoreError> {
        let node = self.node_mut(id)?;
        node.collapsed = !node.collapsed;
        let collapsed = node.collapsed;
        debug!(node = id, collapsed, "toggled collapse");
        Ok(collapsed)
    }

    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) -> Result<(), StoreError> {
        self.node_mut(id)?.collapsed = collapsed;
        Ok(())
    }

    pub fn rename(&mut self, id: &str, text: &str) -> Result<(), StoreError> {
        let text = clean_label(text).ok_or(StoreError::InvalidLabel)?;
        self.node_mut(id)?.text = text;
        Ok(())
    }

    /// Manual override after a drag. Holds until the next layout pass.
    pub fn set_position(&mut self, id: &str, x: f32, y: f32) -> Result<(), StoreError> {
        self.node_mut(id)?.position = Some((x, y));
        Ok(())
    }

    /// Overwrite the cached positions with a fresh layout. Nodes missing
    /// from `positions` (hidden under a collapsed ancestor) lose theirs.
    pub fn apply_positions(&mut self, positions: &BTreeMap<NodeId, Point>) {
        let mut stack = vec![&mut self.root];
        while let Some(node) = stack.pop() {
            node.position = positions.get(&node.id).map(|point| (point.x, point.y));
            stack.extend(node.children.iter_mut());
        }
    }

    /// New children of `parent_id` with `below` further levels under them
    /// must stay within `max_depth`.
    fn check_depth(&self, parent_id: &str, below: usize) -> Result<(), StoreError> {
        let depth = self
            .depth_of(parent_id)
            .ok_or_else(|| StoreError::ParentNotFound(NodeId::from(parent_id)))?;
        if depth + 1 + below > self.max_depth {
            return Err(StoreError::DepthLimit {
                parent: NodeId::from(parent_id),
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, StoreError> {
        find_node_mut(&mut self.root, id).ok_or_else(|| StoreError::NodeNotFound(NodeId::from(id)))
    }

    fn materialize(
        &mut self,
        text: String,
        draft: NewNode,
        reserved: &mut HashSet<NodeId>,
    ) -> Result<Node, StoreError> {
        let id = self.fresh_id(reserved)?;
        let mut node = Node::new(id, text);
        node.shape = draft.shape;
        node.presentation_hint = draft.presentation_hint;
        Ok(node)
    }

    fn materialize_outline(
        &mut self,
        outline: &[OutlineNode],
        reserved: &mut HashSet<NodeId>,
    ) -> Result<Vec<Node>, StoreError> {
        let mut nodes = Vec::new();
        for entry in outline {
            let Some(text) = clean_label(&entry.label) else {
                continue;
            };
            let mut node = Node::new(self.fresh_id(reserved)?, text);
            node.shape = entry.shape;
            node.children = self.materialize_outline(&entry.children, reserved)?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn fresh_id(&mut self, reserved: &mut HashSet<NodeId>) -> Result<NodeId, StoreError> {
        let mut last = None;
        for _ in 0..=self.in_use.len() + reserved.len() {
            let id = self.ids.next_id();
            if id.as_str() != ROOT_ID && !self.in_use.contains(&id) && !reserved.contains(&id) {
                reserved.insert(id.clone());
                return Ok(id);
            }
            last = Some(id);
        }
        Err(StoreError::DuplicateId(last.unwrap_or_else(NodeId::root)))
    }

    fn attach(
        &mut self,
        parent_id: &str,
        nodes: Vec<Node>,
        reserved: HashSet<NodeId>,
    ) -> Result<(), StoreError> {
        let parent = find_node_mut(&mut self.root, parent_id)
            .ok_or_else(|| StoreError::ParentNotFound(NodeId::from(parent_id)))?;
        let added = nodes.len();
        parent.collapsed = false;
        parent.children.extend(nodes);
        self.in_use.extend(reserved);
        debug!(parent = parent_id, added, total = self.in_use.len(), "inserted children");
        Ok(())
    }
}

/// Trimmed label, or `None` when nothing is left.
pub fn clean_label(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn find_node<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
    if node.id.as_str() == id {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_node(child, id))
}

fn find_node_mut<'a>(node: &'a mut Node, id: &str) -> Option<&'a mut Node> {
    if node.id.as_str() == id {
        return Some(node);
    }
    node.children.iter_mut().find_map(|child| find_node_mut(child, id))
}

fn collect_path<'a>(node: &'a Node, id: &str, path: &mut Vec<&'a Node>) -> bool {
    path.push(node);
    if node.id.as_str() == id {
        return true;
    }
    for child in &node.children {
        if collect_path(child, id, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Levels below `node`; a leaf has height 0.
fn height(node: &Node) -> usize {
    node.children.iter().map(|child| height(child) + 1).max().unwrap_or(0)
}

/// First node whose children sit deeper than `limit`.
fn too_deep(node: &Node, depth: usize, limit: usize) -> Option<&Node> {
    if node.children.is_empty() {
        return None;
    }
    if depth + 1 > limit {
        return Some(node);
    }
    node.children
        .iter()
        .find_map(|child| too_deep(child, depth + 1, limit))
}

fn detach(node: &mut Node, id: &str) -> Option<Node> {
    if let Some(idx) = node.children.iter().position(|child| child.id.as_str() == id) {
        return Some(node.children.remove(idx));
    }
    node.children.iter_mut().find_map(|child| detach(child, id))
}
