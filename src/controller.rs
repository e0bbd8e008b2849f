use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig, LayoutAlgorithm, ViewportConfig};
use crate::generator::{
    GeneratedContent, GenerationCache, GenerationRequest, GeneratorError, TextGenerator,
    fallback_outline, normalize,
};
use crate::geometry::Point;
use crate::ir::{IdGenerator, NewNode, Node, NodeId, OutlineNode, SequentialIds};
use crate::layout::{Layout, LayoutEngine, LayoutError};
use crate::scene::RenderScene;
use crate::store::{NodeStore, StoreError, clean_label};
use crate::viewport::ViewportController;

#[derive(Debug, Error)]
pub enum MindMapError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("generation for node `{node}` failed: {source}")]
    Generation { node: NodeId, source: GeneratorError },
    #[error("node `{0}` already has a generation request in flight")]
    GenerationPending(NodeId),
    #[error("topic is empty")]
    InvalidTopic,
}

/// Coarse classification used to decide how a failure is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    RootProtected,
    CollaboratorFailure,
    MalformedTree,
}

impl MindMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(StoreError::ParentNotFound(_) | StoreError::NodeNotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Store(
                StoreError::InvalidLabel | StoreError::EmptyBatch | StoreError::DepthLimit { .. },
            ) => ErrorKind::InvalidInput,
            Self::Store(StoreError::RootDeletionForbidden) => ErrorKind::RootProtected,
            Self::Store(StoreError::DuplicateId(_) | StoreError::MisplacedRootId(_))
            | Self::Layout(_) => ErrorKind::MalformedTree,
            Self::Generation { .. } => ErrorKind::CollaboratorFailure,
            Self::GenerationPending(_) | Self::InvalidTopic => ErrorKind::InvalidInput,
        }
    }

    /// Everything except a malformed tree is a recoverable, no-op failure.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::MalformedTree
    }
}

/// Per-node progress of an expand intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GenerationState {
    #[default]
    Idle,
    AwaitingGeneration,
    Applied,
    Failed,
}

/// Handle for one in-flight expand. Only the newest ticket of a node is
/// honored when the response comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    serial: u64,
    request: GenerationRequest,
}

impl GenerationTicket {
    pub fn node_id(&self) -> &NodeId {
        &self.request.node_id
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpandOutcome {
    Applied {
        node: NodeId,
        inserted: Vec<NodeId>,
        used_fallback: bool,
        from_cache: bool,
    },
    /// The response no longer matches a pending request, typically because
    /// the node was deleted while waiting. Nothing was inserted.
    Discarded { node: NodeId },
}

/// Single owner of a mind map: applies intents to the store, re-runs the
/// layout after each logical change and republishes the render scene.
#[derive(Debug)]
pub struct MindMapController {
    store: NodeStore,
    engine: LayoutEngine,
    generation: GenerationConfig,
    viewport_config: ViewportConfig,
    viewport: ViewportController,
    anchor: Point,
    layout: Layout,
    scene: RenderScene,
    pending: HashMap<NodeId, u64>,
    states: HashMap<NodeId, GenerationState>,
    cache: GenerationCache,
    batch_depth: usize,
    dirty: bool,
    next_serial: u64,
    revision: u64,
}

impl MindMapController {
    /// Seed a new map whose only node is `topic`.
    pub fn new(topic: &str, config: Config) -> Result<Self, MindMapError> {
        Self::with_id_generator(topic, config, Box::new(SequentialIds::new()))
    }

    pub fn with_id_generator(
        topic: &str,
        config: Config,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, MindMapError> {
        let topic = clean_label(topic).ok_or(MindMapError::InvalidTopic)?;
        let store =
            NodeStore::with_id_generator(&topic, ids)?.with_max_depth(config.layout.max_depth);
        let engine = LayoutEngine::new(config.layout);
        let anchor = Point::ORIGIN;
        let layout = engine.compute(store.root(), anchor)?;
        let mut controller = Self {
            store,
            engine,
            generation: config.generation,
            viewport: ViewportController::from_config(&config.viewport),
            viewport_config: config.viewport,
            anchor,
            layout,
            scene: RenderScene::default(),
            pending: HashMap::new(),
            states: HashMap::new(),
            cache: GenerationCache::new(),
            batch_depth: 0,
            dirty: false,
            next_serial: 1,
            revision: 0,
        };
        controller.relayout()?;
        info!(topic = %topic, "seeded mind map");
        Ok(controller)
    }

    /// Throw the current tree away and start over from `topic`. Pending
    /// generation requests become stale; cached responses are kept.
    pub fn regenerate(&mut self, topic: &str) -> Result<(), MindMapError> {
        let topic = clean_label(topic).ok_or(MindMapError::InvalidTopic)?;
        self.store.reset(&topic)?;
        self.pending.clear();
        self.states.clear();
        info!(topic = %topic, "regenerated mind map");
        self.structural_change()
    }

    /// Insert a nested outline for the topic under the root.
    pub fn seed_outline(&mut self, outline: &[OutlineNode]) -> Result<Vec<NodeId>, MindMapError> {
        let root = self.store.root_id().clone();
        let inserted = self.store.insert_outline(root.as_str(), outline)?;
        info!(entries = inserted.len(), "seeded outline under root");
        self.structural_change()?;
        Ok(inserted)
    }

    pub fn add_child(
        &mut self,
        parent: &str,
        draft: impl Into<NewNode>,
    ) -> Result<NodeId, MindMapError> {
        let id = self.store.insert_child(parent, draft.into())?;
        self.structural_change()?;
        Ok(id)
    }

    pub fn add_children<I, D>(
        &mut self,
        parent: &str,
        drafts: I,
    ) -> Result<Vec<NodeId>, MindMapError>
    where
        I: IntoIterator<Item = D>,
        D: Into<NewNode>,
    {
        let ids = self.store.insert_children(parent, drafts)?;
        self.structural_change()?;
        Ok(ids)
    }

    /// Label change only; sizes are fixed so positions stay as they are.
    pub fn rename(&mut self, id: &str, text: &str) -> Result<(), MindMapError> {
        self.store.rename(id, text)?;
        self.rebuild_scene();
        Ok(())
    }

    /// Delete a subtree. Requests pending for any removed node are dropped,
    /// so their responses will be discarded.
    pub fn delete(&mut self, id: &str) -> Result<Node, MindMapError> {
        let removed = self.store.delete_subtree(id)?;
        for node in removed.iter() {
            self.pending.remove(&node.id);
            self.states.remove(&node.id);
        }
        self.structural_change()?;
        Ok(removed)
    }

    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool, MindMapError> {
        let collapsed = self.store.toggle_collapse(id)?;
        self.structural_change()?;
        Ok(collapsed)
    }

    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) -> Result<(), MindMapError> {
        self.store.set_collapsed(id, collapsed)?;
        self.structural_change()
    }

    /// Record where a node was dropped. The position holds until the next
    /// structural change re-runs the layout.
    pub fn drag_to(&mut self, id: &str, world: Point) -> Result<(), MindMapError> {
        self.store.set_position(id, world.x, world.y)?;
        debug!(node = id, x = world.x, y = world.y, "dragged node");
        self.rebuild_scene();
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: LayoutAlgorithm) -> Result<(), MindMapError> {
        let mut config = self.engine.config().clone();
        config.algorithm = algorithm;
        self.engine.set_config(config);
        self.structural_change()
    }

    pub fn set_anchor(&mut self, anchor: Point) -> Result<(), MindMapError> {
        self.anchor = anchor;
        self.structural_change()
    }

    /// Start an expand: the node moves to `AwaitingGeneration` and the
    /// returned ticket carries the request for the collaborator. A node
    /// that is already waiting rejects a second request.
    pub fn begin_expand(&mut self, id: &str) -> Result<GenerationTicket, MindMapError> {
        let path = self
            .store
            .path_to(id)
            .ok_or_else(|| StoreError::NodeNotFound(NodeId::from(id)))?;
        let node_id = path
            .last()
            .map(|node| node.id.clone())
            .unwrap_or_else(|| NodeId::from(id));
        if self.pending.contains_key(&node_id) {
            return Err(MindMapError::GenerationPending(node_id));
        }
        let request = GenerationRequest {
            node_id: node_id.clone(),
            label: path.last().map(|node| node.text.clone()).unwrap_or_default(),
            topic: self.store.root().text.clone(),
            path: path.iter().map(|node| node.text.clone()).collect(),
            max_children: self.generation.max_children,
        };
        let serial = self.next_serial;
        self.next_serial += 1;
        self.pending.insert(node_id.clone(), serial);
        self.states
            .insert(node_id.clone(), GenerationState::AwaitingGeneration);
        debug!(node = %node_id, serial, "awaiting generation");
        Ok(GenerationTicket { serial, request })
    }

    /// Apply the collaborator's answer for `ticket`.
    ///
    /// An error moves the node to `Failed` and inserts nothing. A response
    /// with no usable labels is replaced by the fallback labels.
    pub fn complete_expand(
        &mut self,
        ticket: GenerationTicket,
        response: Result<GeneratedContent, GeneratorError>,
    ) -> Result<ExpandOutcome, MindMapError> {
        let node = ticket.request.node_id.clone();
        if self.pending.get(&node) != Some(&ticket.serial) {
            warn!(node = %node, serial = ticket.serial, "discarding stale generation response");
            return Ok(ExpandOutcome::Discarded { node });
        }
        self.pending.remove(&node);
        if !self.store.contains(node.as_str()) {
            self.states.remove(&node);
            warn!(node = %node, "discarding generation response for a deleted node");
            return Ok(ExpandOutcome::Discarded { node });
        }
        let content = match response {
            Ok(content) => content,
            Err(source) => {
                self.states.insert(node.clone(), GenerationState::Failed);
                warn!(node = %node, error = %source, "generation failed");
                return Err(MindMapError::Generation { node, source });
            }
        };
        let outline = normalize(content, &self.generation, Some(&ticket.request.label));
        if self.generation.cache_responses && !outline.is_empty() {
            self.cache.insert(&ticket.request.label, outline.clone());
        }
        self.apply_generated(node, outline, false)
    }

    /// Expand synchronously with `generator`, answering from the cache
    /// when the same label was expanded before.
    pub fn expand_with<G>(
        &mut self,
        id: &str,
        generator: &mut G,
    ) -> Result<ExpandOutcome, MindMapError>
    where
        G: TextGenerator + ?Sized,
    {
        let ticket = self.begin_expand(id)?;
        if self.generation.cache_responses {
            if let Some(cached) = self.cache.get(&ticket.request.label) {
                let outline = cached.to_vec();
                let node = ticket.request.node_id.clone();
                self.pending.remove(&node);
                debug!(node = %node, "answered expand from cache");
                return self.apply_generated(node, outline, true);
            }
        }
        let response = generator.generate(&ticket.request);
        self.complete_expand(ticket, response)
    }

    pub fn generation_state(&self, id: &str) -> GenerationState {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// Defer re-layout until the matching [`commit`](Self::commit).
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch. The outermost commit re-runs the layout if anything
    /// changed inside it.
    pub fn commit(&mut self) -> Result<(), MindMapError> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && self.dirty {
            self.relayout()
        } else {
            Ok(())
        }
    }

    /// Recompute the layout, write positions back to the tree and rebuild
    /// the scene. Manual drag positions are overwritten.
    pub fn relayout(&mut self) -> Result<(), MindMapError> {
        let layout = self.engine.compute(self.store.root(), self.anchor)?;
        self.store.apply_positions(&layout.positions());
        self.layout = layout;
        self.dirty = false;
        self.rebuild_scene();
        Ok(())
    }

    /// Fit the current scene into a `width × height` screen area.
    pub fn fit_view(&mut self, width: f32, height: f32) {
        let padding = self.viewport_config.fit_padding;
        self.viewport
            .fit_bounds(self.scene.bounds, width, height, padding);
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn root(&self) -> &Node {
        self.store.root()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn scene(&self) -> &RenderScene {
        &self.scene
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    /// Bumped every time a new scene is published.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// First node with exactly this label, in pre-order.
    pub fn find_by_label(&self, label: &str) -> Option<&Node> {
        self.store.root().iter().find(|node| node.text == label)
    }

    fn apply_generated(
        &mut self,
        node: NodeId,
        outline: Vec<OutlineNode>,
        from_cache: bool,
    ) -> Result<ExpandOutcome, MindMapError> {
        let (outline, used_fallback) = if outline.is_empty() {
            warn!(node = %node, "generation produced no usable labels, using fallback");
            (fallback_outline(&self.generation), true)
        } else {
            (outline, false)
        };
        match self.store.insert_outline(node.as_str(), &outline) {
            Ok(inserted) => {
                self.states.insert(node.clone(), GenerationState::Applied);
                self.structural_change()?;
                Ok(ExpandOutcome::Applied {
                    node,
                    inserted,
                    used_fallback,
                    from_cache,
                })
            }
            Err(err) => {
                self.states.insert(node, GenerationState::Failed);
                Err(err.into())
            }
        }
    }

    fn structural_change(&mut self) -> Result<(), MindMapError> {
        self.dirty = true;
        if self.batch_depth == 0 {
            self.relayout()
        } else {
            Ok(())
        }
    }

    fn rebuild_scene(&mut self) {
        self.scene = RenderScene::build(self.store.root(), self.engine.config());
        self.revision += 1;
    }
}
