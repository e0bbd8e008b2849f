#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod generator;
pub mod geometry;
pub mod ir;
pub mod layout;
pub mod parser;
pub mod scene;
pub mod store;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutAlgorithm, load_config};
pub use controller::{ErrorKind, ExpandOutcome, GenerationState, MindMapController, MindMapError};
pub use geometry::Point;
pub use ir::{Node, NodeId, OutlineNode};
pub use layout::{Layout, LayoutEngine, compute_layout};
pub use store::{NodeStore, StoreError};
pub use viewport::ViewportController;
