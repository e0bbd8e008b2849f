use thiserror::Error;

use crate::ir::NodeId;

/// Raised only for trees that break the store's invariants. Both variants
/// mean the tree is malformed; layout stops instead of looping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("malformed tree: node id `{0}` appears more than once")]
    DuplicateId(NodeId),
    #[error("malformed tree: node `{id}` is deeper than the limit of {limit} levels")]
    DepthExceeded { id: NodeId, limit: usize },
}
