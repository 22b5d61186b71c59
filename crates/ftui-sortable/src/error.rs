//! Error types for tree relocation and engine setup.

use std::fmt;

use crate::provider::ProviderCapabilities;
use crate::tree::NodeId;

/// Structured reasons a tree mutation was refused.
///
/// Every mutator validates before touching the tree, so a returned
/// `RelocationError` always means the tree is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationError {
    MissingNode {
        node_id: NodeId,
    },
    NotAGroup {
        node_id: NodeId,
    },
    CannotMoveRoot {
        node_id: NodeId,
    },
    CannotDetachRoot {
        node_id: NodeId,
    },
    AnchorIsRoot {
        anchor: NodeId,
    },
    SameNode {
        node_id: NodeId,
    },
    AncestorConflict {
        ancestor: NodeId,
        descendant: NodeId,
    },
    IndexOutOfBounds {
        group: NodeId,
        index: usize,
        len: usize,
    },
    IntoDraggedSubtree {
        source: NodeId,
        anchor: NodeId,
    },
    NodeInActiveDrag {
        node_id: NodeId,
    },
}

impl fmt::Display for RelocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode { node_id } => write!(f, "node {} not found", node_id.get()),
            Self::NotAGroup { node_id } => write!(f, "node {} is not a group", node_id.get()),
            Self::CannotMoveRoot { node_id } => {
                write!(f, "cannot move root group {}", node_id.get())
            }
            Self::CannotDetachRoot { node_id } => {
                write!(f, "cannot detach root group {}", node_id.get())
            }
            Self::AnchorIsRoot { anchor } => {
                write!(f, "root group {} has no siblings to insert after", anchor.get())
            }
            Self::SameNode { node_id } => {
                write!(f, "node {} cannot be placed relative to itself", node_id.get())
            }
            Self::AncestorConflict {
                ancestor,
                descendant,
            } => write!(
                f,
                "relocation would create cycle: node {} is an ancestor of {}",
                ancestor.get(),
                descendant.get()
            ),
            Self::IndexOutOfBounds { group, index, len } => write!(
                f,
                "index {index} out of bounds for group {} with {len} children",
                group.get()
            ),
            Self::IntoDraggedSubtree { source, anchor } => write!(
                f,
                "anchor {} lies inside dragged node {}",
                anchor.get(),
                source.get()
            ),
            Self::NodeInActiveDrag { node_id } => {
                write!(f, "node {} is part of the active drag", node_id.get())
            }
        }
    }
}

impl std::error::Error for RelocationError {}

/// Top-level error for engine setup and structural edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortableError {
    /// A tree mutation was refused; the tree is unchanged.
    InvalidRelocation(RelocationError),
    /// The interaction provider cannot deliver gestures the engine needs.
    MissingCapability { missing: ProviderCapabilities },
    /// No interaction provider was supplied at setup.
    MissingProvider,
}

impl fmt::Display for SortableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRelocation(err) => write!(f, "invalid relocation: {err}"),
            Self::MissingCapability { missing } => {
                write!(f, "interaction provider lacks capabilities {missing:?}")
            }
            Self::MissingProvider => write!(f, "sortable requires an interaction provider"),
        }
    }
}

impl std::error::Error for SortableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::InvalidRelocation(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<RelocationError> for SortableError {
    fn from(err: RelocationError) -> Self {
        Self::InvalidRelocation(err)
    }
}
