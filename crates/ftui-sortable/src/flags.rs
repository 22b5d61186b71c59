//! Attach-time inheritance of `no_sortable` / `no_drop` from parent groups.
//!
//! Inheritance only ever adds restrictions: a child may declare itself
//! stricter than its parent, but an inherited flag is never cleared. It runs
//! once when a node enters the tree; moving a node later does not re-run it.

use crate::config::SortableConfig;
use crate::tree::NodeFlags;

/// Which flags propagate from a parent group to newly attached children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InheritancePolicy {
    pub no_sortable: bool,
    pub no_drop: bool,
}

impl Default for InheritancePolicy {
    fn default() -> Self {
        Self {
            no_sortable: true,
            no_drop: true,
        }
    }
}

impl InheritancePolicy {
    /// Policy matching the `inherit_*` options of a config.
    #[must_use]
    pub const fn from_config(config: &SortableConfig) -> Self {
        Self {
            no_sortable: config.inherit_no_sortable,
            no_drop: config.inherit_no_drop,
        }
    }

    /// Flags this policy lets flow from parent to child.
    #[must_use]
    pub const fn inherited(self) -> NodeFlags {
        let mut flags = NodeFlags::empty();
        if self.no_sortable {
            flags = flags.union(NodeFlags::NO_SORTABLE);
        }
        if self.no_drop {
            flags = flags.union(NodeFlags::NO_DROP);
        }
        flags
    }
}

/// Resolve the effective flags of a node attached under `parent`.
///
/// Pure and idempotent: `inherit_flags(inherit_flags(n, p, x), p, x)` equals
/// `inherit_flags(n, p, x)`. A root node (no parent) keeps its own flags.
#[must_use]
pub fn inherit_flags(
    node: NodeFlags,
    parent: Option<NodeFlags>,
    policy: InheritancePolicy,
) -> NodeFlags {
    match parent {
        Some(parent) => node | (parent & policy.inherited()),
        None => node,
    }
}
