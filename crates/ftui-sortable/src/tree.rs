//! Rule/group tree model.
//!
//! The tree is an arena of [`NodeRecord`]s keyed by [`NodeId`]. Groups own an
//! ordered list of child IDs; every non-root node records its parent. A node's
//! position is its index in the parent's child list and is never stored.
//!
//! # Invariants
//!
//! 1. The root is always a group with no parent and can never be moved or
//!    detached.
//! 2. Every non-root node appears in exactly one group's child list, and its
//!    `parent` names that group.
//! 3. No node is its own ancestor.
//!
//! All mutators validate first and only then touch the arena, so an `Err`
//! leaves the tree exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::RelocationError;
use crate::resolver::RelocationPlan;

/// Stable identifier for tree nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct NodeId(u64);

impl NodeId {
    /// Lowest valid node ID, used for the root group.
    pub const MIN: Self = Self(1);

    /// Create a node ID, rejecting 0.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or `None` on overflow.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl TryFrom<u64> for NodeId {
    type Error = IntegrityError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(IntegrityError::ZeroNodeId)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Leaf holding a single condition.
    Rule,
    /// Ordered container of rules and groups.
    Group,
    /// Transient marker at the candidate drop position of an active drag.
    Placeholder,
}

bitflags! {
    /// Per-node interaction flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        /// The node may not be dragged.
        const NO_SORTABLE = 0b01;
        /// The node may not accept a drop onto or into it.
        const NO_DROP     = 0b10;
    }
}

impl NodeFlags {
    /// Whether dragging this node is forbidden.
    #[must_use]
    pub const fn no_sortable(self) -> bool {
        self.contains(Self::NO_SORTABLE)
    }

    /// Whether dropping onto this node is forbidden.
    #[must_use]
    pub const fn no_drop(self) -> bool {
        self.contains(Self::NO_DROP)
    }
}

/// One node stored in a [`RuleTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    id: NodeId,
    parent: Option<NodeId>,
    kind: NodeKind,
    flags: NodeFlags,
    visible: bool,
    children: Vec<NodeId>,
}

impl NodeRecord {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Owning group, or `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the rendered view should show this node.
    ///
    /// A dragged node is hidden but stays in place until the drop commits.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Ordered child IDs (always empty for rules and placeholders).
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }
}

/// An owned subtree that is not part of any tree.
///
/// Built with [`DetachedNode::rule`] / [`DetachedNode::group`] for new nodes,
/// or returned by [`RuleTree::detach`]. Re-attaching a detached subtree keeps
/// its node IDs.
#[derive(Debug, PartialEq, Eq)]
pub struct DetachedNode {
    id: Option<NodeId>,
    kind: NodeKind,
    flags: NodeFlags,
    visible: bool,
    children: Vec<DetachedNode>,
}

impl DetachedNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            kind,
            flags: NodeFlags::empty(),
            visible: true,
            children: Vec::new(),
        }
    }

    /// A new rule with no flags.
    #[must_use]
    pub fn rule() -> Self {
        Self::new(NodeKind::Rule)
    }

    /// A new, empty group with no flags.
    #[must_use]
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub(crate) fn placeholder() -> Self {
        Self::new(NodeKind::Placeholder)
    }

    /// Set the node's own declared flags.
    #[must_use]
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Append a child node.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a group.
    #[must_use]
    pub fn child(mut self, node: DetachedNode) -> Self {
        assert!(
            self.kind == NodeKind::Group,
            "only groups can hold children"
        );
        self.children.push(node);
        self
    }

    /// ID the node had before it was detached, if any.
    #[must_use]
    pub const fn id(&self) -> Option<NodeId> {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    #[must_use]
    pub fn children(&self) -> &[DetachedNode] {
        &self.children
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(DetachedNode::subtree_len)
            .sum::<usize>()
    }
}

/// Structural problems reported by [`RuleTree::validate`], plus the zero id
/// rejected when a [`NodeId`] is deserialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    ZeroNodeId,
    MissingRoot { root: NodeId },
    RootNotGroup { root: NodeId },
    RootHasParent { root: NodeId, parent: NodeId },
    MissingChild { parent: NodeId, child: NodeId },
    ParentMismatch {
        node_id: NodeId,
        expected: NodeId,
        actual: Option<NodeId>,
    },
    ChildrenOnLeaf { node_id: NodeId },
    CycleDetected { node_id: NodeId },
    UnreachableNode { node_id: NodeId },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroNodeId => write!(f, "node id 0 is invalid"),
            Self::MissingRoot { root } => write!(f, "root node {} not found", root.0),
            Self::RootNotGroup { root } => write!(f, "root node {} is not a group", root.0),
            Self::RootHasParent { root, parent } => {
                write!(f, "root node {} must not have parent {}", root.0, parent.0)
            }
            Self::MissingChild { parent, child } => write!(
                f,
                "group {} references missing child {}",
                parent.0, child.0
            ),
            Self::ParentMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "node {} should have parent {} but has {:?}",
                node_id.0,
                expected.0,
                actual.map(NodeId::get)
            ),
            Self::ChildrenOnLeaf { node_id } => {
                write!(f, "non-group node {} has children", node_id.0)
            }
            Self::CycleDetected { node_id } => write!(f, "cycle detected at node {}", node_id.0),
            Self::UnreachableNode { node_id } => {
                write!(f, "node {} is not reachable from root", node_id.0)
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

/// Ordered rule/group tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTree {
    root: NodeId,
    next_id: NodeId,
    nodes: BTreeMap<NodeId, NodeRecord>,
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTree {
    /// Build a tree holding only an empty root group.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root_flags(NodeFlags::empty())
    }

    /// Build a tree whose root group carries `flags`.
    #[must_use]
    pub fn with_root_flags(flags: NodeFlags) -> Self {
        let root = NodeId::MIN;
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(
            root,
            NodeRecord {
                id: root,
                parent: None,
                kind: NodeKind::Group,
                flags,
                visible: true,
                children: Vec::new(),
            },
        );
        Self {
            root,
            next_id: root.checked_next().unwrap_or(root),
            nodes,
        }
    }

    /// Root group ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Lookup a node by ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, root and placeholder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Children of `id`; empty if `id` is missing or not a group.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Index of `id` among its siblings.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Nesting level: the root is level 1, its children level 2, and so on.
    #[must_use]
    pub fn level(&self, id: NodeId) -> Option<usize> {
        let mut level = 1;
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
            level += 1;
            if level > self.nodes.len() {
                return None;
            }
        }
        Some(level)
    }

    /// True if `ancestor` is `node` or lies on `node`'s parent chain.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.parent(id);
        }
        false
    }

    /// Pre-order list of `id` and all of its descendants.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Replace a node's flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<(), RelocationError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(RelocationError::MissingNode { node_id: id })?;
        node.flags = flags;
        Ok(())
    }

    /// Show or hide a node in the rendered view. Structure is unaffected.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), RelocationError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(RelocationError::MissingNode { node_id: id })?;
        node.visible = visible;
        Ok(())
    }

    /// Insert a detached subtree into `into` at child index `at`.
    ///
    /// Returns the ID of the subtree's root. IDs carried by a previously
    /// detached subtree are kept unless they collide with a live node.
    pub fn attach(
        &mut self,
        node: DetachedNode,
        into: NodeId,
        at: usize,
    ) -> Result<NodeId, RelocationError> {
        let len = self.group(into)?.children.len();
        if at > len {
            return Err(RelocationError::IndexOutOfBounds {
                group: into,
                index: at,
                len,
            });
        }
        let id = self.insert_subtree(node, into);
        if let Some(group) = self.nodes.get_mut(&into) {
            group.children.insert(at, id);
        }
        Ok(id)
    }

    /// Remove `id` and its subtree from the tree.
    pub fn detach(&mut self, id: NodeId) -> Result<DetachedNode, RelocationError> {
        let parent = self
            .nodes
            .get(&id)
            .ok_or(RelocationError::MissingNode { node_id: id })?
            .parent
            .ok_or(RelocationError::CannotDetachRoot { node_id: id })?;
        self.unlink(id, parent);
        self.take_subtree(id)
            .ok_or(RelocationError::MissingNode { node_id: id })
    }

    /// Move `node` to sit immediately after `sibling`, in `sibling`'s group.
    pub fn move_after(&mut self, node: NodeId, sibling: NodeId) -> Result<(), RelocationError> {
        self.check_movable(node, sibling)?;
        let group = self
            .parent(sibling)
            .ok_or(RelocationError::AnchorIsRoot { anchor: sibling })?;
        self.relink(node, group, |tree| {
            tree.children(group)
                .iter()
                .position(|child| *child == sibling)
                .map_or(0, |index| index + 1)
        });
        Ok(())
    }

    /// Move `node` to be the first child of `group`.
    pub fn move_at_beginning(&mut self, node: NodeId, group: NodeId) -> Result<(), RelocationError> {
        self.check_movable(node, group)?;
        self.group(group)?;
        self.relink(node, group, |_| 0);
        Ok(())
    }

    /// Move `node` to be the last child of `group`.
    pub fn move_at_end(&mut self, node: NodeId, group: NodeId) -> Result<(), RelocationError> {
        self.check_movable(node, group)?;
        self.group(group)?;
        self.relink(node, group, |tree| tree.children(group).len());
        Ok(())
    }

    /// Apply a resolved relocation plan to `node`.
    pub fn relocate(&mut self, node: NodeId, plan: RelocationPlan) -> Result<(), RelocationError> {
        match plan {
            RelocationPlan::InsertAfter(sibling) => self.move_after(node, sibling),
            RelocationPlan::InsertAtBeginning(group) => self.move_at_beginning(node, group),
            RelocationPlan::InsertAtEnd(group) => self.move_at_end(node, group),
        }
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or(IntegrityError::MissingRoot { root: self.root })?;
        if !root.is_group() {
            return Err(IntegrityError::RootNotGroup { root: self.root });
        }
        if let Some(parent) = root.parent {
            return Err(IntegrityError::RootHasParent {
                root: self.root,
                parent,
            });
        }

        let mut visited = BTreeSet::new();
        let _ = visited.insert(self.root);
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if !node.is_group() && !node.children.is_empty() {
                return Err(IntegrityError::ChildrenOnLeaf { node_id: current });
            }
            for child in &node.children {
                let record = self.nodes.get(child).ok_or(IntegrityError::MissingChild {
                    parent: current,
                    child: *child,
                })?;
                if record.parent != Some(current) {
                    return Err(IntegrityError::ParentMismatch {
                        node_id: *child,
                        expected: current,
                        actual: record.parent,
                    });
                }
                if !visited.insert(*child) {
                    return Err(IntegrityError::CycleDetected { node_id: *child });
                }
                stack.push(*child);
            }
        }

        if let Some(orphan) = self.nodes.keys().find(|id| !visited.contains(id)) {
            return Err(IntegrityError::UnreachableNode { node_id: *orphan });
        }
        Ok(())
    }

    /// Deterministic hash of structure and flags (visibility excluded).
    ///
    /// Two trees with the same hash have the same parent, order, kind, and
    /// flags for every node.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                *hash ^= u64::from(*byte);
                *hash = hash.wrapping_mul(PRIME);
            }
        }

        let mut hash = OFFSET_BASIS;
        for id in self.descendants(self.root) {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            mix_bytes(&mut hash, &id.0.to_le_bytes());
            mix_bytes(
                &mut hash,
                &node.parent.map_or(0, NodeId::get).to_le_bytes(),
            );
            let kind = match node.kind {
                NodeKind::Rule => 1u8,
                NodeKind::Group => 2,
                NodeKind::Placeholder => 3,
            };
            mix_bytes(&mut hash, &[kind, node.flags.bits()]);
            mix_bytes(&mut hash, &(node.children.len() as u64).to_le_bytes());
        }
        hash
    }

    fn group(&self, id: NodeId) -> Result<&NodeRecord, RelocationError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(RelocationError::MissingNode { node_id: id })?;
        if !node.is_group() {
            return Err(RelocationError::NotAGroup { node_id: id });
        }
        Ok(node)
    }

    fn check_movable(&self, node: NodeId, anchor: NodeId) -> Result<(), RelocationError> {
        if !self.contains(node) {
            return Err(RelocationError::MissingNode { node_id: node });
        }
        if node == self.root {
            return Err(RelocationError::CannotMoveRoot { node_id: node });
        }
        if !self.contains(anchor) {
            return Err(RelocationError::MissingNode { node_id: anchor });
        }
        if node == anchor {
            return Err(RelocationError::SameNode { node_id: node });
        }
        if self.is_ancestor_or_self(node, anchor) {
            return Err(RelocationError::AncestorConflict {
                ancestor: node,
                descendant: anchor,
            });
        }
        Ok(())
    }

    /// Unlink `node` from its parent and insert it into `group` at the index
    /// computed after unlinking.
    fn relink(&mut self, node: NodeId, group: NodeId, index: impl FnOnce(&Self) -> usize) {
        if let Some(parent) = self.parent(node) {
            self.unlink(node, parent);
        }
        let at = index(self);
        if let Some(target) = self.nodes.get_mut(&group) {
            let at = at.min(target.children.len());
            target.children.insert(at, node);
        }
        if let Some(record) = self.nodes.get_mut(&node) {
            record.parent = Some(group);
        }
    }

    fn unlink(&mut self, node: NodeId, parent: NodeId) {
        if let Some(group) = self.nodes.get_mut(&parent) {
            group.children.retain(|child| *child != node);
        }
        if let Some(record) = self.nodes.get_mut(&node) {
            record.parent = None;
        }
    }

    fn allocate(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id = id.checked_next().unwrap_or(id);
        id
    }

    fn insert_subtree(&mut self, node: DetachedNode, parent: NodeId) -> NodeId {
        let id = match node.id {
            Some(id) if !self.nodes.contains_key(&id) => {
                if id >= self.next_id {
                    self.next_id = id.checked_next().unwrap_or(id);
                }
                id
            }
            _ => self.allocate(),
        };
        let _ = self.nodes.insert(
            id,
            NodeRecord {
                id,
                parent: Some(parent),
                kind: node.kind,
                flags: node.flags,
                visible: node.visible,
                children: Vec::with_capacity(node.children.len()),
            },
        );
        for child in node.children {
            let child_id = self.insert_subtree(child, id);
            if let Some(record) = self.nodes.get_mut(&id) {
                record.children.push(child_id);
            }
        }
        id
    }

    fn take_subtree(&mut self, id: NodeId) -> Option<DetachedNode> {
        let record = self.nodes.remove(&id)?;
        let children = record
            .children
            .iter()
            .filter_map(|child| self.take_subtree(*child))
            .collect();
        Some(DetachedNode {
            id: Some(record.id),
            kind: record.kind,
            flags: record.flags,
            visible: record.visible,
            children,
        })
    }
}
