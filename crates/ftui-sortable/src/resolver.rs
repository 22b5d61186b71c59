//! Drop target resolution.
//!
//! A [`PointerRegion`] is what the rendering layer reports under the pointer:
//! the chain of rendered regions containing it, innermost first. [`resolve`]
//! turns that chain into a [`RelocationPlan`] with a fixed priority, because
//! regions nest (a group header sits inside its group body) and several of
//! them contain the pointer at once:
//!
//! 1. any rule body in the chain: insert after that rule;
//! 2. else any group header: insert at the beginning of that group;
//! 3. else any group body: insert at the end of that group;
//! 4. else no relocation.
//!
//! Regions of `no_drop` nodes are never registered as drop surfaces, so they
//! are not expected here and are not re-checked.

use serde::{Deserialize, Serialize};

use crate::tree::NodeId;

/// Kind of rendered region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Body of a rule (leaf).
    RuleBody,
    /// Header strip of a group.
    GroupHeader,
    /// Container of a group, header excluded.
    GroupBody,
}

/// One rendered region hit by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionHit {
    pub kind: RegionKind,
    /// Node the region belongs to, if the renderer could tell.
    pub node: Option<NodeId>,
}

impl RegionHit {
    #[must_use]
    pub const fn new(kind: RegionKind, node: NodeId) -> Self {
        Self {
            kind,
            node: Some(node),
        }
    }

    /// A region whose owning node is unknown.
    #[must_use]
    pub const fn unowned(kind: RegionKind) -> Self {
        Self { kind, node: None }
    }
}

/// Innermost-first chain of regions under the pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerRegion {
    hits: Vec<RegionHit>,
}

impl PointerRegion {
    /// Pointer over nothing droppable.
    #[must_use]
    pub fn outside() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_hits(hits: Vec<RegionHit>) -> Self {
        Self { hits }
    }

    #[must_use]
    pub fn rule_body(rule: NodeId) -> Self {
        Self::from_hits(vec![RegionHit::new(RegionKind::RuleBody, rule)])
    }

    #[must_use]
    pub fn group_header(group: NodeId) -> Self {
        Self::from_hits(vec![RegionHit::new(RegionKind::GroupHeader, group)])
    }

    #[must_use]
    pub fn group_body(group: NodeId) -> Self {
        Self::from_hits(vec![RegionHit::new(RegionKind::GroupBody, group)])
    }

    /// Add an enclosing region (outer than every hit so far).
    #[must_use]
    pub fn within(mut self, hit: RegionHit) -> Self {
        self.hits.push(hit);
        self
    }

    #[must_use]
    pub fn hits(&self) -> &[RegionHit] {
        &self.hits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Innermost annotated hit of `kind`.
    fn closest(&self, kind: RegionKind) -> Option<NodeId> {
        self.hits
            .iter()
            .filter(|hit| hit.kind == kind)
            .find_map(|hit| hit.node)
    }
}

/// Where a dragged node (or the placeholder) should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "plan", content = "anchor", rename_all = "snake_case")]
pub enum RelocationPlan {
    /// Immediately after the given sibling.
    InsertAfter(NodeId),
    /// First child of the given group.
    InsertAtBeginning(NodeId),
    /// Last child of the given group.
    InsertAtEnd(NodeId),
}

impl RelocationPlan {
    /// Node the plan is positioned against.
    #[must_use]
    pub const fn anchor(self) -> NodeId {
        match self {
            Self::InsertAfter(id) | Self::InsertAtBeginning(id) | Self::InsertAtEnd(id) => id,
        }
    }
}

/// Map the regions under the pointer to a relocation plan.
#[must_use]
pub fn resolve(region: &PointerRegion) -> Option<RelocationPlan> {
    if let Some(rule) = region.closest(RegionKind::RuleBody) {
        return Some(RelocationPlan::InsertAfter(rule));
    }
    if let Some(group) = region.closest(RegionKind::GroupHeader) {
        return Some(RelocationPlan::InsertAtBeginning(group));
    }
    region
        .closest(RegionKind::GroupBody)
        .map(RelocationPlan::InsertAtEnd)
}
