//! Sortable engine: the tree, its interaction registrations, and the single
//! drag session.
//!
//! Structural edits go through the engine so that every node entering the
//! tree gets its inherited flags resolved *before* it is registered with the
//! provider, and every node leaving it is unregistered first.

use serde::{Deserialize, Serialize};

use crate::config::SortableConfig;
use crate::error::{RelocationError, SortableError};
use crate::flags::{InheritancePolicy, inherit_flags};
use crate::provider::{DropSurface, InteractionProvider, ProviderCapabilities, ProviderSettings};
use crate::resolver::RegionKind;
use crate::session::{DragPhase, DragSession};
use crate::tree::{DetachedNode, NodeFlags, NodeId, NodeKind, RuleTree};

/// Notifications for the surrounding editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SortableEvent {
    /// A node entered the tree.
    NodeAttached {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// A node is about to leave the tree.
    NodeDetaching { node: NodeId },
    /// A node's effective flags were (re)applied.
    FlagsApplied { node: NodeId, flags: NodeFlags },
    /// A drag session ended. `moved` is false if the node is back where the
    /// drag started.
    RelocationCompleted {
        node: NodeId,
        parent: NodeId,
        index: usize,
        moved: bool,
    },
    /// The rule set changed shape (emitted after every completed drag).
    RulesChanged,
}

/// Builder for [`SortableEngine`].
#[derive(Debug)]
pub struct SortableBuilder<P> {
    config: SortableConfig,
    tree: RuleTree,
    provider: Option<P>,
}

impl<P: InteractionProvider> SortableBuilder<P> {
    /// Interaction provider delivering gestures.
    #[must_use]
    pub fn provider(mut self, provider: P) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Start from an existing tree instead of an empty root group.
    #[must_use]
    pub fn tree(mut self, tree: RuleTree) -> Self {
        self.tree = tree;
        self
    }

    /// Validate the provider and register every existing node.
    pub fn build(self) -> Result<SortableEngine<P>, SortableError> {
        let config = self.config.normalized();
        let mut provider = self.provider.ok_or(SortableError::MissingProvider)?;
        let missing = ProviderCapabilities::required_by(&config) - provider.capabilities();
        if !missing.is_empty() {
            return Err(SortableError::MissingCapability { missing });
        }
        provider.configure(ProviderSettings::from_config(&config));

        let mut engine = SortableEngine {
            policy: InheritancePolicy::from_config(&config),
            config,
            tree: self.tree,
            provider,
            session: None,
            events: Vec::new(),
            transition_counter: 0,
        };
        engine.adopt_subtree(engine.tree.root());
        Ok(engine)
    }
}

/// Drag-and-drop reordering engine for one rule tree.
#[derive(Debug)]
pub struct SortableEngine<P> {
    pub(crate) config: SortableConfig,
    pub(crate) policy: InheritancePolicy,
    pub(crate) tree: RuleTree,
    pub(crate) provider: P,
    pub(crate) session: Option<DragSession>,
    pub(crate) events: Vec<SortableEvent>,
    pub(crate) transition_counter: u64,
}

impl<P: InteractionProvider> SortableEngine<P> {
    /// Start configuring an engine.
    #[must_use]
    pub fn builder(config: SortableConfig) -> SortableBuilder<P> {
        SortableBuilder {
            config,
            tree: RuleTree::new(),
            provider: None,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &RuleTree {
        &self.tree
    }

    #[must_use]
    pub fn config(&self) -> &SortableConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The active drag, if any.
    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.session
            .as_ref()
            .map_or(DragPhase::Idle, DragSession::phase)
    }

    /// A new rule carrying the configured default flags.
    #[must_use]
    pub fn new_rule(&self) -> DetachedNode {
        DetachedNode::rule().with_flags(self.config.default_flags(NodeKind::Rule))
    }

    /// A new, empty group carrying the configured default flags.
    #[must_use]
    pub fn new_group(&self) -> DetachedNode {
        DetachedNode::group().with_flags(self.config.default_flags(NodeKind::Group))
    }

    /// Attach a subtree and make its nodes interactive.
    pub fn attach(
        &mut self,
        node: DetachedNode,
        into: NodeId,
        at: usize,
    ) -> Result<NodeId, SortableError> {
        let id = self.tree.attach(node, into, at)?;
        self.adopt_subtree(id);
        Ok(id)
    }

    /// Unregister and remove a subtree.
    ///
    /// Refused while the subtree holds the node being dragged.
    pub fn detach(&mut self, node: NodeId) -> Result<DetachedNode, SortableError> {
        if !self.tree.contains(node) {
            return Err(RelocationError::MissingNode { node_id: node }.into());
        }
        if node == self.tree.root() {
            return Err(RelocationError::CannotDetachRoot { node_id: node }.into());
        }
        if let Some(session) = &self.session
            && (self.tree.is_ancestor_or_self(node, session.source())
                || self.tree.is_ancestor_or_self(node, session.placeholder()))
        {
            return Err(RelocationError::NodeInActiveDrag { node_id: node }.into());
        }

        for id in self.tree.descendants(node) {
            self.events.push(SortableEvent::NodeDetaching { node: id });
            self.provider.unregister(id);
        }
        Ok(self.tree.detach(node)?)
    }

    /// Replace a node's flags and refresh its registrations.
    ///
    /// The new flags are resolved against the node's parent, so a flag the
    /// parent passes down cannot be cleared here. Children are not touched;
    /// inheritance only runs when nodes attach.
    pub fn apply_flags(&mut self, node: NodeId, flags: NodeFlags) -> Result<(), SortableError> {
        let record = self
            .tree
            .node(node)
            .ok_or(RelocationError::MissingNode { node_id: node })?;
        if record.kind() == NodeKind::Placeholder {
            return Ok(());
        }
        let parent_flags = record
            .parent()
            .and_then(|parent| self.tree.node(parent))
            .map(|parent| parent.flags());
        let flags = inherit_flags(flags, parent_flags, self.policy);
        self.tree.set_flags(node, flags)?;
        self.provider.unregister(node);
        self.register(node);
        self.events.push(SortableEvent::FlagsApplied { node, flags });
        Ok(())
    }

    /// Whether the node should render a drag handle.
    ///
    /// Rules always get one; groups only below the root. Handles are removed
    /// from `no_sortable` nodes and hidden entirely when the template is off.
    #[must_use]
    pub fn shows_drag_handle(&self, node: NodeId) -> bool {
        if self.config.disable_template {
            return false;
        }
        let Some(record) = self.tree.node(node) else {
            return false;
        };
        if record.flags().no_sortable() {
            return false;
        }
        match record.kind() {
            NodeKind::Rule => true,
            NodeKind::Group => self.tree.level(node).is_some_and(|level| level > 1),
            NodeKind::Placeholder => false,
        }
    }

    /// Icon class for the node's drag handle, if it shows one.
    #[must_use]
    pub fn drag_handle_icon(&self, node: NodeId) -> Option<&str> {
        self.shows_drag_handle(node)
            .then_some(self.config.handle_icon.as_str())
    }

    /// Take the notifications emitted so far.
    pub fn drain_events(&mut self) -> Vec<SortableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resolve flags and register every node of the subtree at `id`, parents
    /// before children.
    fn adopt_subtree(&mut self, id: NodeId) {
        for node in self.tree.descendants(id) {
            let Some(record) = self.tree.node(node) else {
                continue;
            };
            if record.kind() == NodeKind::Placeholder {
                continue;
            }
            let declared = record.flags();
            let parent = record.parent();
            let parent_flags = parent
                .and_then(|parent| self.tree.node(parent))
                .map(|parent| parent.flags());
            let flags = inherit_flags(declared, parent_flags, self.policy);
            if flags != declared {
                let _ = self.tree.set_flags(node, flags);
            }

            if let (Some(parent), Some(index)) = (parent, self.tree.position(node)) {
                self.events.push(SortableEvent::NodeAttached {
                    node,
                    parent,
                    index,
                });
            }
            self.register(node);
            self.events.push(SortableEvent::FlagsApplied { node, flags });
        }
    }

    fn register(&mut self, node: NodeId) {
        let Some(record) = self.tree.node(node) else {
            return;
        };
        let flags = record.flags();
        let kind = record.kind();
        let is_root = node == self.tree.root();

        if !flags.no_sortable() && !is_root {
            crate::trace!(node = node.get(), "sortable: register draggable");
            self.provider.register_draggable(node);
        }
        if flags.no_drop() {
            return;
        }
        match kind {
            NodeKind::Rule => self.provider.register_drop_surface(DropSurface {
                node,
                kind: RegionKind::RuleBody,
            }),
            NodeKind::Group => {
                self.provider.register_drop_surface(DropSurface {
                    node,
                    kind: RegionKind::GroupBody,
                });
                self.provider.register_drop_surface(DropSurface {
                    node,
                    kind: RegionKind::GroupHeader,
                });
            }
            NodeKind::Placeholder => {}
        }
        crate::trace!(node = node.get(), "sortable: register drop surfaces");
    }
}
