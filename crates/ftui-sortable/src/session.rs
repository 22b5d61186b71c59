//! Drag session lifecycle.
//!
//! ```text
//! Idle -> Dragging -> (Committing | Cancelled) -> Idle
//! ```
//!
//! One [`DragSession`] exists per gesture, owned by the engine. Gestures are
//! fed through [`SortableEngine::handle_gesture`], which is the only place the
//! transition table lives.
//!
//! # Invariants
//!
//! 1. At most one session is active; `Start` while dragging is ignored.
//! 2. Hover only ever moves the placeholder, never the dragged node.
//! 3. The dragged node is relocated at most once per session, whether the
//!    drop is reported by `Drop`, by `End`, or by both.
//! 4. `End` always removes the placeholder, restores visibility, and returns
//!    to `Idle`; it never fails.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Fallback |
//! |---------|-------|----------|
//! | Hover plan rejected | Stale anchor, anchor inside dragged subtree | Placeholder stays put |
//! | Drop plan rejected | Same as above | Dragged node moves to the placeholder's slot |
//! | Placeholder slot unusable | Slot is next to the dragged node | Dragged node stays, session ends `Cancelled` |
//! | No drop surface at `End` | Released outside the tree | Cancelled, tree unchanged |

use serde::{Deserialize, Serialize};

use crate::engine::{SortableEngine, SortableEvent};
use crate::error::RelocationError;
use crate::provider::InteractionProvider;
use crate::resolver::{PointerRegion, RelocationPlan, resolve};
use crate::tree::{DetachedNode, NodeId, NodeKind};

/// Lifecycle phase of the drag machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Committing,
    Cancelled,
}

impl DragPhase {
    /// Returns the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging => "dragging",
            Self::Committing => "committing",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Gesture callbacks delivered by the interaction provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum GestureEvent {
    /// Drag began on `node`'s handle.
    Start { node: NodeId },
    /// Pointer moved by `(dx, dy)` since the previous move.
    Move { dx: i32, dy: i32 },
    /// Pointer entered a new drop surface.
    HoverEnter { region: PointerRegion },
    /// Released over a drop surface.
    Drop { region: PointerRegion },
    /// Gesture finished; `dropzone` is the surface under the pointer, if any.
    End { dropzone: Option<PointerRegion> },
}

impl GestureEvent {
    /// Stable name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Move { .. } => "move",
            Self::HoverEnter { .. } => "hover_enter",
            Self::Drop { .. } => "drop",
            Self::End { .. } => "end",
        }
    }
}

/// Why a gesture was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortableNoopReason {
    IdleWithoutActiveDrag,
    ActiveDragAlreadyInProgress,
    UnknownNode,
    RootNotDraggable,
    PlaceholderNotDraggable,
    SourceNotSortable,
    UnresolvedDropSurface,
    RelocationRejected,
    AlreadyMoved,
}

/// Effect of one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SortableEffect {
    DragStarted {
        source: NodeId,
        placeholder: NodeId,
    },
    GhostMoved {
        offset_x: i32,
        offset_y: i32,
    },
    PlaceholderMoved {
        plan: RelocationPlan,
    },
    /// The dragged node was relocated. `fallback` is set when the resolved
    /// plan was rejected and the placeholder's slot was used instead.
    SourceMoved {
        plan: RelocationPlan,
        fallback: bool,
    },
    /// The session ended after the dragged node was actually relocated.
    Committed {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// The session ended without relocating the dragged node, either with
    /// no drop surface or because every commit attempt was rejected.
    Cancelled {
        node: NodeId,
    },
    Noop {
        reason: SortableNoopReason,
    },
}

/// One state-machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortableTransition {
    pub transition_id: u64,
    pub from: DragPhase,
    pub to: DragPhase,
    pub effect: SortableEffect,
}

/// The single in-flight drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    phase: DragPhase,
    source: NodeId,
    placeholder: NodeId,
    origin_parent: NodeId,
    origin_index: usize,
    has_moved: bool,
    relocated: bool,
    ghost_offset: (i32, i32),
    last_plan: Option<RelocationPlan>,
}

impl DragSession {
    #[must_use]
    pub const fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Node being dragged.
    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Transient marker at the candidate drop position.
    #[must_use]
    pub const fn placeholder(&self) -> NodeId {
        self.placeholder
    }

    /// Whether a commit has been attempted. Guards against a second one.
    #[must_use]
    pub const fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Whether the commit attempt actually relocated the dragged node.
    #[must_use]
    pub const fn relocated(&self) -> bool {
        self.relocated
    }

    /// Accumulated ghost displacement since the drag started.
    #[must_use]
    pub const fn ghost_offset(&self) -> (i32, i32) {
        self.ghost_offset
    }

    /// Plan last applied to the placeholder by a hover.
    #[must_use]
    pub const fn last_plan(&self) -> Option<RelocationPlan> {
        self.last_plan
    }
}

impl<P: InteractionProvider> SortableEngine<P> {
    /// Apply one gesture and report what it did.
    ///
    /// Never fails: ignored gestures yield [`SortableEffect::Noop`].
    pub fn handle_gesture(&mut self, event: GestureEvent) -> SortableTransition {
        let from = self.phase();
        let span = crate::debug_span!("sortable.gesture", event = event.kind(), phase = from.as_str());
        let _guard = span.enter();

        let effect = match event {
            GestureEvent::Start { node } => self.start_drag(node),
            _ if self.session.is_none() => SortableEffect::Noop {
                reason: SortableNoopReason::IdleWithoutActiveDrag,
            },
            GestureEvent::Move { dx, dy } => self.move_ghost(dx, dy),
            GestureEvent::HoverEnter { region } => self.hover(&region),
            GestureEvent::Drop { region } => self.drop_on(&region),
            GestureEvent::End { dropzone } => self.end_drag(dropzone.as_ref()),
        };

        self.transition_counter = self.transition_counter.saturating_add(1);
        SortableTransition {
            transition_id: self.transition_counter,
            from,
            to: self.phase(),
            effect,
        }
    }

    fn start_drag(&mut self, node: NodeId) -> SortableEffect {
        let noop = |reason| SortableEffect::Noop { reason };
        if self.session.is_some() {
            return noop(SortableNoopReason::ActiveDragAlreadyInProgress);
        }
        let Some(record) = self.tree.node(node) else {
            return noop(SortableNoopReason::UnknownNode);
        };
        if record.kind() == NodeKind::Placeholder {
            return noop(SortableNoopReason::PlaceholderNotDraggable);
        }
        if record.flags().no_sortable() {
            return noop(SortableNoopReason::SourceNotSortable);
        }
        let (Some(parent), Some(index)) = (record.parent(), self.tree.position(node)) else {
            return noop(SortableNoopReason::RootNotDraggable);
        };

        let placeholder = match self.tree.attach(DetachedNode::placeholder(), parent, index) {
            Ok(placeholder) => placeholder,
            Err(_err) => {
                crate::warn!(error = %_err, "sortable: placeholder insertion failed");
                return noop(SortableNoopReason::RelocationRejected);
            }
        };
        let _ = self.tree.set_visible(node, false);

        crate::debug!(
            source = node.get(),
            placeholder = placeholder.get(),
            "sortable: drag started"
        );
        self.session = Some(DragSession {
            phase: DragPhase::Dragging,
            source: node,
            placeholder,
            origin_parent: parent,
            origin_index: index,
            has_moved: false,
            relocated: false,
            ghost_offset: (0, 0),
            last_plan: None,
        });
        SortableEffect::DragStarted {
            source: node,
            placeholder,
        }
    }

    fn move_ghost(&mut self, dx: i32, dy: i32) -> SortableEffect {
        let Some(session) = self.session.as_mut() else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::IdleWithoutActiveDrag,
            };
        };
        let (x, y) = session.ghost_offset;
        session.ghost_offset = (x.saturating_add(dx), y.saturating_add(dy));
        SortableEffect::GhostMoved {
            offset_x: session.ghost_offset.0,
            offset_y: session.ghost_offset.1,
        }
    }

    fn hover(&mut self, region: &PointerRegion) -> SortableEffect {
        let Some((source, placeholder)) = self.session.as_ref().map(|s| (s.source, s.placeholder))
        else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::IdleWithoutActiveDrag,
            };
        };
        let Some(plan) = resolve(region) else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::UnresolvedDropSurface,
            };
        };

        match self.relocate_within_drag(source, placeholder, plan) {
            Ok(()) => {
                crate::debug!(?plan, "sortable: placeholder moved");
                if let Some(session) = self.session.as_mut() {
                    session.last_plan = Some(plan);
                }
                SortableEffect::PlaceholderMoved { plan }
            }
            Err(_err) => {
                crate::debug!(?plan, error = %_err, "sortable: hover plan rejected");
                SortableEffect::Noop {
                    reason: SortableNoopReason::RelocationRejected,
                }
            }
        }
    }

    fn drop_on(&mut self, region: &PointerRegion) -> SortableEffect {
        if self.session.as_ref().is_some_and(|s| s.has_moved) {
            return SortableEffect::Noop {
                reason: SortableNoopReason::AlreadyMoved,
            };
        }
        self.commit(region)
    }

    fn end_drag(&mut self, dropzone: Option<&PointerRegion>) -> SortableEffect {
        if let Some(region) = dropzone
            && self.session.as_ref().is_some_and(|s| !s.has_moved)
        {
            let _ = self.commit(region);
        }

        let Some(mut session) = self.session.take() else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::IdleWithoutActiveDrag,
            };
        };
        session.phase = if session.relocated {
            DragPhase::Committing
        } else {
            DragPhase::Cancelled
        };
        crate::debug!(
            source = session.source.get(),
            phase = session.phase.as_str(),
            "sortable: drag ending"
        );

        let _ = self.tree.detach(session.placeholder);
        let _ = self.tree.set_visible(session.source, true);

        let node = session.source;
        let parent = self.tree.parent(node).unwrap_or(session.origin_parent);
        let index = self.tree.position(node).unwrap_or(session.origin_index);
        let moved = (parent, index) != (session.origin_parent, session.origin_index);
        self.events.push(SortableEvent::RelocationCompleted {
            node,
            parent,
            index,
            moved,
        });
        self.events.push(SortableEvent::RulesChanged);

        match session.phase {
            DragPhase::Committing => SortableEffect::Committed {
                node,
                parent,
                index,
            },
            _ => SortableEffect::Cancelled { node },
        }
    }

    /// Relocate the dragged node itself. Runs at most once per session.
    fn commit(&mut self, region: &PointerRegion) -> SortableEffect {
        let Some((source, placeholder)) = self.session.as_ref().map(|s| (s.source, s.placeholder))
        else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::IdleWithoutActiveDrag,
            };
        };
        let Some(plan) = resolve(region) else {
            return SortableEffect::Noop {
                reason: SortableNoopReason::UnresolvedDropSurface,
            };
        };
        if let Some(session) = self.session.as_mut() {
            session.has_moved = true;
        }

        let effect = match self.relocate_within_drag(source, source, plan) {
            Ok(()) => {
                crate::debug!(source = source.get(), ?plan, "sortable: drop committed");
                SortableEffect::SourceMoved {
                    plan,
                    fallback: false,
                }
            }
            Err(_err) => {
                crate::warn!(
                    source = source.get(),
                    ?plan,
                    error = %_err,
                    "sortable: drop rejected, falling back to placeholder slot"
                );
                self.settle_at_placeholder(source, placeholder)
            }
        };
        if let (SortableEffect::SourceMoved { .. }, Some(session)) = (effect, self.session.as_mut()) {
            session.relocated = true;
        }
        effect
    }

    /// Move `source` to wherever the placeholder currently rests.
    fn settle_at_placeholder(&mut self, source: NodeId, placeholder: NodeId) -> SortableEffect {
        let rejected = SortableEffect::Noop {
            reason: SortableNoopReason::RelocationRejected,
        };
        let (Some(parent), Some(index)) = (self.tree.parent(placeholder), self.tree.position(placeholder))
        else {
            return rejected;
        };
        let plan = match index.checked_sub(1) {
            None => RelocationPlan::InsertAtBeginning(parent),
            Some(prev) => match self.tree.children(parent).get(prev) {
                Some(&sibling) if sibling != source => RelocationPlan::InsertAfter(sibling),
                _ => return rejected,
            },
        };
        match self.relocate_within_drag(source, source, plan) {
            Ok(()) => SortableEffect::SourceMoved {
                plan,
                fallback: true,
            },
            Err(_) => rejected,
        }
    }

    /// Apply `plan` to `node` (the placeholder or the dragged node), refusing
    /// anchors inside the dragged subtree.
    fn relocate_within_drag(
        &mut self,
        source: NodeId,
        node: NodeId,
        plan: RelocationPlan,
    ) -> Result<(), RelocationError> {
        let anchor = plan.anchor();
        if self.tree.contains(anchor) && self.tree.is_ancestor_or_self(source, anchor) {
            return Err(RelocationError::IntoDraggedSubtree { source, anchor });
        }
        self.tree.relocate(node, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortableConfig;
    use crate::provider::HeadlessProvider;
    use crate::tree::NodeFlags;

    struct Fixture {
        engine: SortableEngine<HeadlessProvider>,
        root: NodeId,
        rules: Vec<NodeId>,
    }

    /// root[r1, r2, r3]
    fn fixture() -> Fixture {
        let mut engine = SortableEngine::builder(SortableConfig::default())
            .provider(HeadlessProvider::new())
            .build()
            .expect("headless provider has every capability");
        let root = engine.tree().root();
        let rules = (0..3)
            .map(|i| engine.attach(engine.new_rule(), root, i).unwrap())
            .collect();
        let _ = engine.drain_events();
        Fixture {
            engine,
            root,
            rules,
        }
    }

    #[test]
    fn start_creates_placeholder_before_source() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let t = engine.handle_gesture(GestureEvent::Start { node: rules[1] });
        assert_eq!(t.from, DragPhase::Idle);
        assert_eq!(t.to, DragPhase::Dragging);
        let session = engine.session().unwrap();
        let ph = session.placeholder();
        assert_eq!(
            t.effect,
            SortableEffect::DragStarted {
                source: rules[1],
                placeholder: ph
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[0], ph, rules[1], rules[2]]);
        assert!(!engine.tree().node(rules[1]).unwrap().is_visible());
        assert!(!session.has_moved());
    }

    #[test]
    fn placeholder_is_not_registered() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        let _ = engine.provider_mut().drain_log();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        assert!(engine.provider_mut().drain_log().is_empty());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn second_start_is_ignored() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let t = engine.handle_gesture(GestureEvent::Start { node: rules[2] });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::ActiveDragAlreadyInProgress
            }
        );
        assert_eq!(engine.session().unwrap().source(), rules[0]);
    }

    #[test]
    fn root_and_unknown_nodes_cannot_start() {
        let Fixture {
            mut engine, root, ..
        } = fixture();
        let t = engine.handle_gesture(GestureEvent::Start { node: root });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::RootNotDraggable
            }
        );
        let t = engine.handle_gesture(GestureEvent::Start {
            node: NodeId::new(999).unwrap(),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::UnknownNode
            }
        );
        assert_eq!(engine.phase(), DragPhase::Idle);
    }

    #[test]
    fn no_sortable_source_stays_idle() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        engine.apply_flags(rules[0], NodeFlags::NO_SORTABLE).unwrap();
        let t = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        assert_eq!(t.to, DragPhase::Idle);
        assert!(engine.session().is_none());
    }

    #[test]
    fn gestures_without_session_are_noops() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        for event in [
            GestureEvent::Move { dx: 1, dy: 1 },
            GestureEvent::HoverEnter {
                region: PointerRegion::rule_body(rules[0]),
            },
            GestureEvent::Drop {
                region: PointerRegion::rule_body(rules[0]),
            },
            GestureEvent::End { dropzone: None },
        ] {
            let t = engine.handle_gesture(event);
            assert_eq!(
                t.effect,
                SortableEffect::Noop {
                    reason: SortableNoopReason::IdleWithoutActiveDrag
                }
            );
        }
    }

    #[test]
    fn move_only_tracks_ghost() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let before = engine.tree().state_hash();
        let _ = engine.handle_gesture(GestureEvent::Move { dx: 3, dy: -1 });
        let t = engine.handle_gesture(GestureEvent::Move { dx: 2, dy: 5 });
        assert_eq!(
            t.effect,
            SortableEffect::GhostMoved {
                offset_x: 5,
                offset_y: 4
            }
        );
        assert_eq!(engine.tree().state_hash(), before);
    }

    #[test]
    fn hover_moves_placeholder_only() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let ph = engine.session().unwrap().placeholder();
        let t = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[2]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::PlaceholderMoved {
                plan: RelocationPlan::InsertAfter(rules[2])
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[0], rules[1], rules[2], ph]);
        assert_eq!(
            engine.session().unwrap().last_plan(),
            Some(RelocationPlan::InsertAfter(rules[2]))
        );
    }

    #[test]
    fn hover_on_source_is_rejected() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[1] });
        let before = engine.tree().children(root).to_vec();
        let t = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[1]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::RelocationRejected
            }
        );
        assert_eq!(engine.tree().children(root), before.as_slice());
    }

    #[test]
    fn drop_then_end_commits_once() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let region = PointerRegion::rule_body(rules[2]);
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: region.clone(),
        });
        let t = engine.handle_gesture(GestureEvent::Drop {
            region: region.clone(),
        });
        assert_eq!(
            t.effect,
            SortableEffect::SourceMoved {
                plan: RelocationPlan::InsertAfter(rules[2]),
                fallback: false
            }
        );
        assert!(engine.session().unwrap().has_moved());

        let again = engine.handle_gesture(GestureEvent::Drop {
            region: region.clone(),
        });
        assert_eq!(
            again.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::AlreadyMoved
            }
        );

        let t = engine.handle_gesture(GestureEvent::End {
            dropzone: Some(region),
        });
        assert_eq!(t.from, DragPhase::Dragging);
        assert_eq!(t.to, DragPhase::Idle);
        assert_eq!(
            t.effect,
            SortableEffect::Committed {
                node: rules[0],
                parent: root,
                index: 2
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[1], rules[2], rules[0]]);
        assert!(engine.tree().node(rules[0]).unwrap().is_visible());
        assert!(engine.tree().validate().is_ok());
    }

    #[test]
    fn end_with_dropzone_commits_without_drop() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[2] });
        let t = engine.handle_gesture(GestureEvent::End {
            dropzone: Some(PointerRegion::group_header(root)),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Committed {
                node: rules[2],
                parent: root,
                index: 0
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[2], rules[0], rules[1]]);
    }

    #[test]
    fn end_outside_cancels_and_restores() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let before = engine.tree().state_hash();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[2]),
        });
        let t = engine.handle_gesture(GestureEvent::End { dropzone: None });
        assert_eq!(t.effect, SortableEffect::Cancelled { node: rules[0] });
        assert_eq!(t.to, DragPhase::Idle);
        assert_eq!(engine.tree().state_hash(), before);
        assert_eq!(
            engine.drain_events(),
            vec![
                SortableEvent::RelocationCompleted {
                    node: rules[0],
                    parent: root,
                    index: 0,
                    moved: false
                },
                SortableEvent::RulesChanged,
            ]
        );
    }

    #[test]
    fn rejected_drop_falls_back_to_placeholder_slot() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[1]),
        });
        let t = engine.handle_gesture(GestureEvent::Drop {
            region: PointerRegion::rule_body(rules[0]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::SourceMoved {
                plan: RelocationPlan::InsertAfter(rules[1]),
                fallback: true
            }
        );
        let _ = engine.handle_gesture(GestureEvent::End { dropzone: None });
        assert_eq!(engine.tree().children(root), &[rules[1], rules[0], rules[2]]);
    }

    #[test]
    fn rejected_drop_with_placeholder_first_moves_to_front() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[1] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::group_header(root),
        });
        let ph = engine.session().unwrap().placeholder();
        assert_eq!(engine.tree().position(ph), Some(0));

        let t = engine.handle_gesture(GestureEvent::Drop {
            region: PointerRegion::rule_body(rules[1]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::SourceMoved {
                plan: RelocationPlan::InsertAtBeginning(root),
                fallback: true
            }
        );
        assert!(engine.session().unwrap().relocated());

        let t = engine.handle_gesture(GestureEvent::End { dropzone: None });
        assert_eq!(
            t.effect,
            SortableEffect::Committed {
                node: rules[1],
                parent: root,
                index: 0
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[1], rules[0], rules[2]]);
        assert!(engine.tree().validate().is_ok());
    }

    #[test]
    fn placeholder_slot_next_to_source_leaves_source_in_place() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[1] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[2]),
        });
        // Removing the hovered rule leaves the placeholder right after the source.
        let _ = engine.detach(rules[2]).unwrap();
        let ph = engine.session().unwrap().placeholder();
        assert_eq!(engine.tree().children(root), &[rules[0], rules[1], ph]);
        let before = engine.tree().children(root).to_vec();

        let t = engine.handle_gesture(GestureEvent::Drop {
            region: PointerRegion::rule_body(rules[1]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::RelocationRejected
            }
        );
        assert_eq!(engine.tree().children(root), before.as_slice());
        let session = engine.session().unwrap();
        assert!(session.has_moved());
        assert!(!session.relocated());

        let t = engine.handle_gesture(GestureEvent::End {
            dropzone: Some(PointerRegion::rule_body(rules[0])),
        });
        assert_eq!(t.effect, SortableEffect::Cancelled { node: rules[1] });
        assert_eq!(engine.tree().children(root), &[rules[0], rules[1]]);
        assert!(engine.tree().validate().is_ok());
        assert!(engine.drain_events().contains(&SortableEvent::RelocationCompleted {
            node: rules[1],
            parent: root,
            index: 1,
            moved: false
        }));
    }

    #[test]
    fn end_without_drop_falls_back_to_placeholder_slot() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[1] });
        let _ = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[2]),
        });
        let t = engine.handle_gesture(GestureEvent::End {
            dropzone: Some(PointerRegion::rule_body(rules[1])),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Committed {
                node: rules[1],
                parent: root,
                index: 2
            }
        );
        assert_eq!(engine.tree().children(root), &[rules[0], rules[2], rules[1]]);
        assert!(engine.tree().validate().is_ok());
    }

    #[test]
    fn stale_anchor_keeps_placeholder() {
        let Fixture {
            mut engine,
            root,
            rules,
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let ph = engine.session().unwrap().placeholder();
        let _ = engine.detach(rules[2]).unwrap();
        let t = engine.handle_gesture(GestureEvent::HoverEnter {
            region: PointerRegion::rule_body(rules[2]),
        });
        assert_eq!(
            t.effect,
            SortableEffect::Noop {
                reason: SortableNoopReason::RelocationRejected
            }
        );
        assert_eq!(engine.tree().children(root), &[ph, rules[0], rules[1]]);
    }

    #[test]
    fn detaching_dragged_node_is_refused() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        let _ = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        assert!(engine.detach(rules[0]).is_err());
        let ph = engine.session().unwrap().placeholder();
        assert!(engine.detach(ph).is_err());
    }

    #[test]
    fn transition_ids_are_monotonic() {
        let Fixture {
            mut engine, rules, ..
        } = fixture();
        let a = engine.handle_gesture(GestureEvent::Start { node: rules[0] });
        let b = engine.handle_gesture(GestureEvent::End { dropzone: None });
        assert!(b.transition_id > a.transition_id);
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(DragPhase::Idle.as_str(), "idle");
        assert_eq!(DragPhase::Committing.as_str(), "committing");
        assert_eq!(GestureEvent::End { dropzone: None }.kind(), "end");
    }
}
