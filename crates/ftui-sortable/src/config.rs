//! Sortable configuration.

use crate::tree::{NodeFlags, NodeKind};

/// Default icon class for drag handles.
pub const DEFAULT_HANDLE_ICON: &str = "glyphicon glyphicon-sort";

/// Default pointer travel before a press turns into a drag.
pub const DEFAULT_MOVE_TOLERANCE: u16 = 10;

/// Options recognized by [`crate::SortableEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortableConfig {
    /// Children of `no_drop` groups become `no_drop` (default: true).
    pub inherit_no_drop: bool,
    /// Children of `no_sortable` groups become `no_sortable` (default: true).
    pub inherit_no_sortable: bool,
    /// Suppress the default drag-handle affordance (default: false).
    pub disable_template: bool,
    /// Icon class rendered inside drag handles, reported by
    /// [`crate::SortableEngine::drag_handle_icon`].
    pub handle_icon: String,
    /// Flags given to rules created via [`crate::SortableEngine::new_rule`].
    pub default_rule_flags: NodeFlags,
    /// Flags given to groups created via [`crate::SortableEngine::new_group`].
    pub default_group_flags: NodeFlags,
    /// Deprecated: use `default_rule_flags` / `default_group_flags`.
    ///
    /// When set, [`SortableConfig::normalized`] copies it into both default
    /// flag sets.
    pub default_no_sortable: Option<bool>,
    /// Pointer travel (in provider units) before a drag starts (default: 10).
    pub move_tolerance: u16,
    /// Recompute drop surfaces while dragging, since the source is hidden
    /// (default: true).
    pub dynamic_drop: bool,
}

impl Default for SortableConfig {
    fn default() -> Self {
        Self {
            inherit_no_drop: true,
            inherit_no_sortable: true,
            disable_template: false,
            handle_icon: DEFAULT_HANDLE_ICON.to_string(),
            default_rule_flags: NodeFlags::empty(),
            default_group_flags: NodeFlags::empty(),
            default_no_sortable: None,
            move_tolerance: DEFAULT_MOVE_TOLERANCE,
            dynamic_drop: true,
        }
    }
}

impl SortableConfig {
    #[must_use]
    pub fn with_inherit_no_drop(mut self, inherit: bool) -> Self {
        self.inherit_no_drop = inherit;
        self
    }

    #[must_use]
    pub fn with_inherit_no_sortable(mut self, inherit: bool) -> Self {
        self.inherit_no_sortable = inherit;
        self
    }

    /// Hide drag handles entirely.
    #[must_use]
    pub fn without_template(mut self) -> Self {
        self.disable_template = true;
        self
    }

    #[must_use]
    pub fn with_handle_icon(mut self, icon: impl Into<String>) -> Self {
        self.handle_icon = icon.into();
        self
    }

    #[must_use]
    pub fn with_default_rule_flags(mut self, flags: NodeFlags) -> Self {
        self.default_rule_flags = flags;
        self
    }

    #[must_use]
    pub fn with_default_group_flags(mut self, flags: NodeFlags) -> Self {
        self.default_group_flags = flags;
        self
    }

    #[must_use]
    pub fn with_move_tolerance(mut self, tolerance: u16) -> Self {
        self.move_tolerance = tolerance;
        self
    }

    /// Fold deprecated options into their replacements.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(no_sortable) = self.default_no_sortable.take() {
            crate::warn!(
                no_sortable,
                "sortable: `default_no_sortable` is deprecated, use default_rule_flags and default_group_flags"
            );
            self.default_rule_flags
                .set(NodeFlags::NO_SORTABLE, no_sortable);
            self.default_group_flags
                .set(NodeFlags::NO_SORTABLE, no_sortable);
        }
        self
    }

    /// Default flags for a newly created node of `kind`.
    #[must_use]
    pub fn default_flags(&self, kind: NodeKind) -> NodeFlags {
        match kind {
            NodeKind::Rule => self.default_rule_flags,
            NodeKind::Group => self.default_group_flags,
            NodeKind::Placeholder => NodeFlags::empty(),
        }
    }
}
