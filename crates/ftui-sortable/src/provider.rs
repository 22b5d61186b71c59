//! Interaction provider boundary.
//!
//! The provider owns pointer capture, ghost rendering, and hit-testing. The
//! engine tells it which nodes are draggable and which regions accept drops;
//! the provider reports gestures back as [`crate::GestureEvent`]s.
//!
//! # Delivery contract
//!
//! 1. `End` is delivered exactly once per started gesture.
//! 2. `Drop`, when it fires, is delivered before `End` of the same gesture.
//! 3. Only registered drop surfaces are ever reported as hover/drop regions.

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::config::SortableConfig;
use crate::resolver::RegionKind;
use crate::tree::NodeId;

bitflags! {
    /// Gesture features a provider can deliver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProviderCapabilities: u8 {
        /// Drag gestures (start/move/end) on registered nodes.
        const DRAG         = 0b001;
        /// Hover-enter and drop on registered surfaces.
        const DROP         = 0b010;
        /// Drop surfaces are re-measured while a drag is in flight.
        const DYNAMIC_DROP = 0b100;
    }
}

impl ProviderCapabilities {
    /// Capabilities the engine cannot work without under `config`.
    #[must_use]
    pub fn required_by(config: &SortableConfig) -> Self {
        let mut required = Self::DRAG | Self::DROP;
        if config.dynamic_drop {
            required |= Self::DYNAMIC_DROP;
        }
        required
    }
}

/// Settings pushed to the provider once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Pointer travel before a press becomes a drag.
    pub move_tolerance: u16,
    /// Re-measure drop surfaces during a drag.
    pub dynamic_drop: bool,
}

impl ProviderSettings {
    #[must_use]
    pub fn from_config(config: &SortableConfig) -> Self {
        Self {
            move_tolerance: config.move_tolerance,
            dynamic_drop: config.dynamic_drop,
        }
    }
}

/// A region registered to accept drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DropSurface {
    pub node: NodeId,
    pub kind: RegionKind,
}

/// Source of pointer gestures for the tree's rendered nodes.
pub trait InteractionProvider {
    /// What this provider can deliver.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Apply engine-wide settings. Called once, before any registration.
    fn configure(&mut self, _settings: ProviderSettings) {}

    /// Start delivering drag gestures for `node`.
    fn register_draggable(&mut self, node: NodeId);

    /// Start reporting hover/drop on `surface`.
    fn register_drop_surface(&mut self, surface: DropSurface);

    /// Stop delivering anything for `node` (drag and all its surfaces).
    fn unregister(&mut self, node: NodeId);
}

/// In-memory provider that records registrations.
///
/// Gestures are fed to the engine directly by the caller. Used by tests,
/// benchmarks, and headless hosts.
#[derive(Debug, Clone)]
pub struct HeadlessProvider {
    capabilities: ProviderCapabilities,
    settings: Option<ProviderSettings>,
    draggable: BTreeSet<NodeId>,
    surfaces: BTreeSet<DropSurface>,
    log: Vec<String>,
}

impl Default for HeadlessProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessProvider {
    /// A provider with every capability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(ProviderCapabilities::all())
    }

    #[must_use]
    pub fn with_capabilities(capabilities: ProviderCapabilities) -> Self {
        Self {
            capabilities,
            settings: None,
            draggable: BTreeSet::new(),
            surfaces: BTreeSet::new(),
            log: Vec::new(),
        }
    }

    /// Settings received at setup, if any.
    #[must_use]
    pub fn settings(&self) -> Option<ProviderSettings> {
        self.settings
    }

    #[must_use]
    pub fn is_draggable(&self, node: NodeId) -> bool {
        self.draggable.contains(&node)
    }

    #[must_use]
    pub fn is_drop_surface(&self, node: NodeId, kind: RegionKind) -> bool {
        self.surfaces.contains(&DropSurface { node, kind })
    }

    /// Registered surfaces belonging to `node`.
    pub fn surfaces_of(&self, node: NodeId) -> impl Iterator<Item = RegionKind> + '_ {
        self.surfaces
            .iter()
            .filter(move |surface| surface.node == node)
            .map(|surface| surface.kind)
    }

    /// Take the registration log recorded so far.
    pub fn drain_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }
}

impl InteractionProvider for HeadlessProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn configure(&mut self, settings: ProviderSettings) {
        self.settings = Some(settings);
        self.log.push(format!(
            "configure tolerance={} dynamic_drop={}",
            settings.move_tolerance, settings.dynamic_drop
        ));
    }

    fn register_draggable(&mut self, node: NodeId) {
        let _ = self.draggable.insert(node);
        self.log.push(format!("drag:{}", node.get()));
    }

    fn register_drop_surface(&mut self, surface: DropSurface) {
        let _ = self.surfaces.insert(surface);
        self.log
            .push(format!("drop:{}:{:?}", surface.node.get(), surface.kind));
    }

    fn unregister(&mut self, node: NodeId) {
        let _ = self.draggable.remove(&node);
        self.surfaces.retain(|surface| surface.node != node);
        self.log.push(format!("unset:{}", node.get()));
    }
}
