#![forbid(unsafe_code)]

//! Sortable rule/group trees: drag-and-drop reordering for condition editors.
//!
//! The crate keeps a logical [`tree::RuleTree`] consistent with what the user
//! sees while they drag rules and groups around. Rendering and pointer capture
//! belong to an [`provider::InteractionProvider`]; this crate only decides
//! what may be dragged, where a drop lands, and applies the move.
//!
//! ```
//! use ftui_sortable::{
//!     GestureEvent, HeadlessProvider, PointerRegion, SortableConfig, SortableEngine,
//! };
//!
//! let mut engine = SortableEngine::builder(SortableConfig::default())
//!     .provider(HeadlessProvider::new())
//!     .build()
//!     .expect("headless provider has every capability");
//! let root = engine.tree().root();
//! let r1 = engine.attach(engine.new_rule(), root, 0).unwrap();
//! let r2 = engine.attach(engine.new_rule(), root, 1).unwrap();
//!
//! engine.handle_gesture(GestureEvent::Start { node: r1 });
//! engine.handle_gesture(GestureEvent::HoverEnter { region: PointerRegion::rule_body(r2) });
//! engine.handle_gesture(GestureEvent::Drop { region: PointerRegion::rule_body(r2) });
//! engine.handle_gesture(GestureEvent::End { dropzone: Some(PointerRegion::rule_body(r2)) });
//!
//! assert_eq!(engine.tree().children(root), &[r2, r1]);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod flags;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod tree;

pub use config::SortableConfig;
pub use engine::{SortableBuilder, SortableEngine, SortableEvent};
pub use error::{RelocationError, SortableError};
pub use flags::{InheritancePolicy, inherit_flags};
pub use provider::{
    DropSurface, HeadlessProvider, InteractionProvider, ProviderCapabilities, ProviderSettings,
};
pub use resolver::{PointerRegion, RegionHit, RegionKind, RelocationPlan, resolve};
pub use session::{
    DragPhase, DragSession, GestureEvent, SortableEffect, SortableNoopReason, SortableTransition,
};
pub use tree::{DetachedNode, NodeFlags, NodeId, NodeKind, NodeRecord, RuleTree};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, warn};
