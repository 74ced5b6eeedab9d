//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use stagecraft::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Stage facade
pub use crate::stage::{Stage, StageBuilder};

// Scene system
pub use crate::core::context::StageContext;
pub use crate::core::scene::{
    BulkOutcome, FixedScenes, OpOutcome, SceneController, SceneKey, SceneManager,
};

// Fade driver
pub use crate::core::fade::{Color, FadeDirection, FadeOutcome, DEFAULT_FADE_SECS};

// Transitions
pub use crate::core::transition::{TransitionPhase, TransitionRequest};

// Host bridge
pub use crate::core::host::{HostError, HostEvent, MemoryHost, SceneHost};

// Events and errors
pub use crate::core::error::SceneError;
pub use crate::core::events::StageEvent;
pub use crate::core::Completion;
