//=========================================================================
// Core Systems
//=========================================================================
//
// The scene core: registry and lifecycle orchestration, the fade
// overlay, the transition state machine, and the host bridge they all
// talk through. Everything here runs on the embedding's single pump
// thread; the only cross-thread traffic is the host completion channel.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod context;
pub mod error;
pub mod events;
pub mod fade;
pub mod host;
pub mod scene;
pub mod transition;

//=== Shared Types ========================================================

/// One-shot completion callback attached to scene and fade operations.
///
/// Completions run on the pump thread, either synchronously inside the
/// call that accepted them (no-op operations) or from the tick that
/// observes the operation finish. A dropped operation drops its
/// completion unrun; see the individual operations for when that
/// happens.
pub type Completion = Box<dyn FnOnce()>;
