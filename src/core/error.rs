//=========================================================================
// Errors
//=========================================================================
//
// Failure conditions surfaced by the scene core.
//
// None of these are fatal: load/unload/activate degrade to no-ops or
// synchronous completion where possible, and the variants here cover the
// remaining cases a caller may want to branch on (duplicate registration,
// missing host capabilities, busy fade or transition machinery).
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::host::HostError;

//=== SceneError ==========================================================

/// Errors reported by scene registry, fade, and transition operations.
///
/// The core never panics on these conditions. Operations that can proceed
/// as a no-op do so (see [`crate::core::scene::SceneManager`]); the rest
/// return one of the variants below and leave state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The scene is not registered.
    #[error("scene is not registered")]
    NotFound,

    /// The scene is already registered; duplicate registration is rejected.
    #[error("scene is already registered")]
    AlreadyExists,

    /// The hosting environment could not supply a controller for the scene.
    ///
    /// Reported during auto-registration when the host cannot locate the
    /// scene container, its root object, or a controller on that root.
    #[error("host could not supply a scene controller: {0}")]
    MissingCapability(#[from] HostError),

    /// A fade is already in progress; the new fade request was dropped.
    ///
    /// The in-flight fade continues unaffected and the dropped request's
    /// completion callback will never fire.
    #[error("a fade is already in progress")]
    FadeBusy,

    /// A transition is already in progress; the new request was rejected.
    #[error("a transition is already in progress")]
    TransitionBusy,
}

//=========================================================================
// Unit Tests
//=========================================================================
