//=========================================================================
// Stage Events
//=========================================================================
//
// Observable notifications emitted by the scene core. Events accumulate
// in the StageContext during a tick and are drained by the embedding via
// Stage::drain_events.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::fade::FadeDirection;
use crate::core::scene::SceneKey;

//=== StageEvent ==========================================================

/// Notifications emitted as scene, fade, and transition work completes.
///
/// Events are strictly informational: the core does not react to its own
/// events, and dropping them unread changes no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent<S: SceneKey> {
    /// A scene finished loading and is now registered and active.
    SceneLoaded(S),

    /// A scene finished unloading and left the registry.
    SceneUnloaded(S),

    /// A bulk unload of all non-fixed scenes has fully completed.
    UnloadAllFinished,

    /// Every fixed scene is loaded; the bootstrap bulk load is done.
    FixedScenesLoaded,

    /// A fade animation ran to completion in the given direction.
    FadeFinished(FadeDirection),

    /// A coordinated transition landed on the given scene.
    TransitionFinished(S),

    /// A freshly loaded scene could not be auto-registered.
    ///
    /// The scene content stays resident in the host but has no
    /// controller in the registry. See
    /// [`SceneError::MissingCapability`](crate::core::error::SceneError).
    RegistrationFailed(S),
}

//=== OpEdge ==============================================================

/// Internal completion edges routed from the scene manager to the
/// transition driver at tick boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpEdge<S: SceneKey> {
    /// A single scene load completed (registration may have failed).
    Loaded(S),

    /// The bulk unload with the given id completed.
    BulkUnloadDone(u64),
}
