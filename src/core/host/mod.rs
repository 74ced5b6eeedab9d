//=========================================================================
// Scene Host Bridge
//=========================================================================
//
// Seam between the scene core and the environment that physically owns
// scene content. The core tells the host to begin loads and unloads; the
// host reports completion through a channel of HostEvents, which the
// embedding pumps back into the core each tick.
//
// Architecture:
//   SceneManager ──begin_load/begin_unload──▶ SceneHost impl
//   SceneHost impl ──Sender<HostEvent>──▶ Stage::tick ──▶ SceneManager
//
// The in-memory host used by tests and headless embeddings lives in
// the `memory` submodule.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::scene::{SceneController, SceneKey};

//=== Module Declarations =================================================

mod memory;

//=== Public API ==========================================================

pub use memory::MemoryHost;

//=== SceneHost Trait =====================================================

/// Interface to the environment that owns scene content.
///
/// Load and unload are asynchronous: `begin_*` starts the work, and the
/// host reports completion by sending a [`HostEvent`] on the channel it
/// was constructed with. The core never blocks on the host.
///
/// Implementations are driven from a single thread; no internal locking
/// is required.
pub trait SceneHost<S: SceneKey> {
    /// Starts loading the content for `key`.
    ///
    /// The core guarantees it will not issue a second `begin_load` for
    /// the same key before the first completes.
    fn begin_load(&mut self, key: S);

    /// Starts unloading the content for `key`.
    fn begin_unload(&mut self, key: S);

    /// Hands over the controller for a freshly loaded scene.
    ///
    /// Called at most once per completed load, during auto-registration.
    /// Fails when the host cannot locate the scene container, its root,
    /// or a controller on that root.
    fn take_controller(&mut self, key: S) -> Result<Box<dyn SceneController<S>>, HostError>;

    /// Advances any host-internal work.
    ///
    /// Called once per core tick, before completion events are drained.
    /// Hosts whose work progresses elsewhere can leave the default no-op.
    fn tick(&mut self) {}
}

//=== HostEvent ===========================================================

/// Completion notifications sent by the host back to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent<S: SceneKey> {
    /// The load started by `begin_load(key)` has finished.
    LoadFinished(S),

    /// The unload started by `begin_unload(key)` has finished.
    UnloadFinished(S),
}

//=== HostError ===========================================================

/// Failures reported by [`SceneHost::take_controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    /// No container exists for the requested scene.
    #[error("no container exists for the scene")]
    ContainerMissing,

    /// The scene container has no root object.
    #[error("the scene container has no root object")]
    MissingRoot,

    /// The scene root carries no controller.
    #[error("the scene root carries no controller")]
    MissingController,
}
