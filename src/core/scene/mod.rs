//=========================================================================
// Scene System
//=========================================================================
//
// Scene identity, lifecycle hooks, and the registry of resident scenes.
//
// Architecture:
//   SceneManager
//     ├─ registry: SceneRegistry<S>   (resident scenes + active flags)
//     ├─ fixed: FixedScenes<S>        (never unloaded)
//     └─ pending / bulk bookkeeping   (in-flight host operations)
//
// Flow:
//   load() → host begins load → host event → register + activate
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;
use std::hash::Hash;

//=== Internal Dependencies ===============================================

use crate::core::context::StageContext;

//=== Module Declarations =================================================

mod manager;
mod registry;

//=== Public API ==========================================================

pub use manager::{BulkOutcome, OpOutcome, SceneManager};
pub use registry::{SceneRecord, SceneRegistry};

//=== SceneKey Trait ======================================================

/// Marker trait for scene identifier types.
///
/// Implement this on your scene enum to use it as a scene key:
///
/// ```rust
/// use stagecraft::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum GameScene {
///     Title,
///     Stage,
///     Result,
/// }
///
/// impl SceneKey for GameScene {}
/// ```
pub trait SceneKey: Clone + Copy + Eq + Hash + Debug + Send + 'static {}

//=== SceneController Trait ===============================================

/// Defines per-scene behavior through lifecycle hooks.
///
/// Controllers are registered in [`SceneManager`] and driven through a
/// fixed hook sequence. All hooks have default empty implementations, so
/// a unit struct is a valid controller:
///
/// ```rust
/// # use stagecraft::prelude::*;
/// # #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// # enum GameScene { Main }
/// # impl SceneKey for GameScene {}
/// struct MainScene;
///
/// impl SceneController<GameScene> for MainScene {}
/// ```
///
/// # Hook Order
///
/// For a scene loaded and later unloaded, hooks fire in this order:
///
/// 1. [`on_awake`](Self::on_awake) once, as the controller is handed to
///    the manager, before it enters the registry.
/// 2. [`on_start`](Self::on_start) once, immediately after registration.
/// 3. [`initialize`](Self::initialize) on each inactive-to-active edge.
/// 4. [`finalize`](Self::finalize) on each active-to-inactive edge, and
///    again right before the scene is handed to the host for unloading,
///    active or not.
/// 5. [`on_transition_complete`](Self::on_transition_complete) when a
///    coordinated transition lands on this scene, after the fade-in ends.
pub trait SceneController<S: SceneKey> {
    /// Called once when this controller is handed to the manager.
    ///
    /// Runs before the scene is registered, so the scene is not yet
    /// visible through [`SceneManager`] queries.
    fn on_awake(&mut self, _context: &mut StageContext<S>) {}

    /// Called once, immediately after this controller enters the registry.
    fn on_start(&mut self, _context: &mut StageContext<S>) {}

    /// Called on every inactive-to-active edge.
    ///
    /// Activating an already-active scene does not fire this hook again.
    fn initialize(&mut self, _context: &mut StageContext<S>) {}

    /// Called on every active-to-inactive edge, and again right before
    /// the scene is handed to the host for unloading.
    ///
    /// The pre-unload call fires whether or not the scene was active.
    fn finalize(&mut self, _context: &mut StageContext<S>) {}

    /// Called when a coordinated transition targeting this scene has
    /// fully finished, after the fade back in.
    fn on_transition_complete(&mut self, _context: &mut StageContext<S>) {}
}

//=== FixedScenes =========================================================

/// The ordered set of fixed scenes.
///
/// Fixed scenes are infrastructure scenes that stay resident for the
/// whole run. [`SceneManager`] refuses to unload them and skips them
/// during bulk unloads. Order is the bootstrap load order and duplicates
/// are dropped on construction.
#[derive(Debug, Clone)]
pub struct FixedScenes<S: SceneKey> {
    keys: Vec<S>,
}

impl<S: SceneKey> FixedScenes<S> {
    /// Creates the fixed set from an ordered list of keys.
    ///
    /// Duplicates after the first occurrence are discarded.
    pub fn new(keys: impl IntoIterator<Item = S>) -> Self {
        let mut deduped: Vec<S> = Vec::new();
        for key in keys {
            if !deduped.contains(&key) {
                deduped.push(key);
            }
        }
        Self { keys: deduped }
    }

    /// Whether `key` belongs to the fixed set.
    pub fn contains(&self, key: S) -> bool {
        self.keys.contains(&key)
    }

    /// Iterates the fixed keys in bootstrap order.
    pub fn iter(&self) -> impl Iterator<Item = S> + '_ {
        self.keys.iter().copied()
    }

    /// Number of fixed scenes.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the fixed set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: SceneKey> Default for FixedScenes<S> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
