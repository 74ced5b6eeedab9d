//=========================================================================
// Scene Registry
//=========================================================================
//
// Bookkeeping for resident scenes: which scenes are loaded, which are
// active, and the controller owned by each.
//
// The registry is pure state. Lifecycle hooks and host calls are driven
// by SceneManager; nothing in here has side effects beyond its own maps.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

//=== Internal Dependencies ===============================================

use crate::core::error::SceneError;
use crate::core::scene::{SceneController, SceneKey};

//=== SceneRecord =========================================================

/// A resident scene: its key, its controller, and its active flag.
///
/// Records start inactive; activation is a separate step so that load
/// and activate remain independently observable.
pub struct SceneRecord<S: SceneKey> {
    key: S,
    controller: Box<dyn SceneController<S>>,
    active: bool,
}

impl<S: SceneKey> SceneRecord<S> {
    /// Creates an inactive record for `key` owning `controller`.
    pub fn new(key: S, controller: Box<dyn SceneController<S>>) -> Self {
        Self {
            key,
            controller,
            active: false,
        }
    }

    /// The scene key this record belongs to.
    pub fn key(&self) -> S {
        self.key
    }

    /// Whether the scene is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Mutable access to the owned controller, for driving hooks.
    pub fn controller_mut(&mut self) -> &mut dyn SceneController<S> {
        self.controller.as_mut()
    }
}

impl<S: SceneKey> std::fmt::Debug for SceneRecord<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRecord")
            .field("key", &self.key)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

//=== SceneRegistry =======================================================

/// Map of resident scenes keyed by scene identifier.
///
/// Insertion rejects duplicates and removal rejects unknown keys, so the
/// registry never silently replaces a live controller.
pub struct SceneRegistry<S: SceneKey> {
    records: HashMap<S, SceneRecord<S>>,
}

impl<S: SceneKey> SceneRegistry<S> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: S) -> bool {
        self.records.contains_key(&key)
    }

    /// Shared access to the record for `key`, if registered.
    pub fn get(&self, key: S) -> Option<&SceneRecord<S>> {
        self.records.get(&key)
    }

    /// Mutable access to the record for `key`, if registered.
    pub fn get_mut(&mut self, key: S) -> Option<&mut SceneRecord<S>> {
        self.records.get_mut(&key)
    }

    /// Inserts a record, rejecting duplicates.
    pub fn insert(&mut self, record: SceneRecord<S>) -> Result<(), SceneError> {
        use std::collections::hash_map::Entry;

        match self.records.entry(record.key()) {
            Entry::Occupied(_) => Err(SceneError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Removes and returns the record for `key`.
    pub fn remove(&mut self, key: S) -> Result<SceneRecord<S>, SceneError> {
        self.records.remove(&key).ok_or(SceneError::NotFound)
    }

    /// Flips the active flag for `key`.
    ///
    /// This is raw state manipulation; hook dispatch on the edge is the
    /// manager's job.
    pub fn set_active(&mut self, key: S, active: bool) -> Result<(), SceneError> {
        let record = self.records.get_mut(&key).ok_or(SceneError::NotFound)?;
        record.set_active(active);
        Ok(())
    }

    /// Keys of all currently active scenes, in unspecified order.
    pub fn active_keys(&self) -> Vec<S> {
        self.records
            .values()
            .filter(|record| record.is_active())
            .map(|record| record.key())
            .collect()
    }

    /// Keys of all resident scenes, in unspecified order.
    pub fn loaded_keys(&self) -> Vec<S> {
        self.records.keys().copied().collect()
    }

    /// Number of resident scenes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no scenes are resident.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<S: SceneKey> Default for SceneRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
