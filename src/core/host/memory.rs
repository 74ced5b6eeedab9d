//=========================================================================
// In-Memory Scene Host
//=========================================================================
//
// A self-contained SceneHost for tests and headless embeddings. Scene
// "content" is a controller factory installed per key; loads and unloads
// complete after a configurable number of ticks so completion ordering
// can be exercised deterministically.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};

use crossbeam_channel::Sender;
use log::warn;

//=== Internal Dependencies ===============================================

use crate::core::host::{HostError, HostEvent, SceneHost};
use crate::core::scene::{SceneController, SceneKey};

//=== Internal Types ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Load,
    Unload,
}

struct HostOp<S: SceneKey> {
    key: S,
    kind: OpKind,
    remaining: u32,
}

type ControllerFactory<S> = Box<dyn FnMut() -> Box<dyn SceneController<S>>>;

//=== MemoryHost ==========================================================

/// [`SceneHost`] backed by in-process controller factories.
///
/// Each installed factory produces the controller handed out when its
/// scene finishes loading. A key with no factory still loads, but
/// [`take_controller`](SceneHost::take_controller) then fails with
/// [`HostError::MissingController`], which is how a content scene with no
/// controller behaves.
///
/// # Examples
///
/// ```rust
/// use crossbeam_channel::unbounded;
/// use stagecraft::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum GameScene { Title }
/// impl SceneKey for GameScene {}
///
/// struct TitleScene;
/// impl SceneController<GameScene> for TitleScene {}
///
/// let (tx, rx) = unbounded();
/// let mut host = MemoryHost::new(tx);
/// host.install(GameScene::Title, || Box::new(TitleScene));
///
/// host.begin_load(GameScene::Title);
/// host.tick();
///
/// assert_eq!(rx.try_recv(), Ok(HostEvent::LoadFinished(GameScene::Title)));
/// assert!(host.take_controller(GameScene::Title).is_ok());
/// ```
pub struct MemoryHost<S: SceneKey> {
    sender: Sender<HostEvent<S>>,
    factories: HashMap<S, ControllerFactory<S>>,
    loaded: HashSet<S>,
    staged: HashMap<S, Box<dyn SceneController<S>>>,
    in_flight: Vec<HostOp<S>>,
    latency: u32,
}

impl<S: SceneKey> MemoryHost<S> {
    /// Creates a host that reports completions on `sender`.
    ///
    /// Operations complete after one tick by default; see
    /// [`set_latency`](Self::set_latency).
    pub fn new(sender: Sender<HostEvent<S>>) -> Self {
        Self {
            sender,
            factories: HashMap::new(),
            loaded: HashSet::new(),
            staged: HashMap::new(),
            in_flight: Vec::new(),
            latency: 1,
        }
    }

    /// Installs the controller factory for `key`, replacing any previous
    /// one.
    pub fn install<F>(&mut self, key: S, factory: F)
    where
        F: FnMut() -> Box<dyn SceneController<S>> + 'static,
    {
        self.factories.insert(key, Box::new(factory));
    }

    /// Sets how many ticks an operation takes to complete.
    ///
    /// Clamped to at least one tick so completion is never synchronous
    /// with `begin_*`.
    pub fn set_latency(&mut self, ticks: u32) {
        self.latency = ticks.max(1);
    }

    /// Whether the host currently holds content for `key`.
    pub fn is_loaded(&self, key: S) -> bool {
        self.loaded.contains(&key)
    }

    /// Number of operations still in flight.
    pub fn pending_ops(&self) -> usize {
        self.in_flight.len()
    }

    fn complete(&mut self, key: S, kind: OpKind) {
        let event = match kind {
            OpKind::Load => {
                self.loaded.insert(key);
                if let Some(factory) = self.factories.get_mut(&key) {
                    self.staged.insert(key, factory());
                }
                HostEvent::LoadFinished(key)
            }
            OpKind::Unload => {
                self.loaded.remove(&key);
                self.staged.remove(&key);
                HostEvent::UnloadFinished(key)
            }
        };
        if self.sender.send(event).is_err() {
            warn!("Host completion receiver dropped; event discarded: {event:?}");
        }
    }
}

impl<S: SceneKey> SceneHost<S> for MemoryHost<S> {
    fn begin_load(&mut self, key: S) {
        self.in_flight.push(HostOp {
            key,
            kind: OpKind::Load,
            remaining: self.latency,
        });
    }

    fn begin_unload(&mut self, key: S) {
        self.in_flight.push(HostOp {
            key,
            kind: OpKind::Unload,
            remaining: self.latency,
        });
    }

    fn take_controller(&mut self, key: S) -> Result<Box<dyn SceneController<S>>, HostError> {
        if !self.loaded.contains(&key) {
            return Err(HostError::ContainerMissing);
        }
        self.staged.remove(&key).ok_or(HostError::MissingController)
    }

    fn tick(&mut self) {
        let mut done: Vec<(S, OpKind)> = Vec::new();
        self.in_flight.retain_mut(|op| {
            op.remaining -= 1;
            if op.remaining == 0 {
                done.push((op.key, op.kind));
                false
            } else {
                true
            }
        });
        // Completions fire in issue order.
        for (key, kind) in done {
            self.complete(key, kind);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
