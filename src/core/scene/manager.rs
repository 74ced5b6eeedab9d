//=========================================================================
// Scene Manager
//=========================================================================
//
// Orchestrates scene loads and unloads against the host.
//
// Scenes are stored in a registry by key. At most one host operation per
// scene is in flight; further requests for the same scene queue behind
// it, and back-to-back requests of the same kind coalesce into one
// operation. Aggregate operations (unload-all, fixed-set bootstrap)
// count down per-scene completions and fire exactly once.
//
// Flow:
//   load()/unload() → host begins work → handle_host_event() →
//   register/remove + lifecycle hooks + callbacks + bulk bookkeeping
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, VecDeque};

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::context::StageContext;
use crate::core::error::SceneError;
use crate::core::events::{OpEdge, StageEvent};
use crate::core::host::{HostEvent, SceneHost};
use crate::core::scene::{FixedScenes, SceneController, SceneKey, SceneRecord, SceneRegistry};
use crate::core::Completion;

//=== Outcomes ============================================================

/// How a single-scene operation was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    /// The operation needed no host work; any callback has already run.
    Completed,

    /// Host work is in flight (or queued behind in-flight work); the
    /// callback runs when this scene's operation finishes.
    Pending,
}

/// How a bulk operation was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Nothing was left to do; any callback has already run.
    Completed,

    /// Host work is in flight. The id identifies this bulk until it
    /// completes.
    Pending(u64),
}

//=== Internal Types ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Load,
    Unload,
}

struct InFlight {
    kind: OpKind,
    callbacks: Vec<Completion>,
}

struct QueuedOp {
    kind: OpKind,
    callbacks: Vec<Completion>,
}

impl QueuedOp {
    fn new(kind: OpKind, callback: Option<Completion>) -> Self {
        let mut callbacks = Vec::new();
        callbacks.extend(callback);
        Self { kind, callbacks }
    }
}

/// Per-scene operation state: the in-flight op plus queued followers.
struct PendingScene {
    current: InFlight,
    queued: VecDeque<QueuedOp>,
}

impl PendingScene {
    fn new(kind: OpKind, callback: Option<Completion>) -> Self {
        let mut callbacks = Vec::new();
        callbacks.extend(callback);
        Self {
            current: InFlight { kind, callbacks },
            queued: VecDeque::new(),
        }
    }

    /// Queues a follower op, coalescing with the tail op when the kinds
    /// match.
    fn enqueue(&mut self, kind: OpKind, callback: Option<Completion>) {
        match self.queued.back_mut() {
            Some(back) if back.kind == kind => back.callbacks.extend(callback),
            Some(_) => self.queued.push_back(QueuedOp::new(kind, callback)),
            None if self.current.kind == kind => self.current.callbacks.extend(callback),
            None => self.queued.push_back(QueuedOp::new(kind, callback)),
        }
    }
}

/// An aggregate operation waiting on a set of per-scene completions.
struct BulkOp<S: SceneKey> {
    id: u64,
    kind: OpKind,
    waiting: Vec<S>,
    on_complete: Option<Completion>,
}

//=== Scene Manager =======================================================

/// Orchestrates scene lifecycle against a [`SceneHost`].
///
/// The manager owns the registry of resident scenes and all in-flight
/// operation bookkeeping. It never blocks: `load` and `unload` start
/// host work and return, and completions arrive later through
/// [`handle_host_event`](Self::handle_host_event).
///
/// # Guarantees
///
/// - At most one host operation per scene is in flight; extra requests
///   queue behind it in order, and same-kind neighbors coalesce.
/// - Loading an already-resident scene and unloading an absent one are
///   synchronous no-ops whose callbacks still fire.
/// - Fixed scenes never unload, individually or in bulk.
/// - Bulk completion fires exactly once, counting only the scenes the
///   bulk actually waits on.
pub struct SceneManager<S: SceneKey> {
    registry: SceneRegistry<S>,
    fixed: FixedScenes<S>,
    pending: HashMap<S, PendingScene>,
    bulks: Vec<BulkOp<S>>,
    next_bulk_id: u64,
    fixed_ready: bool,
}

impl<S: SceneKey> SceneManager<S> {
    //--- Construction -----------------------------------------------------

    /// Creates a manager with the given fixed scene set.
    pub fn new(fixed: FixedScenes<S>) -> Self {
        Self {
            registry: SceneRegistry::new(),
            fixed,
            pending: HashMap::new(),
            bulks: Vec::new(),
            next_bulk_id: 0,
            fixed_ready: false,
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Shared access to the registry.
    pub fn registry(&self) -> &SceneRegistry<S> {
        &self.registry
    }

    /// The fixed scene set.
    pub fn fixed_scenes(&self) -> &FixedScenes<S> {
        &self.fixed
    }

    /// Whether `key` is resident.
    pub fn is_loaded(&self, key: S) -> bool {
        self.registry.contains(key)
    }

    /// Whether `key` is resident and active.
    pub fn is_active(&self, key: S) -> bool {
        self.registry.get(key).is_some_and(|record| record.is_active())
    }

    /// Keys of all resident scenes, in unspecified order.
    pub fn loaded_scenes(&self) -> Vec<S> {
        self.registry.loaded_keys()
    }

    /// Keys of all active scenes, in unspecified order.
    pub fn active_scenes(&self) -> Vec<S> {
        self.registry.active_keys()
    }

    /// Whether a host operation for `key` is in flight or queued.
    pub fn has_pending_op(&self, key: S) -> bool {
        self.pending.contains_key(&key)
    }

    /// Mutable access to the controller of a resident scene.
    pub fn controller_mut(&mut self, key: S) -> Option<&mut dyn SceneController<S>> {
        self.registry.get_mut(key).map(|record| record.controller_mut())
    }

    /// Whether every fixed scene has been resident at least once.
    ///
    /// Sticky: once the whole fixed set has loaded this stays true for
    /// the life of the manager.
    pub fn fixed_set_ready(&mut self) -> bool {
        if !self.fixed_ready {
            self.fixed_ready = self.fixed.iter().all(|key| self.registry.contains(key));
        }
        self.fixed_ready
    }

    //--- Registration -----------------------------------------------------

    /// Registers a scene, driving its introduction hooks.
    ///
    /// With `Some(controller)` the caller supplies the controller
    /// directly. With `None` the controller is pulled from the host,
    /// which is how scenes auto-register when their load completes; a
    /// host that cannot supply one fails the registration and a
    /// [`StageEvent::RegistrationFailed`] is emitted.
    ///
    /// On success `on_awake` has run, the scene is resident and
    /// inactive, and `on_start` has run. Duplicate keys are rejected
    /// without touching the existing record.
    pub fn register<H: SceneHost<S>>(
        &mut self,
        key: S,
        controller: Option<Box<dyn SceneController<S>>>,
        host: &mut H,
        context: &mut StageContext<S>,
    ) -> Result<(), SceneError> {
        if self.registry.contains(key) {
            debug!("Scene {key:?} is already registered");
            return Err(SceneError::AlreadyExists);
        }

        let mut controller = match controller {
            Some(controller) => controller,
            None => match host.take_controller(key) {
                Ok(controller) => controller,
                Err(err) => {
                    error!("Could not auto-register scene {key:?}: {err}");
                    context.push_event(StageEvent::RegistrationFailed(key));
                    return Err(err.into());
                }
            },
        };

        controller.on_awake(context);
        self.registry.insert(SceneRecord::new(key, controller))?;
        if let Some(record) = self.registry.get_mut(key) {
            record.controller_mut().on_start(context);
        }
        debug!("Scene {key:?} registered");
        Ok(())
    }

    //--- Single-Scene Operations ------------------------------------------

    /// Loads `key` through the host.
    ///
    /// Already-resident scenes complete synchronously as a no-op: the
    /// callback fires and nothing is re-activated. If an operation for
    /// `key` is already in flight the request queues behind it.
    pub fn load<H: SceneHost<S>>(
        &mut self,
        key: S,
        host: &mut H,
        _context: &mut StageContext<S>,
        on_complete: Option<Completion>,
    ) -> OpOutcome {
        if let Some(pending) = self.pending.get_mut(&key) {
            pending.enqueue(OpKind::Load, on_complete);
            return OpOutcome::Pending;
        }
        if self.registry.contains(key) {
            debug!("Load of {key:?} is a no-op; already resident");
            if let Some(callback) = on_complete {
                callback();
            }
            return OpOutcome::Completed;
        }

        host.begin_load(key);
        self.pending
            .insert(key, PendingScene::new(OpKind::Load, on_complete));
        debug!("Load of {key:?} started");
        OpOutcome::Pending
    }

    /// Unloads `key` through the host.
    ///
    /// Fixed scenes are refused with a warning; the refusal drops the
    /// callback. Absent scenes complete synchronously as a no-op whose
    /// callback still fires. A resident scene is finalized and
    /// deactivated before the host begins unloading it, whether or not
    /// it was active.
    pub fn unload<H: SceneHost<S>>(
        &mut self,
        key: S,
        host: &mut H,
        context: &mut StageContext<S>,
        on_complete: Option<Completion>,
    ) -> OpOutcome {
        if self.fixed.contains(key) {
            warn!("Refusing to unload fixed scene {key:?}");
            return OpOutcome::Completed;
        }
        if let Some(pending) = self.pending.get_mut(&key) {
            pending.enqueue(OpKind::Unload, on_complete);
            return OpOutcome::Pending;
        }
        if !self.registry.contains(key) {
            debug!("Unload of {key:?} is a no-op; not resident");
            if let Some(callback) = on_complete {
                callback();
            }
            return OpOutcome::Completed;
        }

        self.begin_unload_now(key, host, context);
        self.pending
            .insert(key, PendingScene::new(OpKind::Unload, on_complete));
        OpOutcome::Pending
    }

    fn begin_unload_now<H: SceneHost<S>>(
        &mut self,
        key: S,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        // Finalize runs before every unload, even for a scene that was
        // already deactivated.
        if let Some(record) = self.registry.get_mut(key) {
            record.controller_mut().finalize(context);
            record.set_active(false);
        }
        host.begin_unload(key);
        debug!("Unload of {key:?} started");
    }

    /// Flips the active flag of a resident scene, driving the edge
    /// hooks.
    ///
    /// `initialize` fires on every inactive-to-active edge and
    /// `finalize` on every active-to-inactive edge; repeating the
    /// current state fires nothing. Unregistered keys are ignored.
    pub fn activate(&mut self, key: S, active: bool, context: &mut StageContext<S>) {
        let Some(record) = self.registry.get_mut(key) else {
            debug!("Activate ignored; {key:?} is not resident");
            return;
        };
        let was_active = record.is_active();
        record.set_active(active);
        if active && !was_active {
            record.controller_mut().initialize(context);
        } else if !active && was_active {
            record.controller_mut().finalize(context);
        }
    }

    //--- Bulk Operations --------------------------------------------------

    /// Unloads every resident scene outside the fixed set.
    ///
    /// The waiting set is snapshotted now; scenes that finish loading
    /// after this call are not swept up. Completion fires exactly once,
    /// when the last snapshotted scene has unloaded, or synchronously
    /// when there is nothing to unload.
    pub fn unload_all_except_fixed<H: SceneHost<S>>(
        &mut self,
        host: &mut H,
        context: &mut StageContext<S>,
        on_complete: Option<Completion>,
    ) -> BulkOutcome {
        let waiting: Vec<S> = self
            .registry
            .loaded_keys()
            .into_iter()
            .filter(|key| !self.fixed.contains(*key))
            .collect();

        if waiting.is_empty() {
            debug!("No non-fixed scenes to unload");
            if let Some(callback) = on_complete {
                callback();
            }
            context.push_event(StageEvent::UnloadAllFinished);
            return BulkOutcome::Completed;
        }

        let id = self.next_bulk_id;
        self.next_bulk_id += 1;
        info!("Unloading {} scenes (bulk {id})", waiting.len());

        // The bulk is registered before any unload is issued, so a
        // completion can never race past the bookkeeping.
        self.bulks.push(BulkOp {
            id,
            kind: OpKind::Unload,
            waiting: waiting.clone(),
            on_complete,
        });
        for key in waiting {
            self.unload(key, host, context, None);
        }
        BulkOutcome::Pending(id)
    }

    /// Loads every fixed scene, in fixed-set order.
    ///
    /// Intended for bootstrap. Already-resident fixed scenes are
    /// skipped; completion fires once when the remainder have loaded,
    /// or synchronously when the whole set is already resident.
    pub fn load_fixed_scenes<H: SceneHost<S>>(
        &mut self,
        host: &mut H,
        context: &mut StageContext<S>,
        on_complete: Option<Completion>,
    ) -> BulkOutcome {
        let keys: Vec<S> = self.fixed.iter().collect();
        let mut waiting = Vec::new();
        for key in keys {
            if let OpOutcome::Pending = self.load(key, host, context, None) {
                waiting.push(key);
            }
        }

        if waiting.is_empty() {
            debug!("Fixed scene set already resident");
            self.fixed_ready = true;
            if let Some(callback) = on_complete {
                callback();
            }
            context.push_event(StageEvent::FixedScenesLoaded);
            return BulkOutcome::Completed;
        }

        let id = self.next_bulk_id;
        self.next_bulk_id += 1;
        info!("Loading {} fixed scenes (bulk {id})", waiting.len());
        self.bulks.push(BulkOp {
            id,
            kind: OpKind::Load,
            waiting,
            on_complete,
        });
        BulkOutcome::Pending(id)
    }

    //--- Host Completion Handling -----------------------------------------

    /// Applies a host completion event.
    ///
    /// The embedding pumps these in on its tick, in the order the host
    /// sent them.
    pub fn handle_host_event<H: SceneHost<S>>(
        &mut self,
        event: HostEvent<S>,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        match event {
            HostEvent::LoadFinished(key) => self.finish_load(key, host, context),
            HostEvent::UnloadFinished(key) => self.finish_unload(key, host, context),
        }
    }

    fn finish_load<H: SceneHost<S>>(
        &mut self,
        key: S,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        let Some(mut pending) = self.pending.remove(&key) else {
            warn!("Unsolicited load completion for {key:?}");
            return;
        };
        if pending.current.kind != OpKind::Load {
            warn!("Load completion for {key:?} while an unload is in flight");
            self.pending.insert(key, pending);
            return;
        }

        match self.register(key, None, host, context) {
            Ok(()) | Err(SceneError::AlreadyExists) => {
                self.activate(key, true, context);
                context.push_event(StageEvent::SceneLoaded(key));
            }
            // register already logged and reported the failure; the
            // content stays resident in the host without a controller.
            Err(_) => {}
        }
        context.push_edge(OpEdge::Loaded(key));

        for callback in pending.current.callbacks.drain(..) {
            callback();
        }
        self.discharge_bulks(OpKind::Load, key, context);
        self.start_next(key, pending.queued, host, context);
    }

    fn finish_unload<H: SceneHost<S>>(
        &mut self,
        key: S,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        let Some(mut pending) = self.pending.remove(&key) else {
            warn!("Unsolicited unload completion for {key:?}");
            return;
        };
        if pending.current.kind != OpKind::Unload {
            warn!("Unload completion for {key:?} while a load is in flight");
            self.pending.insert(key, pending);
            return;
        }

        match self.registry.remove(key) {
            Ok(_record) => {
                debug!("Scene {key:?} unloaded");
                context.push_event(StageEvent::SceneUnloaded(key));
            }
            Err(_) => warn!("Unload completion for {key:?}, which was not resident"),
        }

        for callback in pending.current.callbacks.drain(..) {
            callback();
        }
        self.discharge_bulks(OpKind::Unload, key, context);
        self.start_next(key, pending.queued, host, context);
    }

    /// Strikes `key` off every matching bulk and fires the ones that
    /// just emptied.
    fn discharge_bulks(&mut self, kind: OpKind, key: S, context: &mut StageContext<S>) {
        let mut fired: Vec<(u64, OpKind, Option<Completion>)> = Vec::new();
        self.bulks.retain_mut(|bulk| {
            if bulk.kind != kind {
                return true;
            }
            bulk.waiting.retain(|waiting| *waiting != key);
            if bulk.waiting.is_empty() {
                fired.push((bulk.id, bulk.kind, bulk.on_complete.take()));
                false
            } else {
                true
            }
        });

        for (id, kind, callback) in fired {
            match kind {
                OpKind::Unload => {
                    info!("Bulk unload {id} complete");
                    context.push_event(StageEvent::UnloadAllFinished);
                    context.push_edge(OpEdge::BulkUnloadDone(id));
                }
                OpKind::Load => {
                    info!("Fixed scene set loaded (bulk {id})");
                    self.fixed_ready = true;
                    context.push_event(StageEvent::FixedScenesLoaded);
                }
            }
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Starts the next queued op for `key`, skipping ops the registry
    /// already satisfies.
    fn start_next<H: SceneHost<S>>(
        &mut self,
        key: S,
        mut queued: VecDeque<QueuedOp>,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        while let Some(op) = queued.pop_front() {
            match op.kind {
                OpKind::Load => {
                    if self.registry.contains(key) {
                        debug!("Queued load of {key:?} is a no-op; already resident");
                        for callback in op.callbacks {
                            callback();
                        }
                        continue;
                    }
                    host.begin_load(key);
                    debug!("Queued load of {key:?} started");
                    self.pending.insert(
                        key,
                        PendingScene {
                            current: InFlight {
                                kind: OpKind::Load,
                                callbacks: op.callbacks,
                            },
                            queued,
                        },
                    );
                    return;
                }
                OpKind::Unload => {
                    if !self.registry.contains(key) {
                        debug!("Queued unload of {key:?} is a no-op; not resident");
                        for callback in op.callbacks {
                            callback();
                        }
                        continue;
                    }
                    self.begin_unload_now(key, host, context);
                    self.pending.insert(
                        key,
                        PendingScene {
                            current: InFlight {
                                kind: OpKind::Unload,
                                callbacks: op.callbacks,
                            },
                            queued,
                        },
                    );
                    return;
                }
            }
        }
    }

    //--- Transition Support -----------------------------------------------

    pub(crate) fn notify_transition_complete(&mut self, key: S, context: &mut StageContext<S>) {
        if let Some(record) = self.registry.get_mut(key) {
            record.controller_mut().on_transition_complete(context);
        }
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::MemoryHost;
    use crossbeam_channel::{unbounded, Receiver};
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestScene {
        Boot,
        Hud,
        Title,
        Stage,
    }

    impl SceneKey for TestScene {}

    impl SceneKey for u32 {}

    //--- Probes -----------------------------------------------------------

    type HookLog = Rc<RefCell<Vec<&'static str>>>;

    struct ProbeController {
        log: HookLog,
    }

    impl SceneController<TestScene> for ProbeController {
        fn on_awake(&mut self, _context: &mut StageContext<TestScene>) {
            self.log.borrow_mut().push("awake");
        }
        fn on_start(&mut self, _context: &mut StageContext<TestScene>) {
            self.log.borrow_mut().push("start");
        }
        fn initialize(&mut self, _context: &mut StageContext<TestScene>) {
            self.log.borrow_mut().push("initialize");
        }
        fn finalize(&mut self, _context: &mut StageContext<TestScene>) {
            self.log.borrow_mut().push("finalize");
        }
        fn on_transition_complete(&mut self, _context: &mut StageContext<TestScene>) {
            self.log.borrow_mut().push("transition_complete");
        }
    }

    struct NullController;

    impl SceneController<TestScene> for NullController {}

    struct NullU32Controller;

    impl SceneController<u32> for NullU32Controller {}

    //--- Rig --------------------------------------------------------------

    struct Rig {
        scenes: SceneManager<TestScene>,
        host: MemoryHost<TestScene>,
        rx: Receiver<HostEvent<TestScene>>,
        context: StageContext<TestScene>,
    }

    impl Rig {
        fn new(fixed: impl IntoIterator<Item = TestScene>) -> Self {
            let (tx, rx) = unbounded();
            let mut host = MemoryHost::new(tx);
            for key in [
                TestScene::Boot,
                TestScene::Hud,
                TestScene::Title,
                TestScene::Stage,
            ] {
                host.install(key, || Box::new(NullController));
            }
            Self {
                scenes: SceneManager::new(FixedScenes::new(fixed)),
                host,
                rx,
                context: StageContext::new(),
            }
        }

        /// Pumps host ticks and completion events until quiescent.
        fn settle(&mut self) {
            loop {
                self.host.tick();
                let mut progressed = false;
                while let Ok(event) = self.rx.try_recv() {
                    progressed = true;
                    self.scenes
                        .handle_host_event(event, &mut self.host, &mut self.context);
                }
                if !progressed && self.host.pending_ops() == 0 {
                    break;
                }
            }
        }

        fn events(&mut self) -> Vec<StageEvent<TestScene>> {
            self.context.drain_events()
        }
    }

    fn counter() -> (Rc<Cell<u32>>, Completion) {
        let fired = Rc::new(Cell::new(0));
        let inner = Rc::clone(&fired);
        (fired, Box::new(move || inner.set(inner.get() + 1)))
    }

    //--- Single-Scene Tests -----------------------------------------------

    #[test]
    fn load_registers_activates_and_runs_hooks_in_order() {
        let mut rig = Rig::new([]);
        let log: HookLog = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&log);
        rig.host.install(TestScene::Title, move || {
            Box::new(ProbeController {
                log: Rc::clone(&probe),
            })
        });

        let (fired, callback) = counter();
        let outcome = rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );
        assert_eq!(outcome, OpOutcome::Pending);
        assert!(!rig.scenes.is_loaded(TestScene::Title));

        rig.settle();

        assert!(rig.scenes.is_loaded(TestScene::Title));
        assert!(rig.scenes.is_active(TestScene::Title));
        assert_eq!(*log.borrow(), vec!["awake", "start", "initialize"]);
        assert_eq!(fired.get(), 1);
        assert!(rig
            .events()
            .contains(&StageEvent::SceneLoaded(TestScene::Title)));
    }

    #[test]
    fn loading_resident_scene_is_synchronous_noop() {
        let mut rig = Rig::new([]);
        rig.scenes
            .load(TestScene::Title, &mut rig.host, &mut rig.context, None);
        rig.settle();
        rig.events();

        let (fired, callback) = counter();
        let outcome = rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );

        assert_eq!(outcome, OpOutcome::Completed);
        assert_eq!(fired.get(), 1);
        assert_eq!(rig.host.pending_ops(), 0);
        // No second SceneLoaded is observed.
        assert!(rig.events().is_empty());
    }

    #[test]
    fn concurrent_loads_coalesce_into_one_host_op() {
        let mut rig = Rig::new([]);
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(first_cb),
        );
        rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(second_cb),
        );

        assert_eq!(rig.host.pending_ops(), 1);
        rig.settle();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn unload_finalizes_and_removes() {
        let mut rig = Rig::new([]);
        let log: HookLog = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&log);
        rig.host.install(TestScene::Title, move || {
            Box::new(ProbeController {
                log: Rc::clone(&probe),
            })
        });
        rig.scenes
            .load(TestScene::Title, &mut rig.host, &mut rig.context, None);
        rig.settle();
        rig.events();

        let (fired, callback) = counter();
        let outcome = rig.scenes.unload(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );
        assert_eq!(outcome, OpOutcome::Pending);
        // Finalize runs when the unload begins, not when it completes.
        assert_eq!(
            *log.borrow(),
            vec!["awake", "start", "initialize", "finalize"]
        );

        rig.settle();
        assert!(!rig.scenes.is_loaded(TestScene::Title));
        assert_eq!(fired.get(), 1);
        assert!(rig
            .events()
            .contains(&StageEvent::SceneUnloaded(TestScene::Title)));
    }

    #[test]
    fn unload_finalizes_even_when_inactive() {
        let mut rig = Rig::new([]);
        let log: HookLog = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&log);
        rig.host.install(TestScene::Title, move || {
            Box::new(ProbeController {
                log: Rc::clone(&probe),
            })
        });
        rig.scenes
            .load(TestScene::Title, &mut rig.host, &mut rig.context, None);
        rig.settle();
        rig.scenes
            .activate(TestScene::Title, false, &mut rig.context);
        log.borrow_mut().clear();

        rig.scenes
            .unload(TestScene::Title, &mut rig.host, &mut rig.context, None);

        // The pre-unload finalize fires even though the scene is already
        // inactive.
        assert_eq!(*log.borrow(), vec!["finalize"]);
    }

    #[test]
    fn unloading_absent_scene_is_synchronous_noop() {
        let mut rig = Rig::new([]);
        let (fired, callback) = counter();

        let outcome = rig.scenes.unload(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );

        assert_eq!(outcome, OpOutcome::Completed);
        assert_eq!(fired.get(), 1);
        assert_eq!(rig.host.pending_ops(), 0);
    }

    #[test]
    fn fixed_scene_refuses_unload_and_drops_callback() {
        let mut rig = Rig::new([TestScene::Boot]);
        rig.scenes
            .load(TestScene::Boot, &mut rig.host, &mut rig.context, None);
        rig.settle();

        let (fired, callback) = counter();
        let outcome = rig.scenes.unload(
            TestScene::Boot,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );

        assert_eq!(outcome, OpOutcome::Completed);
        rig.settle();
        assert!(rig.scenes.is_loaded(TestScene::Boot));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn opposite_ops_queue_behind_in_flight_work() {
        let mut rig = Rig::new([]);
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let load_probe = Rc::clone(&order);
        rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(Box::new(move || load_probe.borrow_mut().push("loaded"))),
        );
        let unload_probe = Rc::clone(&order);
        let outcome = rig.scenes.unload(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(Box::new(move || unload_probe.borrow_mut().push("unloaded"))),
        );
        assert_eq!(outcome, OpOutcome::Pending);
        // One host op at a time for this scene.
        assert_eq!(rig.host.pending_ops(), 1);

        rig.settle();

        assert_eq!(*order.borrow(), vec!["loaded", "unloaded"]);
        assert!(!rig.scenes.is_loaded(TestScene::Title));
        assert!(!rig.scenes.has_pending_op(TestScene::Title));
    }

    #[test]
    fn activate_edges_pair_initialize_and_finalize() {
        let mut rig = Rig::new([]);
        let log: HookLog = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&log);
        rig.host.install(TestScene::Title, move || {
            Box::new(ProbeController {
                log: Rc::clone(&probe),
            })
        });
        rig.scenes
            .load(TestScene::Title, &mut rig.host, &mut rig.context, None);
        rig.settle();
        log.borrow_mut().clear();

        // Re-activating an active scene fires nothing.
        rig.scenes.activate(TestScene::Title, true, &mut rig.context);
        assert!(log.borrow().is_empty());

        rig.scenes.activate(TestScene::Title, false, &mut rig.context);
        rig.scenes.activate(TestScene::Title, false, &mut rig.context);
        rig.scenes.activate(TestScene::Title, true, &mut rig.context);

        assert_eq!(*log.borrow(), vec!["finalize", "initialize"]);
    }

    #[test]
    fn manual_registration_runs_hooks_and_rejects_duplicates() {
        let mut rig = Rig::new([]);
        let log: HookLog = Rc::new(RefCell::new(Vec::new()));

        let result = rig.scenes.register(
            TestScene::Title,
            Some(Box::new(ProbeController {
                log: Rc::clone(&log),
            })),
            &mut rig.host,
            &mut rig.context,
        );
        assert!(result.is_ok());
        assert_eq!(*log.borrow(), vec!["awake", "start"]);
        assert!(rig.scenes.is_loaded(TestScene::Title));
        assert!(!rig.scenes.is_active(TestScene::Title));

        let duplicate = rig.scenes.register(
            TestScene::Title,
            Some(Box::new(NullController)),
            &mut rig.host,
            &mut rig.context,
        );
        assert_eq!(duplicate, Err(SceneError::AlreadyExists));
    }

    #[test]
    fn registration_failure_surfaces_event_but_load_still_completes() {
        let mut rig = Rig::new([]);
        // A host with no factories cannot supply controllers.
        let (tx, rx) = unbounded();
        rig.host = MemoryHost::new(tx);
        rig.rx = rx;

        let (fired, callback) = counter();
        rig.scenes.load(
            TestScene::Title,
            &mut rig.host,
            &mut rig.context,
            Some(callback),
        );
        rig.settle();

        assert!(!rig.scenes.is_loaded(TestScene::Title));
        assert_eq!(fired.get(), 1);
        let events = rig.events();
        assert!(events.contains(&StageEvent::RegistrationFailed(TestScene::Title)));
        assert!(!events.contains(&StageEvent::SceneLoaded(TestScene::Title)));
    }

    //--- Bulk Tests -------------------------------------------------------

    #[test]
    fn unload_all_spares_fixed_and_completes_exactly_once() {
        let mut rig = Rig::new([TestScene::Boot, TestScene::Hud]);
        for key in [
            TestScene::Boot,
            TestScene::Hud,
            TestScene::Title,
            TestScene::Stage,
        ] {
            rig.scenes.load(key, &mut rig.host, &mut rig.context, None);
        }
        rig.settle();
        rig.events();

        let (fired, callback) = counter();
        let outcome =
            rig.scenes
                .unload_all_except_fixed(&mut rig.host, &mut rig.context, Some(callback));
        assert!(matches!(outcome, BulkOutcome::Pending(_)));

        rig.settle();

        assert_eq!(fired.get(), 1);
        assert!(rig.scenes.is_loaded(TestScene::Boot));
        assert!(rig.scenes.is_loaded(TestScene::Hud));
        assert!(!rig.scenes.is_loaded(TestScene::Title));
        assert!(!rig.scenes.is_loaded(TestScene::Stage));

        let finishes = rig
            .events()
            .into_iter()
            .filter(|event| *event == StageEvent::UnloadAllFinished)
            .count();
        assert_eq!(finishes, 1);
    }

    #[test]
    fn unload_all_with_nothing_to_do_completes_synchronously() {
        let mut rig = Rig::new([TestScene::Boot]);
        rig.scenes
            .load(TestScene::Boot, &mut rig.host, &mut rig.context, None);
        rig.settle();
        rig.events();

        let (fired, callback) = counter();
        let outcome =
            rig.scenes
                .unload_all_except_fixed(&mut rig.host, &mut rig.context, Some(callback));

        assert_eq!(outcome, BulkOutcome::Completed);
        assert_eq!(fired.get(), 1);
        assert!(rig.events().contains(&StageEvent::UnloadAllFinished));
    }

    #[test]
    fn load_fixed_scenes_bootstraps_whole_set() {
        let mut rig = Rig::new([TestScene::Boot, TestScene::Hud]);
        assert!(!rig.scenes.fixed_set_ready());

        let (fired, callback) = counter();
        let outcome =
            rig.scenes
                .load_fixed_scenes(&mut rig.host, &mut rig.context, Some(callback));
        assert!(matches!(outcome, BulkOutcome::Pending(_)));

        rig.settle();

        assert_eq!(fired.get(), 1);
        assert!(rig.scenes.fixed_set_ready());
        assert!(rig.scenes.is_loaded(TestScene::Boot));
        assert!(rig.scenes.is_loaded(TestScene::Hud));
        assert!(rig.events().contains(&StageEvent::FixedScenesLoaded));
    }

    #[test]
    fn load_fixed_scenes_skips_resident_members() {
        let mut rig = Rig::new([TestScene::Boot, TestScene::Hud]);
        rig.scenes
            .load(TestScene::Boot, &mut rig.host, &mut rig.context, None);
        rig.settle();

        rig.scenes
            .load_fixed_scenes(&mut rig.host, &mut rig.context, None);
        // Only Hud still needs host work.
        assert_eq!(rig.host.pending_ops(), 1);
        rig.settle();
        assert!(rig.scenes.fixed_set_ready());
    }

    #[test]
    fn fixed_set_ready_reflects_partial_bootstrap() {
        let mut rig = Rig::new([TestScene::Boot, TestScene::Hud]);
        rig.scenes
            .load(TestScene::Boot, &mut rig.host, &mut rig.context, None);
        rig.settle();

        assert!(!rig.scenes.fixed_set_ready());

        rig.scenes
            .load(TestScene::Hud, &mut rig.host, &mut rig.context, None);
        rig.settle();

        assert!(rig.scenes.fixed_set_ready());
    }

    //--- Properties -------------------------------------------------------

    fn settle_u32(
        host: &mut MemoryHost<u32>,
        rx: &Receiver<HostEvent<u32>>,
        scenes: &mut SceneManager<u32>,
        context: &mut StageContext<u32>,
    ) {
        loop {
            host.tick();
            let mut progressed = false;
            while let Ok(event) = rx.try_recv() {
                progressed = true;
                scenes.handle_host_event(event, host, context);
            }
            if !progressed && host.pending_ops() == 0 {
                break;
            }
        }
    }

    proptest! {
        /// Any request sequence settles to the state of its last
        /// request, and every callback fires exactly once.
        #[test]
        fn request_interleavings_settle_to_last_request(
            requests in proptest::collection::vec(any::<bool>(), 1..12),
        ) {
            let (tx, rx) = unbounded();
            let mut host = MemoryHost::new(tx);
            host.install(7u32, || Box::new(NullU32Controller));
            let mut scenes = SceneManager::new(FixedScenes::default());
            let mut context = StageContext::new();
            let fired = Rc::new(Cell::new(0u32));

            for load in &requests {
                let probe = Rc::clone(&fired);
                let callback: Completion = Box::new(move || probe.set(probe.get() + 1));
                if *load {
                    scenes.load(7u32, &mut host, &mut context, Some(callback));
                } else {
                    scenes.unload(7u32, &mut host, &mut context, Some(callback));
                }
            }
            settle_u32(&mut host, &rx, &mut scenes, &mut context);

            let want_loaded = *requests.last().unwrap();
            prop_assert_eq!(scenes.is_loaded(7u32), want_loaded);
            prop_assert!(!scenes.has_pending_op(7u32));
            prop_assert_eq!(fired.get(), requests.len() as u32);
        }

        /// For any resident set and any fixed set, bulk unload removes
        /// exactly the non-fixed members and completes exactly once.
        #[test]
        fn bulk_unload_spares_fixed_for_any_registry(
            loaded in proptest::collection::hash_set(0u32..24, 0..12),
            fixed in proptest::collection::hash_set(0u32..24, 0..6),
        ) {
            let (tx, rx) = unbounded();
            let mut host = MemoryHost::new(tx);
            for key in &loaded {
                host.install(*key, || Box::new(NullU32Controller));
            }
            let mut scenes = SceneManager::new(FixedScenes::new(fixed.iter().copied()));
            let mut context = StageContext::new();

            for key in &loaded {
                scenes.load(*key, &mut host, &mut context, None);
            }
            settle_u32(&mut host, &rx, &mut scenes, &mut context);

            let fired = Rc::new(Cell::new(0u32));
            let probe = Rc::clone(&fired);
            scenes.unload_all_except_fixed(
                &mut host,
                &mut context,
                Some(Box::new(move || probe.set(probe.get() + 1))),
            );
            settle_u32(&mut host, &rx, &mut scenes, &mut context);

            prop_assert_eq!(fired.get(), 1);
            for key in &loaded {
                prop_assert_eq!(scenes.is_loaded(*key), fixed.contains(key));
            }
            let finishes = context
                .drain_events()
                .into_iter()
                .filter(|event| *event == StageEvent::UnloadAllFinished)
                .count();
            prop_assert_eq!(finishes, 1);
        }
    }
}
