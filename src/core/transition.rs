//=========================================================================
// Transition Coordinator
//=========================================================================
//
// Fade-gated scene swaps, driven as an explicit state machine:
//
//   Idle → FadingOut → Unloading → Loading → FadingIn → Idle
//                 (additive skips Unloading)
//
// The driver never blocks. Each phase ends on a completion edge (fade
// finished, bulk unload finished, scene loaded) routed in by the stage,
// and phases whose work completes synchronously advance inline.
//
// One transition at a time. Requests made while a transition or a fade
// is in flight are rejected, never queued.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::context::StageContext;
use crate::core::error::SceneError;
use crate::core::events::StageEvent;
use crate::core::fade::{FadeDirection, FadeDriver, FadeOutcome};
use crate::core::host::SceneHost;
use crate::core::scene::{BulkOutcome, OpOutcome, SceneKey, SceneManager};
use crate::core::Completion;

//=== TransitionRequest ===================================================

/// A request for a coordinated scene transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest<S: SceneKey> {
    /// Scene to land on.
    pub target: S,

    /// Keep current non-fixed scenes resident instead of unloading them.
    pub additive: bool,
}

//=== Transition Queue ====================================================

/// Queue for transition requests.
///
/// Controllers queue requests here during lifecycle hooks. The stage
/// processes the queue at tick boundaries.
pub struct TransitionQueue<S: SceneKey> {
    queue: Vec<TransitionRequest<S>>,
}

impl<S: SceneKey> TransitionQueue<S> {
    /// Creates a new empty transition queue.
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues a request to be processed at the next tick boundary.
    pub fn push(&mut self, request: TransitionRequest<S>) {
        self.queue.push(request);
    }

    /// Returns an iterator over the queued requests.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRequest<S>> {
        self.queue.iter()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued requests.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Clears all queued requests.
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    /// Takes all requests from the queue, leaving it empty.
    pub fn take(&mut self) -> Vec<TransitionRequest<S>> {
        std::mem::take(&mut self.queue)
    }
}

impl<S: SceneKey> Default for TransitionQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=== TransitionPhase =====================================================

/// Where a transition currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// No transition in flight.
    Idle,

    /// Fading the overlay to opaque.
    FadingOut,

    /// Bulk-unloading non-fixed scenes behind the overlay.
    Unloading,

    /// Loading the target scene behind the overlay.
    Loading,

    /// Fading the overlay back to transparent.
    FadingIn,
}

//=== TransitionDriver ====================================================

/// State machine coordinating fade, unload, and load into one scene
/// swap.
///
/// Owned by [`Stage`](crate::Stage), which routes completion edges into
/// the `handle_*` methods as they surface. Every phase advance happens
/// on the stage's thread; there is no internal concurrency.
pub struct TransitionDriver<S: SceneKey> {
    phase: TransitionPhase,
    target: Option<S>,
    additive: bool,
    waiting_bulk: Option<u64>,
    on_load: Option<Completion>,
    on_done: Option<Completion>,
}

impl<S: SceneKey> TransitionDriver<S> {
    pub fn new() -> Self {
        Self {
            phase: TransitionPhase::Idle,
            target: None,
            additive: false,
            waiting_bulk: None,
            on_load: None,
            on_done: None,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// Whether no transition is in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == TransitionPhase::Idle
    }

    /// Starts a transition to `target`.
    ///
    /// `on_load` fires once the target scene is resident, still behind
    /// the opaque overlay; `on_done` fires after the fade back in. When
    /// every phase completes synchronously the whole transition runs
    /// inside this call.
    ///
    /// Rejected with [`SceneError::TransitionBusy`] while another
    /// transition is in flight, and with [`SceneError::FadeBusy`] while
    /// a caller-driven fade is running. Neither rejection disturbs the
    /// work already in progress.
    pub(crate) fn begin<H: SceneHost<S>>(
        &mut self,
        target: S,
        additive: bool,
        on_load: Option<Completion>,
        on_done: Option<Completion>,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        host: &mut H,
        context: &mut StageContext<S>,
    ) -> Result<(), SceneError> {
        if !self.is_idle() {
            warn!(
                "Transition to {target:?} rejected: already {:?}",
                self.phase
            );
            return Err(SceneError::TransitionBusy);
        }
        if fade.is_fading() {
            warn!("Transition to {target:?} rejected: a fade is in progress");
            return Err(SceneError::FadeBusy);
        }

        info!("Transition to {target:?} started (additive: {additive})");
        self.phase = TransitionPhase::FadingOut;
        self.target = Some(target);
        self.additive = additive;
        self.on_load = on_load;
        self.on_done = on_done;

        match fade.fade_out(None) {
            Ok(FadeOutcome::Started) => Ok(()),
            Ok(FadeOutcome::Completed) => {
                self.proceed_after_fade_out(scenes, fade, host, context);
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Routes a finished fade into the state machine.
    ///
    /// Fades that finish while the driver is not waiting on that
    /// direction (caller-driven fades, mostly) are ignored.
    pub(crate) fn handle_fade_finished<H: SceneHost<S>>(
        &mut self,
        direction: FadeDirection,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        match (self.phase, direction) {
            (TransitionPhase::FadingOut, FadeDirection::Out) => {
                self.proceed_after_fade_out(scenes, fade, host, context);
            }
            (TransitionPhase::FadingIn, FadeDirection::In) => {
                self.finish(scenes, context);
            }
            _ => {}
        }
    }

    /// Routes a finished bulk unload into the state machine.
    pub(crate) fn handle_bulk_unload_finished<H: SceneHost<S>>(
        &mut self,
        id: u64,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        if self.phase == TransitionPhase::Unloading && self.waiting_bulk == Some(id) {
            self.waiting_bulk = None;
            self.start_load(scenes, fade, host, context);
        }
    }

    /// Routes a finished scene load into the state machine.
    pub(crate) fn handle_scene_loaded(
        &mut self,
        key: S,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        context: &mut StageContext<S>,
    ) {
        if self.phase == TransitionPhase::Loading && self.target == Some(key) {
            self.complete_load(scenes, fade, context);
        }
    }

    //--- Phase Advancement -----------------------------------------------

    fn proceed_after_fade_out<H: SceneHost<S>>(
        &mut self,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        if self.additive {
            self.start_load(scenes, fade, host, context);
            return;
        }

        self.phase = TransitionPhase::Unloading;
        match scenes.unload_all_except_fixed(host, context, None) {
            BulkOutcome::Completed => self.start_load(scenes, fade, host, context),
            BulkOutcome::Pending(id) => self.waiting_bulk = Some(id),
        }
    }

    fn start_load<H: SceneHost<S>>(
        &mut self,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        host: &mut H,
        context: &mut StageContext<S>,
    ) {
        self.phase = TransitionPhase::Loading;
        let Some(target) = self.target else {
            warn!("Transition lost its target; resetting");
            self.reset();
            return;
        };
        match scenes.load(target, host, context, None) {
            OpOutcome::Completed => self.complete_load(scenes, fade, context),
            OpOutcome::Pending => {}
        }
    }

    fn complete_load(
        &mut self,
        scenes: &mut SceneManager<S>,
        fade: &mut FadeDriver,
        context: &mut StageContext<S>,
    ) {
        debug!("Transition target {:?} resident; fading back in", self.target);
        if let Some(callback) = self.on_load.take() {
            callback();
        }

        self.phase = TransitionPhase::FadingIn;
        match fade.fade_in(None) {
            Ok(FadeOutcome::Started) => {}
            Ok(FadeOutcome::Completed) => self.finish(scenes, context),
            Err(err) => {
                warn!("Fade back in unavailable ({err}); finishing transition");
                self.finish(scenes, context);
            }
        }
    }

    fn finish(&mut self, scenes: &mut SceneManager<S>, context: &mut StageContext<S>) {
        if let Some(target) = self.target {
            scenes.notify_transition_complete(target, context);
            context.push_event(StageEvent::TransitionFinished(target));
            info!("Transition to {target:?} complete");
        }
        if let Some(callback) = self.on_done.take() {
            callback();
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = TransitionPhase::Idle;
        self.target = None;
        self.additive = false;
        self.waiting_bulk = None;
        self.on_load = None;
        self.on_done = None;
    }
}

impl<S: SceneKey> Default for TransitionDriver<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
