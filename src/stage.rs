//=========================================================================
// Stage
//
// Main entry point and coordinator for the scene engine.
//
// Architecture:
// ```text
//     StageBuilder  ──build_with()──>  Stage  ──tick()──>  [Pump]
//         │                             │
//         ├─ with_fixed_scenes()        ├─ SceneManager
//         ├─ with_fade_duration()       ├─ FadeDriver
//         └─ with_fade_color()          └─ TransitionDriver
// ```
//
// The stage owns every subsystem and pumps them from a single thread:
// host completions, fade progress, and queued transition requests are
// all applied inside tick(), so controller hooks and completion
// callbacks never run concurrently with anything else.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};

//=== Internal Dependencies ===============================================

use crate::core::context::StageContext;
use crate::core::error::SceneError;
use crate::core::events::{OpEdge, StageEvent};
use crate::core::fade::{Color, FadeDriver, FadeOutcome, DEFAULT_FADE_SECS};
use crate::core::host::{HostEvent, SceneHost};
use crate::core::scene::{
    BulkOutcome, FixedScenes, OpOutcome, SceneController, SceneKey, SceneManager,
};
use crate::core::transition::{TransitionDriver, TransitionPhase};
use crate::core::Completion;

//=== StageBuilder ========================================================

/// Builder for configuring and constructing a [`Stage`].
///
/// # Default Values
///
/// - **Fixed scenes**: none
/// - **Fade duration**: 1.0 seconds
/// - **Fade color**: opaque black
///
/// # Examples
///
/// ```rust
/// use stagecraft::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum GameScene { Boot, Title }
/// impl SceneKey for GameScene {}
///
/// struct BootScene;
/// impl SceneController<GameScene> for BootScene {}
///
/// let mut stage = StageBuilder::new()
///     .with_fixed_scenes([GameScene::Boot])
///     .with_fade_duration(0.5)
///     .build_with(MemoryHost::new);
///
/// stage.host_mut().install(GameScene::Boot, || Box::new(BootScene));
/// stage.load_fixed_scenes(None);
/// stage.tick(0.1);
///
/// assert!(stage.is_loaded(GameScene::Boot));
/// ```
pub struct StageBuilder<S: SceneKey> {
    fixed: Vec<S>,
    fade_duration: f32,
    fade_color: Color,
}

impl<S: SceneKey> StageBuilder<S> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            fixed: Vec::new(),
            fade_duration: DEFAULT_FADE_SECS,
            fade_color: Color::BLACK,
        }
    }

    /// Sets the fixed scene set, in bootstrap load order.
    ///
    /// Fixed scenes refuse unloading and survive bulk unloads; see
    /// [`Stage::load_fixed_scenes`].
    pub fn with_fixed_scenes(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.fixed = keys.into_iter().collect();
        self
    }

    /// Sets the default fade duration in seconds.
    ///
    /// Zero makes every stock fade instantaneous, which collapses fully
    /// resident transitions into a single call.
    ///
    /// Default: 1.0
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative or not finite.
    pub fn with_fade_duration(mut self, seconds: f32) -> Self {
        assert!(
            seconds.is_finite() && seconds >= 0.0,
            "Fade duration must be finite and non-negative, got {}",
            seconds
        );
        self.fade_duration = seconds;
        self
    }

    /// Sets the fade overlay color.
    ///
    /// Default: opaque black
    pub fn with_fade_color(mut self, color: Color) -> Self {
        self.fade_color = color;
        self
    }

    /// Builds the stage around a host.
    ///
    /// `make_host` receives the sender the host must report completions
    /// on; the stage keeps the receiving side and drains it every tick.
    /// [`MemoryHost::new`](crate::core::host::MemoryHost::new) fits
    /// this signature directly.
    pub fn build_with<H, F>(self, make_host: F) -> Stage<S, H>
    where
        H: SceneHost<S>,
        F: FnOnce(Sender<HostEvent<S>>) -> H,
    {
        info!(
            "Building stage ({} fixed scenes, fade: {}s)",
            self.fixed.len(),
            self.fade_duration
        );

        let (tx, rx) = unbounded();
        let host = make_host(tx);
        Stage {
            host,
            host_rx: rx,
            scenes: SceneManager::new(FixedScenes::new(self.fixed)),
            fade: FadeDriver::new(self.fade_color, self.fade_duration),
            transitions: TransitionDriver::new(),
            context: StageContext::new(),
        }
    }
}

impl<S: SceneKey> Default for StageBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Stage ===============================================================

/// Scene engine runtime.
///
/// The stage coordinates the scene manager, the fade overlay, and the
/// transition state machine against one [`SceneHost`]. Create via
/// [`StageBuilder`] and drive it by calling [`tick`](Stage::tick) once
/// per frame.
///
/// # Architecture
///
/// ```text
/// Stage::tick(dt)
///   ├─► host.tick()                 advance host work
///   ├─► drain host completions ──► SceneManager (hooks, callbacks)
///   ├─► fade.tick(dt) ───────────► TransitionDriver on fade edges
///   └─► drain queued requests ───► TransitionDriver::begin
/// ```
///
/// Everything runs on the calling thread. The only cross-thread traffic
/// is the host completion channel, so a host may do its real work
/// wherever it likes as long as completions land on its sender.
pub struct Stage<S: SceneKey, H: SceneHost<S>> {
    host: H,
    host_rx: Receiver<HostEvent<S>>,
    scenes: SceneManager<S>,
    fade: FadeDriver,
    transitions: TransitionDriver<S>,
    context: StageContext<S>,
}

impl<S: SceneKey, H: SceneHost<S>> Stage<S, H> {
    //--- Pump -------------------------------------------------------------

    /// Advances the stage by `dt` seconds.
    ///
    /// In order: the host ticks, its completion events are drained and
    /// applied, the fade advances, and transition requests queued by
    /// controllers are started. Completion callbacks and controller
    /// hooks all fire inside this call.
    pub fn tick(&mut self, dt: f32) {
        //--- 1. Advance the host and apply its completions ---------------
        self.host.tick();
        while let Ok(event) = self.host_rx.try_recv() {
            self.scenes
                .handle_host_event(event, &mut self.host, &mut self.context);
            self.route_edges();
        }

        //--- 2. Advance the fade overlay ---------------------------------
        if let Some(direction) = self.fade.tick(dt) {
            self.context.push_event(StageEvent::FadeFinished(direction));
            self.transitions.handle_fade_finished(
                direction,
                &mut self.scenes,
                &mut self.fade,
                &mut self.host,
                &mut self.context,
            );
            self.route_edges();
        }

        //--- 3. Start transitions queued by controllers ------------------
        for request in self.context.transitions.take() {
            if let Err(err) = self.transition(request.target, request.additive, None, None) {
                warn!(
                    "Queued transition to {:?} dropped: {err}",
                    request.target
                );
            }
            self.route_edges();
        }
    }

    /// Feeds pending completion edges into the transition driver.
    fn route_edges(&mut self) {
        while let Some(edge) = self.context.pop_edge() {
            match edge {
                OpEdge::Loaded(key) => self.transitions.handle_scene_loaded(
                    key,
                    &mut self.scenes,
                    &mut self.fade,
                    &mut self.context,
                ),
                OpEdge::BulkUnloadDone(id) => self.transitions.handle_bulk_unload_finished(
                    id,
                    &mut self.scenes,
                    &mut self.fade,
                    &mut self.host,
                    &mut self.context,
                ),
            }
        }
    }

    //--- Transitions ------------------------------------------------------

    /// Starts a coordinated transition to `target`.
    ///
    /// The sequence is fade out, unload every non-fixed scene (skipped
    /// when `additive`), load the target, fade back in. `on_load` fires
    /// once the target is resident, still behind the opaque overlay;
    /// `on_done` fires after the fade back in.
    ///
    /// Rejected with [`SceneError::TransitionBusy`] while another
    /// transition runs and [`SceneError::FadeBusy`] while a caller
    /// fade runs.
    pub fn transition(
        &mut self,
        target: S,
        additive: bool,
        on_load: Option<Completion>,
        on_done: Option<Completion>,
    ) -> Result<(), SceneError> {
        self.transitions.begin(
            target,
            additive,
            on_load,
            on_done,
            &mut self.scenes,
            &mut self.fade,
            &mut self.host,
            &mut self.context,
        )
    }

    /// The current transition phase.
    pub fn transition_phase(&self) -> TransitionPhase {
        self.transitions.phase()
    }

    //--- Scene Operations -------------------------------------------------

    /// Loads a scene. See [`SceneManager::load`].
    pub fn load_scene(&mut self, key: S, on_complete: Option<Completion>) -> OpOutcome {
        self.scenes
            .load(key, &mut self.host, &mut self.context, on_complete)
    }

    /// Unloads a scene. See [`SceneManager::unload`].
    pub fn unload_scene(&mut self, key: S, on_complete: Option<Completion>) -> OpOutcome {
        self.scenes
            .unload(key, &mut self.host, &mut self.context, on_complete)
    }

    /// Activates or deactivates a resident scene. See
    /// [`SceneManager::activate`].
    pub fn activate_scene(&mut self, key: S, active: bool) {
        self.scenes.activate(key, active, &mut self.context);
    }

    /// Unloads every non-fixed scene. See
    /// [`SceneManager::unload_all_except_fixed`].
    pub fn unload_all_except_fixed(&mut self, on_complete: Option<Completion>) -> BulkOutcome {
        self.scenes
            .unload_all_except_fixed(&mut self.host, &mut self.context, on_complete)
    }

    /// Loads the whole fixed set. See [`SceneManager::load_fixed_scenes`].
    pub fn load_fixed_scenes(&mut self, on_complete: Option<Completion>) -> BulkOutcome {
        self.scenes
            .load_fixed_scenes(&mut self.host, &mut self.context, on_complete)
    }

    /// Registers a caller-supplied controller. See
    /// [`SceneManager::register`].
    pub fn register_scene(
        &mut self,
        key: S,
        controller: Box<dyn SceneController<S>>,
    ) -> Result<(), SceneError> {
        self.scenes
            .register(key, Some(controller), &mut self.host, &mut self.context)
    }

    //--- Fades ------------------------------------------------------------

    /// Fades the overlay to opaque. See [`FadeDriver::fade_out`].
    pub fn fade_out(&mut self, on_complete: Option<Completion>) -> Result<FadeOutcome, SceneError> {
        self.fade.fade_out(on_complete)
    }

    /// Fades the overlay to transparent. See [`FadeDriver::fade_in`].
    pub fn fade_in(&mut self, on_complete: Option<Completion>) -> Result<FadeOutcome, SceneError> {
        self.fade.fade_in(on_complete)
    }

    /// Fades the overlay to an arbitrary color. See
    /// [`FadeDriver::fade_to`].
    pub fn fade_to(
        &mut self,
        to: Color,
        duration: f32,
        on_complete: Option<Completion>,
    ) -> Result<FadeOutcome, SceneError> {
        self.fade.fade_to(to, duration, on_complete)
    }

    /// Cancels a caller-driven fade.
    ///
    /// Fades owned by an in-flight transition are not cancellable; the
    /// call is refused with a warning so the transition cannot stall
    /// mid-phase.
    pub fn cancel_fade(&mut self) -> bool {
        if !self.transitions.is_idle() {
            warn!("Refusing to cancel a fade owned by an active transition");
            return false;
        }
        self.fade.cancel()
    }

    //--- Queries ----------------------------------------------------------

    /// Whether `key` is resident.
    pub fn is_loaded(&self, key: S) -> bool {
        self.scenes.is_loaded(key)
    }

    /// Whether `key` is resident and active.
    pub fn is_active(&self, key: S) -> bool {
        self.scenes.is_active(key)
    }

    /// Keys of all active scenes.
    pub fn active_scenes(&self) -> Vec<S> {
        self.scenes.active_scenes()
    }

    /// Whether every fixed scene has been resident at least once.
    pub fn fixed_set_ready(&mut self) -> bool {
        self.scenes.fixed_set_ready()
    }

    /// Drains the events accumulated since the last drain, oldest
    /// first.
    pub fn drain_events(&mut self) -> Vec<StageEvent<S>> {
        self.context.drain_events()
    }

    //--- Component Access -------------------------------------------------

    /// Shared access to the scene manager.
    pub fn scenes(&self) -> &SceneManager<S> {
        &self.scenes
    }

    /// Mutable access to a resident scene's controller.
    pub fn controller_mut(&mut self, key: S) -> Option<&mut dyn SceneController<S>> {
        self.scenes.controller_mut(key)
    }

    /// Shared access to the fade driver, for rendering the overlay.
    pub fn fade(&self) -> &FadeDriver {
        &self.fade
    }

    /// Shared access to the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
