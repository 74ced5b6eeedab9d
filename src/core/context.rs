//=========================================================================
// Stage Context
//=========================================================================
//
// Shared data container passed to scene controllers.
//
// Contains the data controllers read/write during lifecycle hooks:
// - transitions: Command queue for requesting scene transitions
// - events: Completed-work notifications, drained by the embedding
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;

//=== Internal Dependencies ===============================================

use crate::core::events::{OpEdge, StageEvent};
use crate::core::scene::SceneKey;
use crate::core::transition::{TransitionQueue, TransitionRequest};

//=== StageContext ========================================================

/// Shared context handed to scene controllers during lifecycle hooks.
///
/// Controllers receive `&mut StageContext` in every hook. This separates
/// controller-accessible data from the internal machinery that drives
/// them: a controller can request transitions, but it cannot reach back
/// into the scene manager mid-hook.
///
/// # Available Data
///
/// - `transitions`: Queue for requesting coordinated scene transitions
/// - `events`: Completion notifications (internal, drained via
///   [`Stage::drain_events`](crate::Stage::drain_events))
pub struct StageContext<S: SceneKey> {
    /// Transition request queue.
    ///
    /// Controllers queue requests here during hooks. The stage processes
    /// the queue at tick boundaries, so a request made mid-hook never
    /// re-enters the scene machinery while a hook is on the call stack.
    pub transitions: TransitionQueue<S>,

    /// Completion edges routed to the transition driver.
    ///
    /// Populated by the scene manager as host operations complete and
    /// consumed by the stage in the same tick. Not controller-visible.
    pub(crate) edges: VecDeque<OpEdge<S>>,

    /// Observable events for the embedding.
    pub(crate) events: VecDeque<StageEvent<S>>,
}

impl<S: SceneKey> StageContext<S> {
    pub(crate) fn new() -> Self {
        Self {
            transitions: TransitionQueue::new(),
            edges: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// Queues a transition to `target`, processed at the next tick
    /// boundary.
    ///
    /// Shorthand for pushing onto [`transitions`](Self::transitions).
    pub fn request_transition(&mut self, target: S, additive: bool) {
        self.transitions.push(TransitionRequest { target, additive });
    }

    pub(crate) fn push_edge(&mut self, edge: OpEdge<S>) {
        self.edges.push_back(edge);
    }

    pub(crate) fn pop_edge(&mut self) -> Option<OpEdge<S>> {
        self.edges.pop_front()
    }

    pub(crate) fn push_event(&mut self, event: StageEvent<S>) {
        self.events.push_back(event);
    }

    pub(crate) fn drain_events(&mut self) -> Vec<StageEvent<S>> {
        self.events.drain(..).collect()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestScene {
        Title,
    }

    impl SceneKey for TestScene {}

    #[test]
    fn request_transition_lands_in_queue() {
        let mut context = StageContext::new();

        context.request_transition(TestScene::Title, false);

        let requests = context.transitions.take();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, TestScene::Title);
        assert!(!requests[0].additive);
    }

    #[test]
    fn events_drain_in_emission_order() {
        let mut context = StageContext::new();

        context.push_event(StageEvent::SceneLoaded(TestScene::Title));
        context.push_event(StageEvent::TransitionFinished(TestScene::Title));

        let events = context.drain_events();
        assert_eq!(
            events,
            vec![
                StageEvent::SceneLoaded(TestScene::Title),
                StageEvent::TransitionFinished(TestScene::Title),
            ]
        );
        assert!(context.drain_events().is_empty());
    }
}
