//! Engine notifications and the observer registry
//!
//! Observers are registered on a specific engine instance and removed by
//! handle during their own teardown. Handlers only observe: they receive
//! the event by reference and have no access to the engine.

use serde::Serialize;

use super::state::Phase;

/// A notification published by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "phase", rename_all = "snake_case")]
pub enum LoopEvent {
    /// A timed phase has started
    PhaseStarted(Phase),
    /// Fall completed; the loop entered its stable stretch
    StasisStarted,
    /// The game ended in a win
    GameWon,
    /// The game ended in a loss
    GameLost,
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&LoopEvent) + Send>;

/// Registry of notification handlers, owned by one engine.
///
/// Handlers run synchronously, in subscription order.
#[derive(Default)]
pub struct Observers {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl Observers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler and returns its removal handle.
    pub fn subscribe(&mut self, handler: impl FnMut(&LoopEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if the handle was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    /// Delivers `event` to every registered handler.
    pub fn publish(&mut self, event: &LoopEvent) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}
