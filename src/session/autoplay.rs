//! Unattended play
//!
//! Presses each armed challenge once its elapsed time reaches a fixed
//! delay. With pointer input disabled a single key press stands in for
//! all due challenges.

use std::time::Duration;

use crate::challenge::{InputEvent, ReactionChallenge};

/// Presses challenges after a fixed reaction delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autoplay {
    /// Reaction delay measured from the challenge's arming
    pub delay: Duration,
}

impl Autoplay {
    /// Creates an autoplayer with the given reaction delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Inputs to deliver on a frame of length `delta`.
    ///
    /// A challenge is due when its elapsed time after this frame reaches
    /// the delay.
    #[must_use]
    pub fn presses(
        &self,
        active: &[ReactionChallenge],
        delta: Duration,
        accept_pointer: bool,
    ) -> Vec<InputEvent> {
        let mut due = active
            .iter()
            .filter(|c| c.is_armed() && c.elapsed().saturating_add(delta) >= self.delay)
            .map(ReactionChallenge::id)
            .peekable();

        if accept_pointer {
            due.map(InputEvent::Pointer).collect()
        } else if due.peek().is_some() {
            vec![InputEvent::Key]
        } else {
            Vec::new()
        }
    }
}
