//! Reaction challenges
//!
//! - [`ReactionChallenge`]: One timed reaction test with neutral and reaction windows
//! - [`ChallengeCoordinator`]: Spawns challenges during Fall, cancels them on stasis

pub mod coordinator;
pub mod reaction;

pub use coordinator::{
    ChallengeCoordinator, CoordinatorReport, CoordinatorSettings, DEFAULT_MAX_ACTIVE,
    DEFAULT_SPAWN_INTERVAL, InputEvent,
};
pub use reaction::{
    ChallengeId, ChallengeOutcome, ChallengeWindows, DEFAULT_NEUTRAL_WINDOW,
    DEFAULT_REACTION_WINDOW, InputKind, ReactionChallenge, Verdict,
};
