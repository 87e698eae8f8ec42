//! Challenge spawning and cancellation
//!
//! The coordinator reacts to loop notifications: a Fall starts a spawn
//! cadence, stasis or game over cancels every armed challenge. Between
//! notifications it is driven frame by frame through [`tick`].
//!
//! [`tick`]: ChallengeCoordinator::tick

use std::time::Duration;

use tracing::debug;

use crate::phase::{LoopEvent, Phase};

use super::reaction::{
    ChallengeId, ChallengeOutcome, ChallengeWindows, InputKind, ReactionChallenge,
};

/// Default time between spawns while Fall is active.
pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_secs(3);

/// Default cap on simultaneously armed challenges.
pub const DEFAULT_MAX_ACTIVE: usize = 4;

/// Player input for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Key press; reaches every armed challenge
    Key,
    /// Pointer press on a single challenge
    Pointer(ChallengeId),
}

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Windows for every spawned challenge
    pub windows: ChallengeWindows,
    /// Time between spawns
    pub spawn_interval: Duration,
    /// Cap on armed challenges; a spawn that would exceed it is skipped
    pub max_active: usize,
    /// Whether pointer input is delivered at all
    pub accept_pointer: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            windows: ChallengeWindows::default(),
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            max_active: DEFAULT_MAX_ACTIVE,
            accept_pointer: true,
        }
    }
}

/// What changed during one notification or frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    /// Newly armed challenges
    pub spawned: Vec<ChallengeId>,
    /// Challenges that resolved, in arming order
    pub resolved: Vec<ChallengeOutcome>,
    /// Challenges dropped without a report
    pub cancelled: Vec<ChallengeId>,
    /// Spawns skipped because of `max_active`
    pub skipped: u32,
}

impl CoordinatorReport {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
            && self.resolved.is_empty()
            && self.cancelled.is_empty()
            && self.skipped == 0
    }
}

/// Spawns reaction challenges during Fall and cancels them on stasis.
#[derive(Debug)]
pub struct ChallengeCoordinator {
    settings: CoordinatorSettings,
    active: Vec<ReactionChallenge>,
    spawning: bool,
    since_spawn: Duration,
    last_id: u64,
}

impl ChallengeCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub const fn new(settings: CoordinatorSettings) -> Self {
        Self {
            settings,
            active: Vec::new(),
            spawning: false,
            since_spawn: Duration::ZERO,
            last_id: 0,
        }
    }

    /// Reacts to a loop notification.
    pub fn handle(&mut self, event: &LoopEvent) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        match event {
            LoopEvent::PhaseStarted(Phase::Fall) => {
                debug!(interval = ?self.settings.spawn_interval, "fall started, spawning challenges");
                self.spawning = true;
                self.since_spawn = Duration::ZERO;
                self.spawn(&mut report);
            }
            LoopEvent::StasisStarted | LoopEvent::GameWon | LoopEvent::GameLost => {
                report.cancelled = self.cancel_all();
            }
            LoopEvent::PhaseStarted(_) => {}
        }
        report
    }

    /// Advances every armed challenge and the spawn cadence by `delta`.
    ///
    /// Challenges resolved this frame are removed and reported. New
    /// spawns are armed after existing challenges tick, so they start
    /// at zero elapsed time.
    pub fn tick(&mut self, delta: Duration, inputs: &[InputEvent]) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();

        let key_pressed = inputs.contains(&InputEvent::Key);
        let accept_pointer = self.settings.accept_pointer;
        if !accept_pointer && inputs.iter().any(|i| matches!(i, InputEvent::Pointer(_))) {
            debug!("pointer input ignored");
        }

        self.active.retain_mut(|challenge| {
            let input = if key_pressed {
                Some(InputKind::Key)
            } else if accept_pointer && inputs.contains(&InputEvent::Pointer(challenge.id())) {
                Some(InputKind::Pointer)
            } else {
                None
            };
            match challenge.tick(delta, input) {
                Some(outcome) => {
                    report.resolved.push(outcome);
                    false
                }
                None => true,
            }
        });

        if self.spawning {
            self.since_spawn = self.since_spawn.saturating_add(delta);
            let interval = self.settings.spawn_interval;
            if interval.is_zero() {
                self.since_spawn = Duration::ZERO;
                self.spawn(&mut report);
            } else {
                while self.since_spawn >= interval {
                    self.since_spawn -= interval;
                    self.spawn(&mut report);
                }
            }
        }

        report
    }

    /// Drops every armed challenge without reporting and stops spawning.
    ///
    /// Calling it again is a no-op.
    pub fn cancel_all(&mut self) -> Vec<ChallengeId> {
        self.spawning = false;
        self.since_spawn = Duration::ZERO;
        let cancelled: Vec<ChallengeId> = self.active.drain(..).map(|c| c.id()).collect();
        if !cancelled.is_empty() {
            debug!(count = cancelled.len(), "cancelled armed challenges");
        }
        cancelled
    }

    fn spawn(&mut self, report: &mut CoordinatorReport) {
        if self.active.len() >= self.settings.max_active {
            debug!(
                active = self.active.len(),
                max_active = self.settings.max_active,
                "spawn skipped"
            );
            report.skipped += 1;
            return;
        }
        self.last_id += 1;
        let id = ChallengeId(self.last_id);
        self.active.push(ReactionChallenge::new(id, self.settings.windows));
        debug!(%id, "challenge spawned");
        report.spawned.push(id);
    }

    /// Armed challenges, oldest first.
    #[must_use]
    pub fn active(&self) -> &[ReactionChallenge] {
        &self.active
    }

    /// Whether a Fall spawn cadence is running.
    #[must_use]
    pub const fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }
}
