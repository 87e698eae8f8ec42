//! Branch flag sources
//!
//! The engine draws a [`BranchDecision`] once per cycle, when Fall starts.
//! Random draws compare a uniform value in `[0, 1)` against a threshold;
//! scripted sources replay a fixed sequence for tests and demos.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::state::BranchDecision;

/// Default threshold for random draws: a flag is set when the draw exceeds it.
pub const DEFAULT_BRANCH_THRESHOLD: f64 = 0.5;

/// Supplies the branching flags for each cycle.
pub trait BranchSource {
    /// Draws the flags for the cycle whose Fall is starting.
    ///
    /// `cycle` is the engine's cycle counter at Fall entry (0 for the first
    /// fall).
    fn draw(&mut self, cycle: u32) -> BranchDecision;
}

/// Seeded random branch source.
///
/// The same seed always produces the same sequence of decisions.
#[derive(Debug, Clone)]
pub struct RandomBranches {
    rng: StdRng,
    threshold: f64,
    seed: u64,
}

impl RandomBranches {
    /// Creates a source seeded with `seed`, using the given threshold.
    #[must_use]
    pub fn new(seed: u64, threshold: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            threshold,
            seed,
        }
    }

    /// Creates a source with a fresh seed from the thread RNG.
    #[must_use]
    pub fn from_entropy(threshold: f64) -> Self {
        Self::new(rand::rng().random(), threshold)
    }

    /// Returns the seed this source was built with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn flag(&mut self) -> bool {
        self.rng.random::<f64>() > self.threshold
    }
}

impl BranchSource for RandomBranches {
    fn draw(&mut self, _cycle: u32) -> BranchDecision {
        // Draw order is part of the seed contract.
        let needs_repair = self.flag();
        let needs_resolve = self.flag();
        let has_enough_knowledge = self.flag();
        BranchDecision::new(needs_repair, needs_resolve, has_enough_knowledge)
    }
}

/// Replays a fixed list of decisions, one per cycle.
///
/// Once the list is exhausted the last decision repeats; an empty script
/// always yields all-false flags.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBranches {
    script: VecDeque<BranchDecision>,
    last: BranchDecision,
}

impl ScriptedBranches {
    /// Creates a scripted source from decisions in cycle order.
    #[must_use]
    pub fn new(decisions: impl IntoIterator<Item = BranchDecision>) -> Self {
        Self {
            script: decisions.into_iter().collect(),
            last: BranchDecision::default(),
        }
    }

    /// Every cycle draws the same decision.
    #[must_use]
    pub fn constant(decision: BranchDecision) -> Self {
        Self {
            script: VecDeque::new(),
            last: decision,
        }
    }
}

impl BranchSource for ScriptedBranches {
    fn draw(&mut self, _cycle: u32) -> BranchDecision {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_decisions() {
        let mut a = RandomBranches::new(42, DEFAULT_BRANCH_THRESHOLD);
        let mut b = RandomBranches::new(42, DEFAULT_BRANCH_THRESHOLD);
        for cycle in 0..20 {
            assert_eq!(a.draw(cycle), b.draw(cycle));
        }
    }

    #[test]
    fn threshold_one_never_sets_flags() {
        let mut src = RandomBranches::new(7, 1.0);
        for cycle in 0..50 {
            assert_eq!(src.draw(cycle), BranchDecision::default());
        }
    }

    #[test]
    fn threshold_below_zero_always_sets_flags() {
        let mut src = RandomBranches::new(7, -0.1);
        for cycle in 0..50 {
            assert_eq!(src.draw(cycle), BranchDecision::new(true, true, true));
        }
    }

    #[test]
    fn seed_is_reported() {
        assert_eq!(RandomBranches::new(99, 0.5).seed(), 99);
    }

    #[test]
    fn scripted_replays_then_repeats_last() {
        let first = BranchDecision::new(true, false, false);
        let second = BranchDecision::new(false, true, true);
        let mut src = ScriptedBranches::new([first, second]);
        assert_eq!(src.draw(0), first);
        assert_eq!(src.draw(1), second);
        assert_eq!(src.draw(2), second);
    }

    #[test]
    fn empty_script_is_all_false() {
        let mut src = ScriptedBranches::default();
        assert_eq!(src.draw(0), BranchDecision::default());
    }
}
