//! Phase/cycle engine
//!
//! Drives the five-phase game loop: a Fall, optional Repair and Resolve
//! stages, and a Prepare that closes each cycle. Time advances only on
//! pulse completions; branch flags are drawn once per cycle when Fall
//! starts.
//!
//! # Architecture
//!
//! - [`CycleState`]: Phase, pulse counter, cycle counter, terminal outcome
//! - [`PhaseCycleEngine`]: Transitions, progress queries, notifications
//! - [`BranchSource`]: Per-cycle branch flags (seeded random or scripted)
//! - [`progress`]: Progress arithmetic over engine snapshots

pub mod branch;
pub mod engine;
pub mod notify;
pub mod progress;
pub mod state;

pub use branch::{BranchSource, DEFAULT_BRANCH_THRESHOLD, RandomBranches, ScriptedBranches};
pub use engine::{ChallengeTally, DEFAULT_CYCLES_BEFORE_GAME_OVER, PhaseCycleEngine};
pub use notify::{LoopEvent, Observers, SubscriptionId};
pub use state::{BranchDecision, CycleState, GameOutcome, Phase, PhaseDurations};
