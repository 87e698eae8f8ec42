//! Phase/cycle engine
//!
//! The `PhaseCycleEngine` owns the loop state machine. Time only moves
//! when the pulse source reports a completed pulse; each completion
//! decrements the active phase's pulse counter and, on exhaustion, runs
//! the phase's completion transition.
//!
//! ```text
//! Paused ──start──▶ Fall ──▶ Repair? ──▶ Resolve? ──▶ Prepare ──▶ Fall …
//!                                                 └──▶ end-game (Won | Lost)
//! ```

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info};

use crate::challenge::{ChallengeId, ChallengeOutcome};
use crate::timing::{PulseSource, TimerToken};

use super::branch::BranchSource;
use super::notify::{LoopEvent, Observers, SubscriptionId};
use super::progress;
use super::state::{BranchDecision, CycleState, GameOutcome, Phase, PhaseDurations};

/// Default number of completed cycles before the game must end.
pub const DEFAULT_CYCLES_BEFORE_GAME_OVER: u32 = 3;

/// Running count of reported challenge results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChallengeTally {
    /// Challenges reported as passed
    pub passed: u32,
    /// Challenges reported as failed
    pub failed: u32,
}

impl ChallengeTally {
    /// Total number of reports.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.passed + self.failed
    }
}

/// The phase/cycle state machine.
///
/// Constructed once per session and owned by whoever drives it; there is
/// no global instance. Collaborators observe it through [`subscribe`]
/// and the read-only queries.
///
/// [`subscribe`]: Self::subscribe
pub struct PhaseCycleEngine {
    durations: PhaseDurations,
    state: CycleState,
    branches: BranchDecision,
    plan: Vec<Phase>,
    branch_source: Box<dyn BranchSource + Send>,
    pulse: Box<dyn PulseSource + Send>,
    /// Pulse length captured when the active phase started
    pulse_duration: Duration,
    /// Token of the one outstanding pulse, if any
    pending: Option<TimerToken>,
    last_token: TimerToken,
    started: bool,
    observers: Observers,
    tally: ChallengeTally,
    reported: HashSet<ChallengeId>,
}

impl PhaseCycleEngine {
    /// Creates a paused engine.
    #[must_use]
    pub fn new(
        durations: PhaseDurations,
        cycles_before_game_over: u32,
        pulse: Box<dyn PulseSource + Send>,
        branch_source: Box<dyn BranchSource + Send>,
    ) -> Self {
        Self {
            durations,
            state: CycleState::new(cycles_before_game_over),
            branches: BranchDecision::default(),
            plan: Vec::new(),
            branch_source,
            pulse,
            pulse_duration: Duration::ZERO,
            pending: None,
            last_token: TimerToken(0),
            started: false,
            observers: Observers::new(),
            tally: ChallengeTally::default(),
            reported: HashSet::new(),
        }
    }

    /// Registers a notification handler.
    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&LoopEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(handler)
    }

    /// Removes a notification handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Starts the first Fall.
    ///
    /// # Panics
    ///
    /// Panics if the engine was already started.
    pub fn start(&mut self) {
        assert!(!self.started, "engine already started");
        self.started = true;
        info!(
            cycles_before_game_over = self.state.cycles_before_game_over,
            "starting game loop"
        );
        self.enter(Phase::Fall);
    }

    /// Handles a completed pulse.
    ///
    /// # Panics
    ///
    /// Panics if `token` is not the outstanding pulse (stale timer) or the
    /// game already ended. Both mean the driver delivered an event it had
    /// been told to abandon.
    pub fn on_pulse_complete(&mut self, token: TimerToken) {
        assert!(
            !self.state.is_terminal(),
            "pulse {token} delivered after game over"
        );
        assert_eq!(
            self.pending,
            Some(token),
            "stale pulse {token} delivered during {}",
            self.state.phase
        );
        self.pending = None;

        self.state.pulses_remaining = self.state.pulses_remaining.saturating_sub(1);
        debug!(
            phase = %self.state.phase,
            remaining = self.state.pulses_remaining,
            "pulse complete"
        );

        if self.state.pulses_remaining > 0 {
            self.schedule_pulse();
        } else {
            self.pulse.stop();
            self.complete_phase();
        }
    }

    /// Records one reaction challenge result.
    ///
    /// # Panics
    ///
    /// Panics if the same challenge was already reported.
    pub fn report_challenge_outcome(&mut self, outcome: &ChallengeOutcome) {
        assert!(
            self.reported.insert(outcome.id),
            "{} reported twice",
            outcome.id
        );
        if outcome.success() {
            self.tally.passed += 1;
        } else {
            self.tally.failed += 1;
        }
        info!(
            id = %outcome.id,
            success = outcome.success(),
            elapsed_ms = outcome.elapsed.as_millis(),
            phase = %self.state.phase,
            "challenge over"
        );
    }

    /// Abandons the outstanding pulse without changing phase.
    ///
    /// Used when the driver stops early; the engine must not be pulsed
    /// afterwards.
    pub fn halt(&mut self) {
        if self.pending.take().is_some() {
            debug!(phase = %self.state.phase, "halting with pulse outstanding");
        }
        self.pulse.stop();
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn enter(&mut self, phase: Phase) {
        debug_assert!(phase != Phase::Paused);

        if phase == Phase::Fall {
            self.branches = self.branch_source.draw(self.state.current_cycle);
            self.plan = progress::cycle_plan(
                self.branches,
                self.state.current_cycle,
                self.state.cycles_before_game_over,
            );
            debug!(branches = ?self.branches, plan = ?self.plan, "cycle branches drawn");
        }
        if phase == Phase::Prepare {
            self.state.current_cycle += 1;
        }

        let pulses = self.durations.pulses(phase);
        self.state.phase = phase;
        self.state.pulses_total = pulses;
        self.state.pulses_remaining = pulses;
        self.pulse_duration = self.pulse.pulse_duration(phase);

        info!(
            %phase,
            cycle = self.state.current_cycle,
            pulses,
            pulse = %humantime::format_duration(self.pulse_duration),
            "phase started"
        );

        self.schedule_pulse();
        self.observers.publish(&LoopEvent::PhaseStarted(phase));
    }

    fn schedule_pulse(&mut self) {
        let token = self.last_token.next();
        self.last_token = token;
        self.pending = Some(token);
        self.pulse.start(token, self.pulse_duration);
    }

    fn complete_phase(&mut self) {
        let finished = self.state.phase;
        self.state.phase = Phase::Paused;
        debug!(phase = %finished, "phase complete");

        match finished {
            Phase::Fall => {
                self.observers.publish(&LoopEvent::StasisStarted);
                if self.branches.needs_repair {
                    self.enter(Phase::Repair);
                } else {
                    self.after_repair();
                }
            }
            Phase::Repair => self.after_repair(),
            Phase::Resolve => self.prepare_or_end(),
            Phase::Prepare => {
                if self.branches.has_enough_knowledge {
                    self.finish(GameOutcome::Won);
                } else {
                    self.enter(Phase::Fall);
                }
            }
            Phase::Paused => unreachable!("paused phase has no pulses"),
        }
    }

    fn after_repair(&mut self) {
        if self.branches.needs_resolve {
            self.enter(Phase::Resolve);
        } else {
            self.prepare_or_end();
        }
    }

    fn prepare_or_end(&mut self) {
        if self.state.below_threshold() {
            self.enter(Phase::Prepare);
        } else {
            self.evaluate_end_game();
        }
    }

    fn evaluate_end_game(&mut self) {
        let outcome = if self.branches.has_enough_knowledge {
            GameOutcome::Won
        } else {
            GameOutcome::Lost
        };
        info!(
            cycle = self.state.current_cycle,
            has_enough_knowledge = self.branches.has_enough_knowledge,
            "cycle threshold reached"
        );
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.pulse.stop();
        self.pending = None;
        self.state.phase = Phase::Paused;
        self.state.pulses_remaining = 0;
        self.state.pulses_total = 0;
        self.state.outcome = Some(outcome);

        info!(
            %outcome,
            cycle = self.state.current_cycle,
            passed = self.tally.passed,
            failed = self.tally.failed,
            "game over"
        );

        let event = match outcome {
            GameOutcome::Won => LoopEvent::GameWon,
            GameOutcome::Lost => LoopEvent::GameLost,
        };
        self.observers.publish(&event);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Macro progress across the cycle's planned phases, in `[0, 1]`.
    #[must_use]
    pub fn phase_progress(&self) -> f64 {
        progress::phase_progress(&self.state, &self.plan, &self.durations, self.pulse.position())
    }

    /// Progress of the active phase: Fall counts up, others count down.
    #[must_use]
    pub fn state_progress(&self) -> f64 {
        progress::state_progress(&self.state, self.pulse.position())
    }

    /// `current_cycle / cycles_before_game_over`, 0 at cycle 0.
    #[must_use]
    pub fn cycles_progress(&self) -> f64 {
        progress::cycles_progress(&self.state)
    }

    /// Active phase.
    #[must_use]
    pub const fn current_phase(&self) -> Phase {
        self.state.phase
    }

    /// Completed-cycle counter.
    #[must_use]
    pub const fn current_cycle(&self) -> u32 {
        self.state.current_cycle
    }

    /// Terminal outcome, once reached.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.state.outcome
    }

    /// Whether the game ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether [`start`](Self::start) was called.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Branch flags of the current cycle.
    #[must_use]
    pub const fn branches(&self) -> BranchDecision {
        self.branches
    }

    /// Phases planned for the current cycle.
    #[must_use]
    pub fn plan(&self) -> &[Phase] {
        &self.plan
    }

    /// Snapshot of the cycle record.
    #[must_use]
    pub const fn state(&self) -> &CycleState {
        &self.state
    }

    /// Pulse length captured when the active phase started.
    #[must_use]
    pub const fn pulse_duration(&self) -> Duration {
        self.pulse_duration
    }

    /// Token of the outstanding pulse.
    #[must_use]
    pub const fn pending_pulse(&self) -> Option<TimerToken> {
        self.pending
    }

    /// Reported challenge results so far.
    #[must_use]
    pub const fn challenge_tally(&self) -> ChallengeTally {
        self.tally
    }
}

impl std::fmt::Debug for PhaseCycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseCycleEngine")
            .field("phase", &self.state.phase)
            .field("cycle", &self.state.current_cycle)
            .field("outcome", &self.state.outcome)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::challenge::{ChallengeId, InputKind, Verdict};
    use crate::phase::ScriptedBranches;
    use crate::timing::{ManualPulseSource, PulseTrack};

    struct Harness {
        engine: PhaseCycleEngine,
        source: ManualPulseSource,
        events: Arc<Mutex<Vec<LoopEvent>>>,
    }

    impl Harness {
        fn new(
            decisions: impl IntoIterator<Item = BranchDecision>,
            durations: PhaseDurations,
            threshold: u32,
        ) -> Self {
            let source = ManualPulseSource::new(PulseTrack::new(Duration::from_secs(4)));
            let mut engine = PhaseCycleEngine::new(
                durations,
                threshold,
                Box::new(source.clone()),
                Box::new(ScriptedBranches::new(decisions)),
            );
            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&events);
            engine.subscribe(move |e| sink.lock().unwrap().push(*e));
            Self {
                engine,
                source,
                events,
            }
        }

        fn pulse(&mut self) {
            let token = self.source.fire().expect("a pulse should be pending");
            self.engine.on_pulse_complete(token);
        }

        /// Pulses until the active phase changes or the game ends.
        fn finish_phase(&mut self) {
            let phase = self.engine.current_phase();
            while self.engine.current_phase() == phase && !self.engine.is_terminal() {
                self.pulse();
            }
        }

        fn events(&self) -> Vec<LoopEvent> {
            self.events.lock().unwrap().clone()
        }

        fn started_phases(&self) -> Vec<Phase> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    LoopEvent::PhaseStarted(p) => Some(p),
                    _ => None,
                })
                .collect()
        }
    }

    fn decision(repair: bool, resolve: bool, knowledge: bool) -> BranchDecision {
        BranchDecision::new(repair, resolve, knowledge)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_new_engine_is_paused() {
        let h = Harness::new([], PhaseDurations::default(), 3);
        assert_eq!(h.engine.current_phase(), Phase::Paused);
        assert_eq!(h.engine.current_cycle(), 0);
        assert!(!h.engine.is_started());
        assert!(h.engine.outcome().is_none());
        assert!(h.source.pending().is_none());
    }

    #[test]
    fn test_progress_before_start_is_zero() {
        let h = Harness::new([], PhaseDurations::default(), 3);
        assert!(approx(h.engine.phase_progress(), 0.0));
        assert!(approx(h.engine.state_progress(), 0.0));
        assert!(approx(h.engine.cycles_progress(), 0.0));
    }

    #[test]
    fn test_start_enters_fall() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        assert_eq!(h.engine.current_phase(), Phase::Fall);
        assert_eq!(h.engine.state().pulses_remaining, 2);
        assert_eq!(h.events(), vec![LoopEvent::PhaseStarted(Phase::Fall)]);
        assert_eq!(h.source.pending(), h.engine.pending_pulse());
    }

    #[test]
    #[should_panic(expected = "engine already started")]
    fn test_double_start_panics() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        h.engine.start();
    }

    #[test]
    fn test_fall_transition_table() {
        // Threshold 1: the first cycle (all flags false) goes
        // Fall → Prepare and lifts the counter to the threshold; the second
        // Fall is then evaluated at the boundary.
        let cases = [
            // (repair, resolve, knowledge, at_threshold, expected phase, expected outcome)
            (true, true, false, false, Phase::Repair, None),
            (true, false, false, false, Phase::Repair, None),
            (false, true, false, false, Phase::Resolve, None),
            (false, false, false, false, Phase::Prepare, None),
            (true, true, false, true, Phase::Repair, None),
            (true, false, true, true, Phase::Repair, None),
            (false, true, false, true, Phase::Resolve, None),
            (false, false, false, true, Phase::Paused, Some(GameOutcome::Lost)),
            (false, false, true, true, Phase::Paused, Some(GameOutcome::Won)),
        ];

        for (repair, resolve, knowledge, at_threshold, phase, outcome) in cases {
            let mut script = Vec::new();
            if at_threshold {
                script.push(decision(false, false, false));
            }
            script.push(decision(repair, resolve, knowledge));
            let mut h = Harness::new(script, PhaseDurations::default(), 1);
            h.engine.start();
            if at_threshold {
                h.finish_phase(); // Fall → Prepare
                h.finish_phase(); // Prepare → Fall
                assert_eq!(h.engine.current_cycle(), 1);
            }
            assert_eq!(h.engine.current_phase(), Phase::Fall);

            h.finish_phase();

            let label = format!(
                "repair={repair} resolve={resolve} knowledge={knowledge} at_threshold={at_threshold}"
            );
            assert_eq!(h.engine.current_phase(), phase, "{label}");
            assert_eq!(h.engine.outcome(), outcome, "{label}");
        }
    }

    #[test]
    fn test_repair_routes_to_resolve_then_prepare() {
        let mut h = Harness::new([decision(true, true, false)], PhaseDurations::default(), 3);
        h.engine.start();
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Repair);
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Resolve);
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Prepare);
        assert_eq!(h.engine.current_cycle(), 1);
    }

    #[test]
    fn test_resolve_at_threshold_ends_game() {
        let mut h = Harness::new(
            [decision(false, false, false), decision(false, true, false)],
            PhaseDurations::default(),
            1,
        );
        h.engine.start();
        h.finish_phase(); // Fall → Prepare (cycle 1)
        h.finish_phase(); // Prepare → Fall
        h.finish_phase(); // Fall → Resolve
        assert_eq!(h.engine.current_phase(), Phase::Resolve);
        h.finish_phase();
        assert_eq!(h.engine.outcome(), Some(GameOutcome::Lost));
        assert_eq!(h.events().last(), Some(&LoopEvent::GameLost));
    }

    #[test]
    fn test_prepare_with_knowledge_wins() {
        let mut h = Harness::new([decision(false, false, true)], PhaseDurations::default(), 3);
        h.engine.start();
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Prepare);
        h.finish_phase();
        assert_eq!(h.engine.outcome(), Some(GameOutcome::Won));
        assert_eq!(h.engine.current_phase(), Phase::Paused);
        assert_eq!(h.events().last(), Some(&LoopEvent::GameWon));
        assert!(h.source.pending().is_none());
    }

    #[test]
    fn test_regression_three_loops_then_lost() {
        let repair_only = decision(true, false, false);
        let mut h = Harness::new([repair_only], PhaseDurations::new(2, 1, 1, 1), 3);
        h.engine.start();

        for k in 1..=3 {
            assert_eq!(h.engine.current_phase(), Phase::Fall);
            h.finish_phase();
            assert_eq!(h.engine.current_phase(), Phase::Repair);
            h.finish_phase();
            assert_eq!(h.engine.current_phase(), Phase::Prepare);
            h.finish_phase();
            assert_eq!(h.engine.current_cycle(), k);
            assert!(approx(h.engine.cycles_progress(), f64::from(k) / 3.0));
        }

        // Fourth fall: Repair completes at the threshold without knowledge.
        assert_eq!(h.engine.current_phase(), Phase::Fall);
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Repair);
        h.finish_phase();
        assert_eq!(h.engine.outcome(), Some(GameOutcome::Lost));

        let expected: Vec<Phase> = [Phase::Fall, Phase::Repair, Phase::Prepare]
            .repeat(3)
            .into_iter()
            .chain([Phase::Fall, Phase::Repair])
            .collect();
        assert_eq!(h.started_phases(), expected);
    }

    #[test]
    fn test_regression_knowledge_at_third_prepare_wins() {
        let no = decision(true, false, false);
        let yes = decision(true, false, true);
        let mut h = Harness::new([no, no, yes], PhaseDurations::new(2, 1, 1, 1), 3);
        h.engine.start();

        for _ in 0..2 {
            h.finish_phase();
            h.finish_phase();
            h.finish_phase();
        }
        assert_eq!(h.engine.current_cycle(), 2);
        h.finish_phase(); // Fall
        h.finish_phase(); // Repair
        assert_eq!(h.engine.current_phase(), Phase::Prepare);
        assert_eq!(h.engine.current_cycle(), 3);
        h.finish_phase();
        assert_eq!(h.engine.outcome(), Some(GameOutcome::Won));
    }

    #[test]
    fn test_cycle_increments_on_entering_prepare() {
        let mut h = Harness::new([decision(false, false, false)], PhaseDurations::default(), 3);
        h.engine.start();
        assert_eq!(h.engine.current_cycle(), 0);
        h.finish_phase();
        assert_eq!(h.engine.current_phase(), Phase::Prepare);
        assert_eq!(h.engine.current_cycle(), 1);
    }

    #[test]
    fn test_cycles_progress_monotonic() {
        let mut h = Harness::new([decision(true, true, false)], PhaseDurations::default(), 3);
        h.engine.start();
        let mut last = h.engine.cycles_progress();
        while !h.engine.is_terminal() {
            h.pulse();
            let now = h.engine.cycles_progress();
            assert!(now >= last, "cycles progress went backwards: {last} -> {now}");
            last = now;
        }
        assert!(approx(last, 1.0));
    }

    #[test]
    fn test_stasis_follows_fall_only() {
        let mut h = Harness::new([decision(true, false, true)], PhaseDurations::default(), 3);
        h.engine.start();
        while !h.engine.is_terminal() {
            h.pulse();
        }
        assert_eq!(
            h.events(),
            vec![
                LoopEvent::PhaseStarted(Phase::Fall),
                LoopEvent::StasisStarted,
                LoopEvent::PhaseStarted(Phase::Repair),
                LoopEvent::PhaseStarted(Phase::Prepare),
                LoopEvent::GameWon,
            ]
        );
    }

    #[test]
    fn test_state_progress_at_pulse_boundaries() {
        let mut h = Harness::new([decision(true, false, false)], PhaseDurations::new(2, 2, 1, 1), 3);
        h.engine.start();

        // Fall counts up.
        assert!(approx(h.engine.state_progress(), 0.0));
        h.pulse();
        assert!(approx(h.engine.state_progress(), 0.5));
        h.source.set_position(1.0);
        assert!(approx(h.engine.state_progress(), 1.0));
        h.pulse();

        // Repair counts down.
        assert_eq!(h.engine.current_phase(), Phase::Repair);
        assert!(approx(h.engine.state_progress(), 1.0));
        h.pulse();
        assert!(approx(h.engine.state_progress(), 0.5));
        h.source.set_position(1.0);
        assert!(approx(h.engine.state_progress(), 0.0));
        h.pulse();

        // Prepare counts down too.
        assert_eq!(h.engine.current_phase(), Phase::Prepare);
        assert!(approx(h.engine.state_progress(), 1.0));
    }

    #[test]
    fn test_phase_progress_spans_cycle() {
        // Plan: Fall(2) + Repair(1) + Prepare(1) = 4 pulses.
        let mut h = Harness::new([decision(true, false, false)], PhaseDurations::new(2, 1, 1, 1), 3);
        h.engine.start();
        assert_eq!(h.engine.plan(), &[Phase::Fall, Phase::Repair, Phase::Prepare]);
        assert!(approx(h.engine.phase_progress(), 0.0));
        h.pulse();
        assert!(approx(h.engine.phase_progress(), 0.25));
        h.pulse();
        assert!(approx(h.engine.phase_progress(), 0.5));
        h.source.set_position(0.5);
        assert!(approx(h.engine.phase_progress(), 0.625));
        h.pulse();
        assert!(approx(h.engine.phase_progress(), 0.75));
        h.pulse();
        // Back in Fall for the next cycle.
        assert!(approx(h.engine.phase_progress(), 0.0));
    }

    #[test]
    fn test_branches_stable_within_cycle() {
        let mut h = Harness::new(
            [decision(true, true, false), decision(false, false, true)],
            PhaseDurations::default(),
            3,
        );
        h.engine.start();
        let drawn = h.engine.branches();
        while h.engine.current_phase() != Phase::Prepare {
            h.pulse();
            assert_eq!(h.engine.branches(), drawn);
        }
        h.finish_phase();
        assert_eq!(h.engine.branches(), decision(false, false, true));
    }

    #[test]
    fn test_one_pulse_outstanding_with_fresh_tokens() {
        let mut h = Harness::new([decision(true, true, false)], PhaseDurations::default(), 3);
        h.engine.start();
        for _ in 0..12 {
            h.pulse();
        }
        let starts = h.source.starts();
        let tokens: Vec<TimerToken> = starts.iter().map(|(t, _)| *t).collect();
        assert!(tokens.windows(2).all(|w| w[0] < w[1]), "tokens must increase");
        assert_eq!(h.source.pending(), h.engine.pending_pulse());
    }

    #[test]
    fn test_pulse_duration_captured_per_phase() {
        let track = PulseTrack::new(Duration::from_secs(4))
            .with_override(Phase::Fall, Duration::from_secs(6));
        let source = ManualPulseSource::new(track);
        let mut engine = PhaseCycleEngine::new(
            PhaseDurations::default(),
            3,
            Box::new(source.clone()),
            Box::new(ScriptedBranches::constant(decision(true, false, false))),
        );
        engine.start();
        assert_eq!(engine.pulse_duration(), Duration::from_secs(6));
        for _ in 0..2 {
            engine.on_pulse_complete(source.fire().unwrap());
        }
        assert_eq!(engine.current_phase(), Phase::Repair);
        assert_eq!(engine.pulse_duration(), Duration::from_secs(4));
        assert_eq!(source.starts()[0].1, Duration::from_secs(6));
        assert_eq!(source.starts().last().unwrap().1, Duration::from_secs(4));
    }

    #[test]
    #[should_panic(expected = "stale pulse")]
    fn test_stale_pulse_panics() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        let first = h.source.fire().unwrap();
        h.engine.on_pulse_complete(first);
        h.engine.on_pulse_complete(first);
    }

    #[test]
    #[should_panic(expected = "after game over")]
    fn test_pulse_after_game_over_panics() {
        let mut h = Harness::new([decision(false, false, true)], PhaseDurations::default(), 3);
        h.engine.start();
        h.finish_phase();
        h.finish_phase();
        assert!(h.engine.is_terminal());
        h.engine.on_pulse_complete(TimerToken(999));
    }

    #[test]
    fn test_halt_stops_source() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        h.engine.halt();
        assert!(h.source.pending().is_none());
        assert!(h.engine.pending_pulse().is_none());
        assert_eq!(h.source.stops(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        let extra = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&extra);
        let id = h.engine.subscribe(move |_| *counter.lock().unwrap() += 1);
        h.engine.start();
        assert!(h.engine.unsubscribe(id));
        h.finish_phase();
        assert_eq!(*extra.lock().unwrap(), 1);
        assert!(h.events().len() > 1);
    }

    fn outcome(id: u64, verdict: Verdict) -> ChallengeOutcome {
        ChallengeOutcome {
            id: ChallengeId(id),
            verdict,
            elapsed: Duration::from_millis(1500),
            input: (verdict == Verdict::Success).then_some(InputKind::Key),
        }
    }

    #[test]
    fn test_report_challenge_outcome_tallies() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        h.engine.report_challenge_outcome(&outcome(1, Verdict::Success));
        h.engine.report_challenge_outcome(&outcome(2, Verdict::Fail));
        h.engine.report_challenge_outcome(&outcome(3, Verdict::Fail));
        assert_eq!(
            h.engine.challenge_tally(),
            ChallengeTally {
                passed: 1,
                failed: 2
            }
        );
        assert_eq!(h.engine.challenge_tally().total(), 3);
    }

    #[test]
    #[should_panic(expected = "challenge-1 reported twice")]
    fn test_report_same_challenge_twice_panics() {
        let mut h = Harness::new([], PhaseDurations::default(), 3);
        h.engine.start();
        let pass = outcome(1, Verdict::Success);
        h.engine.report_challenge_outcome(&pass);
        h.engine.report_challenge_outcome(&pass);
    }

    #[test]
    fn test_debug_output() {
        let h = Harness::new([], PhaseDurations::default(), 3);
        let debug = format!("{:?}", h.engine);
        assert!(debug.contains("PhaseCycleEngine"));
        assert!(debug.contains("Paused"));
    }
}
