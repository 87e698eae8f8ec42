//! Progress arithmetic
//!
//! Pure functions over a snapshot of engine state. All results are in
//! `[0, 1]`; anything undefined (paused, not started, empty plan) is 0.

use super::state::{BranchDecision, CycleState, Phase, PhaseDurations};

/// Phases the current cycle will visit, in order, as decided at Fall entry.
///
/// The plan always starts with Fall. Repair and Resolve follow when their
/// flags are set. Prepare closes the plan when the cycle counter (as it was
/// when Fall started) is still below the threshold; otherwise the plan ends
/// at end-game evaluation.
#[must_use]
pub fn cycle_plan(branches: BranchDecision, cycle_at_fall: u32, threshold: u32) -> Vec<Phase> {
    let mut plan = vec![Phase::Fall];
    if branches.needs_repair {
        plan.push(Phase::Repair);
    }
    if branches.needs_resolve {
        plan.push(Phase::Resolve);
    }
    if cycle_at_fall < threshold {
        plan.push(Phase::Prepare);
    }
    plan
}

/// Fraction of the active phase elapsed, direction-adjusted.
///
/// `position` is the fraction of the running pulse already elapsed. Fall
/// counts up from 0 to 1; every other phase counts down from 1 to 0.
#[must_use]
pub fn state_progress(state: &CycleState, position: f64) -> f64 {
    let elapsed = phase_elapsed_fraction(state, position);
    if state.phase.counts_down() {
        1.0 - elapsed
    } else {
        elapsed
    }
}

/// Elapsed share of the active phase, always counting up.
fn phase_elapsed_fraction(state: &CycleState, position: f64) -> f64 {
    if state.phase == Phase::Paused || state.pulses_total == 0 {
        return 0.0;
    }
    let done = f64::from(state.pulses_total - state.pulses_remaining.min(state.pulses_total));
    ((done + position.clamp(0.0, 1.0)) / f64::from(state.pulses_total)).clamp(0.0, 1.0)
}

/// Fraction of the whole planned cycle elapsed.
///
/// Completed planned phases count in full, the active phase counts its
/// elapsed pulses plus the running pulse's `position`.
#[must_use]
pub fn phase_progress(
    state: &CycleState,
    plan: &[Phase],
    durations: &PhaseDurations,
    position: f64,
) -> f64 {
    if state.phase == Phase::Paused {
        return 0.0;
    }
    let Some(active) = plan.iter().position(|p| *p == state.phase) else {
        return 0.0;
    };

    let total: u32 = plan.iter().map(|p| durations.pulses(*p)).sum();
    if total == 0 {
        return 0.0;
    }

    let completed: u32 = plan[..active].iter().map(|p| durations.pulses(*p)).sum();
    let in_phase = phase_elapsed_fraction(state, position) * f64::from(state.pulses_total);

    ((f64::from(completed) + in_phase) / f64::from(total)).clamp(0.0, 1.0)
}

/// Share of the cycle threshold already completed.
#[must_use]
pub fn cycles_progress(state: &CycleState) -> f64 {
    if state.current_cycle == 0 || state.cycles_before_game_over == 0 {
        return 0.0;
    }
    (f64::from(state.current_cycle) / f64::from(state.cycles_before_game_over)).min(1.0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn active(phase: Phase, remaining: u32, total: u32) -> CycleState {
        CycleState {
            phase,
            pulses_remaining: remaining,
            pulses_total: total,
            ..CycleState::new(3)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn plan_full_cycle() {
        let plan = cycle_plan(BranchDecision::new(true, true, false), 0, 3);
        assert_eq!(
            plan,
            vec![Phase::Fall, Phase::Repair, Phase::Resolve, Phase::Prepare]
        );
    }

    #[test]
    fn plan_without_branches() {
        let plan = cycle_plan(BranchDecision::default(), 1, 3);
        assert_eq!(plan, vec![Phase::Fall, Phase::Prepare]);
    }

    #[test]
    fn plan_at_threshold_has_no_prepare() {
        let plan = cycle_plan(BranchDecision::new(true, false, false), 3, 3);
        assert_eq!(plan, vec![Phase::Fall, Phase::Repair]);
    }

    #[test]
    fn state_progress_paused_is_zero() {
        let state = CycleState::new(3);
        assert!(approx(state_progress(&state, 0.5), 0.0));
    }

    #[test]
    fn fall_counts_up() {
        assert!(approx(state_progress(&active(Phase::Fall, 2, 2), 0.0), 0.0));
        assert!(approx(state_progress(&active(Phase::Fall, 2, 2), 0.5), 0.25));
        assert!(approx(state_progress(&active(Phase::Fall, 1, 2), 0.0), 0.5));
        assert!(approx(state_progress(&active(Phase::Fall, 1, 2), 1.0), 1.0));
    }

    #[test]
    fn other_phases_count_down() {
        for phase in [Phase::Repair, Phase::Resolve, Phase::Prepare] {
            assert!(approx(state_progress(&active(phase, 1, 1), 0.0), 1.0));
            assert!(approx(state_progress(&active(phase, 1, 1), 0.25), 0.75));
            assert!(approx(state_progress(&active(phase, 1, 1), 1.0), 0.0));
        }
    }

    #[test]
    fn phase_progress_spans_plan() {
        let durations = PhaseDurations::default();
        let plan = vec![Phase::Fall, Phase::Repair, Phase::Prepare];
        // Fall(2) + Repair(1) + Prepare(1) = 4 pulses.
        assert!(approx(
            phase_progress(&active(Phase::Fall, 2, 2), &plan, &durations, 0.0),
            0.0
        ));
        assert!(approx(
            phase_progress(&active(Phase::Fall, 1, 2), &plan, &durations, 0.0),
            0.25
        ));
        assert!(approx(
            phase_progress(&active(Phase::Repair, 1, 1), &plan, &durations, 0.5),
            0.625
        ));
        assert!(approx(
            phase_progress(&active(Phase::Prepare, 1, 1), &plan, &durations, 1.0),
            1.0
        ));
    }

    #[test]
    fn phase_progress_outside_plan_is_zero() {
        let durations = PhaseDurations::default();
        let plan = vec![Phase::Fall, Phase::Prepare];
        assert!(approx(
            phase_progress(&active(Phase::Repair, 1, 1), &plan, &durations, 0.5),
            0.0
        ));
        assert!(approx(
            phase_progress(&CycleState::new(3), &plan, &durations, 0.5),
            0.0
        ));
    }

    #[test]
    fn cycles_progress_fractions() {
        let mut state = CycleState::new(3);
        assert!(approx(cycles_progress(&state), 0.0));
        state.current_cycle = 1;
        assert!(approx(cycles_progress(&state), 1.0 / 3.0));
        state.current_cycle = 3;
        assert!(approx(cycles_progress(&state), 1.0));
        state.current_cycle = 5;
        assert!(approx(cycles_progress(&state), 1.0));
    }

    #[test]
    fn cycles_progress_zero_threshold() {
        let mut state = CycleState::new(0);
        state.current_cycle = 2;
        assert!(approx(cycles_progress(&state), 0.0));
    }

    fn any_phase() -> impl Strategy<Value = Phase> {
        prop_oneof![
            Just(Phase::Paused),
            Just(Phase::Fall),
            Just(Phase::Repair),
            Just(Phase::Resolve),
            Just(Phase::Prepare),
        ]
    }

    proptest! {
        #[test]
        fn progress_always_in_unit_range(
            phase in any_phase(),
            total in 1u32..8,
            remaining in 0u32..10,
            position in -1.0f64..2.0,
            repair: bool,
            resolve: bool,
            cycle in 0u32..5,
        ) {
            let state = CycleState {
                phase,
                pulses_remaining: remaining,
                pulses_total: total,
                current_cycle: cycle,
                ..CycleState::new(3)
            };
            let plan = cycle_plan(BranchDecision::new(repair, resolve, false), cycle, 3);
            let durations = PhaseDurations::uniform(total);

            let s = state_progress(&state, position);
            let p = phase_progress(&state, &plan, &durations, position);
            let c = cycles_progress(&state);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!((0.0..=1.0).contains(&p));
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
