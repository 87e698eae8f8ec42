#![no_main]

use libfuzzer_sys::fuzz_target;
use phaseloop::phase::{BranchDecision, PhaseCycleEngine, PhaseDurations, ScriptedBranches};
use phaseloop::timing::{ManualPulseSource, PulseTrack};

fuzz_target!(|data: &[u8]| {
    let Some((&head, script)) = data.split_first() else {
        return;
    };

    let cycles = u32::from(head % 4) + 1;
    let decisions = script
        .iter()
        .map(|b| BranchDecision::new(b & 1 != 0, b & 2 != 0, b & 4 != 0));

    let pulse = ManualPulseSource::new(PulseTrack::default());
    let handle = pulse.clone();
    let mut engine = PhaseCycleEngine::new(
        PhaseDurations::new(1, 2, 1, 1),
        cycles,
        Box::new(pulse),
        Box::new(ScriptedBranches::new(decisions)),
    );
    engine.start();

    // Every schedule ends within cycles * (pulses per cycle) completions.
    for _ in 0..64 {
        let Some(token) = handle.fire() else {
            break;
        };
        engine.on_pulse_complete(token);
        let progress = engine.phase_progress();
        assert!((0.0..=1.0).contains(&progress));
    }
    assert!(engine.is_terminal());
});
