//! Session driver
//!
//! Wires a [`PhaseCycleEngine`] to the tokio timer, a
//! [`ChallengeCoordinator`] and the event stream, then runs the game until
//! it ends or the cancel token fires.
//!
//! Everything runs on one task. Engine notifications are queued by the
//! observer and handled after each engine call returns, so the coordinator
//! always sees them in publication order.

pub mod autoplay;
pub mod input;

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, field, info, info_span};

use crate::challenge::{ChallengeCoordinator, ChallengeId, CoordinatorReport, InputEvent};
use crate::config::Settings;
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter, RunSummary, StopReason};
use crate::phase::{
    BranchSource, GameOutcome, LoopEvent, Phase, PhaseCycleEngine, RandomBranches,
};
use crate::timing::{TimerToken, TokioPulseSource};

pub use autoplay::Autoplay;
pub use input::{parse_input_line, spawn_reader};

/// Shortest frame the driver will tick at.
const MIN_FRAME: Duration = Duration::from_millis(1);

/// Options for [`Session::new`].
pub struct SessionOptions {
    /// Runtime settings.
    pub settings: Settings,
    /// Event emitter for structured events.
    pub event_emitter: EventEmitter,
    /// Unattended play, if enabled.
    pub autoplay: Option<Autoplay>,
    /// Player input; `None` runs without a player.
    pub input: Option<mpsc::Receiver<InputEvent>>,
    /// Branch source override; defaults to a random source from settings.
    pub branches: Option<Box<dyn BranchSource + Send>>,
    /// Token for cooperative shutdown.
    pub cancel: CancellationToken,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Why the session stopped.
    pub reason: StopReason,
    /// Run statistics.
    pub summary: RunSummary,
}

impl SessionReport {
    /// Terminal outcome, if the game ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.summary.outcome
    }
}

/// A single game, from settle delay to Won, Lost or interruption.
pub struct Session {
    settings: Settings,
    engine: PhaseCycleEngine,
    coordinator: ChallengeCoordinator,
    loop_events: mpsc::UnboundedReceiver<LoopEvent>,
    pulses: mpsc::UnboundedReceiver<TimerToken>,
    event_emitter: EventEmitter,
    autoplay: Option<Autoplay>,
    input: Option<mpsc::Receiver<InputEvent>>,
    queued: Vec<InputEvent>,
    last_phase: Option<Phase>,
    summary: RunSummary,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("coordinator", &self.coordinator)
            .field("autoplay", &self.autoplay)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session from the given options.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(opts: SessionOptions) -> Self {
        let settings = opts.settings;
        let (pulse, pulses) = TokioPulseSource::channel(settings.pulse.clone());

        let branches = opts.branches.unwrap_or_else(|| {
            let threshold = settings.branch_threshold;
            let source = settings.seed.map_or_else(
                || RandomBranches::from_entropy(threshold),
                |seed| RandomBranches::new(seed, threshold),
            );
            Box::new(source)
        });

        let mut engine = PhaseCycleEngine::new(
            settings.durations,
            settings.cycles_before_game_over,
            Box::new(pulse),
            branches,
        );

        let (tx, loop_events) = mpsc::unbounded_channel();
        engine.subscribe(move |event| {
            let _ = tx.send(*event);
        });

        let coordinator = ChallengeCoordinator::new(settings.challenge);

        Self {
            settings,
            engine,
            coordinator,
            loop_events,
            pulses,
            event_emitter: opts.event_emitter,
            autoplay: opts.autoplay,
            input: opts.input,
            queued: Vec::new(),
            last_phase: None,
            summary: RunSummary::default(),
            cancel: opts.cancel,
        }
    }

    /// Runs the game to completion.
    ///
    /// Returns when the engine reaches Won or Lost, or when the cancel
    /// token fires. Logs are emitted inside a `session` span whose
    /// `phase` and `cycle` fields follow the engine.
    pub async fn run(self) -> SessionReport {
        let span = info_span!(
            "session",
            seed = ?self.settings.seed,
            phase = field::Empty,
            cycle = field::Empty,
        );
        self.play().instrument(span).await
    }

    async fn play(mut self) -> SessionReport {
        let started_at = Instant::now();

        self.event_emitter.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            seed: self.settings.seed,
            cycles_before_game_over: self.settings.cycles_before_game_over,
        });

        let reason = if self.settle().await {
            self.engine.start();
            self.drain_loop_events();
            self.main_loop().await
        } else {
            StopReason::Interrupted
        };

        // Shutdown
        self.engine.halt();
        let cancelled = self.coordinator.cancel_all();
        self.record_cancelled(cancelled);

        let tally = self.engine.challenge_tally();
        self.summary.cycles = self.engine.current_cycle();
        self.summary.challenges_passed = tally.passed;
        self.summary.challenges_failed = tally.failed;
        self.summary.outcome = self.engine.outcome();
        self.summary.elapsed_secs = started_at.elapsed().as_secs_f64();

        info!(reason = reason.as_str(), summary = %self.summary, "session stopped");

        self.event_emitter.emit(Event::SessionStopped {
            timestamp: Utc::now(),
            reason,
            summary: self.summary.clone(),
        });
        self.event_emitter.flush();

        SessionReport {
            reason,
            summary: self.summary,
        }
    }

    /// Waits out the settle delay. Returns `false` if cancelled first.
    async fn settle(&mut self) -> bool {
        let delay = self.settings.settle_delay;
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        debug!(delay = %humantime::format_duration(delay), "settling before first fall");
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Core event loop.
    async fn main_loop(&mut self) -> StopReason {
        let frame_len = self.settings.frame.max(MIN_FRAME);
        let mut frame = tokio::time::interval(frame_len);
        frame.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = Instant::now();

        while !self.engine.is_terminal() {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    info!("session cancelled");
                    return StopReason::Interrupted;
                }
                Some(token) = self.pulses.recv() => {
                    if self.engine.pending_pulse() == Some(token) {
                        self.engine.on_pulse_complete(token);
                        self.drain_loop_events();
                    } else {
                        debug!(%token, "dropping stale pulse");
                    }
                }
                input = next_input(&mut self.input) => match input {
                    Some(event) => self.queued.push(event),
                    None => {
                        debug!("input closed");
                        self.input = None;
                    }
                },
                now = frame.tick() => {
                    let delta = now.saturating_duration_since(last_frame);
                    last_frame = now;
                    self.on_frame(delta);
                }
            }
        }

        StopReason::GameOver
    }

    /// Ticks the coordinator with the input queued since the last frame.
    fn on_frame(&mut self, delta: Duration) {
        let mut inputs = std::mem::take(&mut self.queued);
        if let Some(autoplay) = self.autoplay {
            inputs.extend(autoplay.presses(
                self.coordinator.active(),
                delta,
                self.settings.challenge.accept_pointer,
            ));
        }
        let report = self.coordinator.tick(delta, &inputs);
        self.apply_report(report);
    }

    /// Handles every notification the engine published since the last drain.
    fn drain_loop_events(&mut self) {
        while let Ok(event) = self.loop_events.try_recv() {
            match event {
                LoopEvent::PhaseStarted(phase) => {
                    let cycle = self.engine.current_cycle();
                    self.summary.phases_started += 1;
                    self.event_emitter.emit(Event::PhaseStarted {
                        timestamp: Utc::now(),
                        phase,
                        cycle,
                        pulses: self.engine.state().pulses_total,
                        pulse_ms: u64::try_from(self.engine.pulse_duration().as_millis())
                            .unwrap_or(u64::MAX),
                    });
                    metrics::record_phase_started(phase, self.last_phase);
                    metrics::set_current_cycle(cycle);
                    Span::current()
                        .record("phase", field::display(phase))
                        .record("cycle", cycle);
                    self.last_phase = Some(phase);
                }
                LoopEvent::StasisStarted => {
                    self.event_emitter.emit(Event::StasisStarted {
                        timestamp: Utc::now(),
                        cycle: self.engine.current_cycle(),
                    });
                }
                LoopEvent::GameWon | LoopEvent::GameLost => {}
            }

            let report = self.coordinator.handle(&event);
            self.apply_report(report);

            let outcome = match event {
                LoopEvent::GameWon => GameOutcome::Won,
                LoopEvent::GameLost => GameOutcome::Lost,
                LoopEvent::PhaseStarted(_) | LoopEvent::StasisStarted => continue,
            };
            self.event_emitter.emit(Event::GameOver {
                timestamp: Utc::now(),
                outcome,
                cycle: self.engine.current_cycle(),
            });
            metrics::record_game_over(outcome, self.last_phase.take());
        }
    }

    /// Emits and records a coordinator report; outcomes go to the engine.
    fn apply_report(&mut self, report: CoordinatorReport) {
        for id in report.spawned {
            self.event_emitter.emit(Event::ChallengeSpawned {
                timestamp: Utc::now(),
                id,
            });
        }
        for outcome in &report.resolved {
            self.engine.report_challenge_outcome(outcome);
            self.event_emitter.emit(Event::challenge_resolved(outcome));
            metrics::record_challenge(outcome.verdict, outcome.elapsed);
        }
        self.record_cancelled(report.cancelled);
    }

    fn record_cancelled(&mut self, ids: Vec<ChallengeId>) {
        if ids.is_empty() {
            return;
        }
        self.summary.challenges_cancelled += ids.len() as u64;
        metrics::record_challenges_cancelled(ids.len());
        self.event_emitter.emit(Event::ChallengesCancelled {
            timestamp: Utc::now(),
            ids,
        });
    }
}

/// Next player input; never resolves once input is gone.
async fn next_input(input: &mut Option<mpsc::Receiver<InputEvent>>) -> Option<InputEvent> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
