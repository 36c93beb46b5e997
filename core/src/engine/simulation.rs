use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::engine::pipeline::{synthesize, Synthesis};
use crate::engine::state::RunState;
use crate::engine::summary::RunSummary;
use crate::model::RunConfig;
use crate::playback::{AudioOutput, CancelToken, PlaybackOutcome, PlaybackStream};
use crate::prelude::{SynthError, SynthResult, SAMPLE_RATE};
use crate::processing::SignalMixer;
use crate::telemetry::{MetricsSnapshot, RunLogger, RunMetrics};

/// Result of a run that did not fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub outcome: PlaybackOutcome,
    /// `None` when a newer run was submitted before this one started rendering.
    pub summary: Option<RunSummary>,
}

/// Owns the playback device and serializes runs through the [`RunState`] machine.
///
/// Only one run is live at a time. Calling [`run`](Self::run) while another
/// run is in progress cancels it, waits for it to return to `Idle`, and then
/// starts the new one. When several runs queue up behind a live one, only
/// the most recently submitted starts; the others end as canceled.
pub struct SimulationEngine {
    stream: PlaybackStream,
    mixer: SignalMixer,
    sample_rate: u32,
    state: Mutex<RunState>,
    idle: Condvar,
    current: Mutex<Option<CancelToken>>,
    state_tx: watch::Sender<RunState>,
    metrics: RunMetrics,
    next_run_id: AtomicU64,
    latest_run_id: AtomicU64,
    last_summary: Mutex<Option<RunSummary>>,
}

impl SimulationEngine {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            stream: PlaybackStream::new(output),
            mixer: SignalMixer::new(),
            sample_rate: SAMPLE_RATE,
            state: Mutex::new(RunState::Idle),
            idle: Condvar::new(),
            current: Mutex::new(None),
            state_tx,
            metrics: RunMetrics::new(),
            next_run_id: AtomicU64::new(1),
            latest_run_id: AtomicU64::new(0),
            last_summary: Mutex::new(None),
        }
    }

    /// Renders, mixes and plays `config`, blocking until playback ends.
    ///
    /// A canceled run returns `Ok` with [`PlaybackOutcome::Canceled`].
    pub fn run(&self, config: RunConfig) -> SynthResult<RunReport> {
        let token = CancelToken::new();
        let logger = RunLogger::new(self.next_run_id.fetch_add(1, Ordering::Relaxed));
        if !self.begin(&token, &logger) {
            logger.record("superseded by a newer run before starting");
            self.metrics.record_canceled();
            return Ok(RunReport {
                run_id: logger.run_id(),
                outcome: PlaybackOutcome::Canceled,
                summary: None,
            });
        }

        let synthesis = match synthesize(&config, self.sample_rate, &self.mixer, |stage| {
            if stage != RunState::Rendering {
                self.set_state(stage, &logger);
            }
        }) {
            Ok(synthesis) => synthesis,
            Err(err) => return Err(self.fail(err, &logger)),
        };
        let Synthesis { buffer, summary } = synthesis;
        logger.record(&format!(
            "{} vehicle(s) on {}, {:.2}s, gain {:.3}, dominant {:.1} Hz",
            summary.vehicles.len(),
            summary.band,
            summary.duration_secs(),
            summary.gain,
            summary.dominant_hz
        ));
        *lock(&self.last_summary) = Some(summary.clone());

        if token.is_canceled() {
            self.finish_canceled(&logger);
            return Ok(RunReport {
                run_id: logger.run_id(),
                outcome: PlaybackOutcome::Canceled,
                summary: Some(summary),
            });
        }

        self.set_state(RunState::Playing, &logger);
        match self.stream.play_with_token(buffer, token) {
            Ok(PlaybackOutcome::Completed) => {
                self.metrics.record_completed();
                self.set_state(RunState::Idle, &logger);
                Ok(RunReport {
                    run_id: logger.run_id(),
                    outcome: PlaybackOutcome::Completed,
                    summary: Some(summary),
                })
            }
            Ok(PlaybackOutcome::Canceled) => {
                self.finish_canceled(&logger);
                Ok(RunReport {
                    run_id: logger.run_id(),
                    outcome: PlaybackOutcome::Canceled,
                    summary: Some(summary),
                })
            }
            Err(err) => Err(self.fail(err, &logger)),
        }
    }

    /// Renders and mixes without touching the device or the run state.
    pub fn render(&self, config: &RunConfig) -> SynthResult<Synthesis> {
        synthesize(config, self.sample_rate, &self.mixer, |_| {})
    }

    /// Cancels the live run, if any. Returns without waiting.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.current).as_ref() {
            token.cancel();
        }
        self.stream.cancel();
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn last_summary(&self) -> Option<RunSummary> {
        lock(&self.last_summary).clone()
    }

    /// Blocks until the engine is idle.
    pub fn wait_idle(&self) {
        let mut state = lock(&self.state);
        while !state.is_idle() {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Claims the engine for a new run, canceling whatever is live.
    ///
    /// Returns `false` without claiming when a run submitted later has
    /// arrived in the meantime.
    fn begin(&self, token: &CancelToken, logger: &RunLogger) -> bool {
        let run_id = logger.run_id();
        let mut state = lock(&self.state);
        self.latest_run_id.fetch_max(run_id, Ordering::AcqRel);
        // Older waiters re-check their id and give up.
        self.idle.notify_all();
        loop {
            if self.latest_run_id.load(Ordering::Acquire) != run_id {
                return false;
            }
            if state.is_idle() {
                break;
            }
            logger.detail(&format!("engine busy ({:?}), canceling active run", *state));
            if let Some(active) = lock(&self.current).as_ref() {
                active.cancel();
            }
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *lock(&self.current) = Some(token.clone());
        self.apply(&mut state, RunState::Rendering, logger);
        true
    }

    fn set_state(&self, next: RunState, logger: &RunLogger) {
        let mut state = lock(&self.state);
        self.apply(&mut state, next, logger);
    }

    fn apply(&self, state: &mut MutexGuard<'_, RunState>, next: RunState, logger: &RunLogger) {
        let previous = **state;
        if !previous.can_transition_to(next) {
            logger.detail(&format!("unexpected transition {:?} -> {:?}", previous, next));
        }
        **state = next;
        logger.transition(previous, next);
        self.state_tx.send_replace(next);
        if next.is_idle() {
            *lock(&self.current) = None;
            self.idle.notify_all();
        }
    }

    fn finish_canceled(&self, logger: &RunLogger) {
        self.metrics.record_canceled();
        self.set_state(RunState::Canceled, logger);
        self.set_state(RunState::Idle, logger);
    }

    fn fail(&self, err: SynthError, logger: &RunLogger) -> SynthError {
        logger.failure(&err.to_string());
        self.metrics.record_failed();
        self.set_state(RunState::Failed, logger);
        self.set_state(RunState::Idle, logger);
        err
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, OutputLayout, RadarBand, SpeedUnit, VehicleProfile};
    use crate::playback::CaptureOutput;
    use std::thread;
    use std::time::Duration;

    fn simple(seconds: f64) -> RunConfig {
        RunConfig::simple(
            60.0,
            SpeedUnit::Mph,
            Direction::Approaching,
            RadarBand::K,
            seconds,
        )
    }

    #[test]
    fn successful_run_returns_to_idle() {
        let output = CaptureOutput::unpaced();
        let engine = SimulationEngine::new(Arc::new(output.clone()));
        let mut states = engine.subscribe();

        let report = engine.run(simple(0.2)).unwrap();
        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(*states.borrow_and_update(), RunState::Idle);
        assert_eq!(output.captured().len(), 8_820 * 2);
        assert_eq!(engine.metrics().completed, 1);
        assert_eq!(engine.last_summary(), report.summary);
    }

    #[test]
    fn invalid_run_fails_without_output() {
        let output = CaptureOutput::unpaced();
        let engine = SimulationEngine::new(Arc::new(output.clone()));
        let bad = RunConfig::simple(
            -3.0,
            SpeedUnit::Kph,
            Direction::Approaching,
            RadarBand::X,
            1.0,
        );
        let err = engine.run(bad).unwrap_err();
        assert!(matches!(err, SynthError::InvalidParameter(_)));
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(output.open_count(), 0);
        assert_eq!(engine.metrics().failed, 1);
    }

    #[test]
    fn cancel_stops_playback_and_allows_next_run() {
        let output = CaptureOutput::new().with_period(441);
        let engine = Arc::new(SimulationEngine::new(Arc::new(output.clone())));

        let runner = Arc::clone(&engine);
        let first = thread::spawn(move || runner.run(simple(5.0)));
        thread::sleep(Duration::from_secs(1));
        assert_eq!(engine.state(), RunState::Playing);
        engine.cancel();
        let report = first.join().unwrap().unwrap();
        assert_eq!(report.outcome, PlaybackOutcome::Canceled);
        assert_eq!(engine.state(), RunState::Idle);

        let second = engine.run(simple(0.05).with_layout(OutputLayout::Mono)).unwrap();
        assert_eq!(second.outcome, PlaybackOutcome::Completed);
        assert_eq!(engine.metrics().canceled, 1);
        assert_eq!(engine.metrics().completed, 1);
    }

    #[test]
    fn new_run_implicitly_cancels_active_run() {
        let output = CaptureOutput::new().with_period(441);
        let engine = Arc::new(SimulationEngine::new(Arc::new(output.clone())));

        let runner = Arc::clone(&engine);
        let first = thread::spawn(move || runner.run(simple(5.0)));
        thread::sleep(Duration::from_millis(300));

        let profiles = vec![
            VehicleProfile::new(30.0, SpeedUnit::Kph, Direction::Approaching, 1.0),
            VehicleProfile::new(60.0, SpeedUnit::Kph, Direction::Receding, 0.5),
        ];
        let config = RunConfig::advanced(profiles, RadarBand::Ka, 0.1).unwrap();
        let second = engine.run(config).unwrap();

        assert_eq!(second.outcome, PlaybackOutcome::Completed);
        assert_eq!(
            first.join().unwrap().unwrap().outcome,
            PlaybackOutcome::Canceled
        );
        assert!(second.run_id > 1);
    }

    #[test]
    fn most_recent_queued_run_wins() {
        let output = CaptureOutput::new().with_period(441);
        let engine = Arc::new(SimulationEngine::new(Arc::new(output)));

        let first_engine = Arc::clone(&engine);
        let first = thread::spawn(move || first_engine.run(simple(5.0)));
        thread::sleep(Duration::from_millis(300));

        let second_engine = Arc::clone(&engine);
        let second = thread::spawn(move || second_engine.run(simple(5.0)));
        thread::sleep(Duration::from_millis(50));

        let third = engine.run(simple(0.1).with_layout(OutputLayout::Mono)).unwrap();
        assert_eq!(third.outcome, PlaybackOutcome::Completed);
        assert!(third.summary.is_some());

        let first = first.join().unwrap().unwrap();
        let second = second.join().unwrap().unwrap();
        assert_eq!(first.outcome, PlaybackOutcome::Canceled);
        assert_eq!(second.outcome, PlaybackOutcome::Canceled);
        assert!(first.run_id < second.run_id && second.run_id < third.run_id);

        let metrics = engine.metrics();
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.canceled, 2);
        assert_eq!(engine.state(), RunState::Idle);
    }

    #[test]
    fn render_leaves_state_untouched() {
        let output = CaptureOutput::unpaced();
        let engine = SimulationEngine::new(Arc::new(output.clone()));
        let synthesis = engine.render(&simple(0.1)).unwrap();
        assert_eq!(synthesis.buffer.frames(), 4_410);
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(output.open_count(), 0);
    }
}
