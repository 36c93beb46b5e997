use crate::workflow::config::RunFile;
use anyhow::Context;
use dopplercore::engine::RunSummary;
use dopplercore::playback::AudioOutput;
use dopplercore::telemetry::MetricsSnapshot;
use dopplercore::{RunReport, RunState, SimulationEngine};
use std::sync::Arc;

/// Shared handle on the engine, cloned into the CLI and the bridge.
#[derive(Clone)]
pub struct Runner {
    engine: Arc<SimulationEngine>,
}

impl Runner {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            engine: Arc::new(SimulationEngine::new(output)),
        }
    }

    /// Plays `file` and blocks until the run ends.
    pub fn execute(&self, file: &RunFile) -> anyhow::Result<RunReport> {
        let config = file.to_run_config()?;
        self.engine.run(config).context("executing simulation run")
    }

    /// Renders `file` without playing it.
    pub fn preview(&self, file: &RunFile) -> anyhow::Result<RunSummary> {
        let config = file.to_run_config()?;
        let synthesis = self
            .engine
            .render(&config)
            .context("rendering simulation run")?;
        Ok(synthesis.summary)
    }

    pub fn cancel(&self) {
        self.engine.cancel();
    }

    /// Cancels the live run and waits until the device is released.
    pub fn shutdown(&self) {
        self.engine.cancel();
        self.engine.wait_idle();
    }

    pub fn state(&self) -> RunState {
        self.engine.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.metrics()
    }

    pub fn last_summary(&self) -> Option<RunSummary> {
        self.engine.last_summary()
    }
}
