use crate::workflow::runner::Runner;
use dopplercore::engine::RunSummary;
use dopplercore::playback::PlaybackOutcome;
use dopplercore::telemetry::MetricsSnapshot;
use dopplercore::{RunReport, RunState};
use serde::{Deserialize, Serialize};

/// Result of the most recent run started through the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    pub last_run_id: Option<u64>,
    pub last_outcome: Option<PlaybackOutcome>,
    pub last_error: Option<String>,
}

impl RunHistory {
    pub fn record_report(&mut self, report: &RunReport) {
        self.last_run_id = Some(report.run_id);
        self.last_outcome = Some(report.outcome);
        self.last_error = None;
    }

    pub fn record_error(&mut self, err: &anyhow::Error) {
        self.last_outcome = None;
        self.last_error = Some(format!("{:#}", err));
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusModel {
    pub state: RunState,
    pub metrics: MetricsSnapshot,
    pub last_summary: Option<RunSummary>,
    #[serde(flatten)]
    pub history: RunHistory,
}

impl StatusModel {
    pub fn capture(runner: &Runner, history: &RunHistory) -> Self {
        Self {
            state: runner.state(),
            metrics: runner.metrics(),
            last_summary: runner.last_summary(),
            history: history.clone(),
        }
    }
}
