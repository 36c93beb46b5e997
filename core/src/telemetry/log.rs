use log::{debug, info, warn};

use crate::engine::RunState;

/// Tags engine log records with the run they belong to.
pub struct RunLogger {
    run_id: u64,
}

impl RunLogger {
    pub fn new(run_id: u64) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn record(&self, message: &str) {
        info!("[run {}] {}", self.run_id, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[run {}] {}", self.run_id, message);
    }

    pub fn transition(&self, from: RunState, to: RunState) {
        info!("[run {}] {:?} -> {:?}", self.run_id, from, to);
    }

    pub fn failure(&self, message: &str) {
        warn!("[run {}] failed: {}", self.run_id, message);
    }
}
