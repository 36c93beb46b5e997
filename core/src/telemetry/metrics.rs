use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub struct RunMetrics {
    inner: Mutex<MetricsSnapshot>,
}

/// Terminal run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub completed: usize,
    pub canceled: usize,
    pub failed: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_completed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.completed += 1;
        }
    }

    pub fn record_canceled(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.canceled += 1;
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = RunMetrics::new();
        metrics.record_completed();
        metrics.record_completed();
        metrics.record_canceled();
        metrics.record_failed();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                completed: 2,
                canceled: 1,
                failed: 1
            }
        );
    }
}
