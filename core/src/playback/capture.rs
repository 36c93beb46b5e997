use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::output::{AudioOutput, OutputError, OutputHandle, OutputSpec, SampleSource};

const DEFAULT_PERIOD_FRAMES: usize = 512;

/// In-memory output device.
///
/// A worker thread pulls one period at a time from the source, optionally at
/// real-time pace, and records every sample it received. Used for offline
/// runs and for exercising playback without audio hardware.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    period_frames: usize,
    realtime: bool,
    captured: Arc<Mutex<Vec<f32>>>,
    opens: Arc<AtomicUsize>,
}

struct CaptureHandle {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    spec: OutputSpec,
}

impl OutputHandle for CaptureHandle {
    fn spec(&self) -> OutputSpec {
        self.spec
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl CaptureOutput {
    /// Paced at the buffer's sample rate, like a real device.
    pub fn new() -> Self {
        Self {
            period_frames: DEFAULT_PERIOD_FRAMES,
            realtime: true,
            captured: Arc::new(Mutex::new(Vec::new())),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Drains as fast as the worker can run.
    pub fn unpaced() -> Self {
        Self {
            realtime: false,
            ..Self::new()
        }
    }

    pub fn with_period(mut self, period_frames: usize) -> Self {
        self.period_frames = period_frames.max(1);
        self
    }

    /// Samples received during the most recent open.
    pub fn captured(&self) -> Vec<f32> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }
}

impl Default for CaptureOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CaptureOutput {
    fn open(
        &self,
        spec: OutputSpec,
        mut source: SampleSource,
    ) -> Result<Box<dyn OutputHandle>, OutputError> {
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(OutputError::ConfigMismatch {
                message: format!(
                    "cannot capture {} Hz with {} channel(s)",
                    spec.sample_rate, spec.channels
                ),
            });
        }
        self.opens.fetch_add(1, Ordering::AcqRel);
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_worker = Arc::clone(&stop);
        let captured = Arc::clone(&self.captured);
        let channels = spec.channels;
        let period_frames = self.period_frames;
        let pace = self.realtime.then(|| {
            Duration::from_secs_f64(period_frames as f64 / spec.sample_rate as f64)
        });

        let worker = thread::Builder::new()
            .name("capture-output".into())
            .spawn(move || {
                let mut chunk = vec![0.0_f32; period_frames * channels as usize];
                while !stop_worker.load(Ordering::Acquire) {
                    let used = source.fill(&mut chunk, channels);
                    if used > 0 {
                        captured
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..used]);
                    }
                    if source.is_finished() {
                        break;
                    }
                    match pace {
                        Some(period) => thread::sleep(period),
                        None => thread::yield_now(),
                    }
                }
            })
            .map_err(|err| OutputError::Worker(err.to_string()))?;

        Ok(Box::new(CaptureHandle {
            stop,
            worker: Some(worker),
            spec,
        }))
    }
}
