use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::cancel::CancelToken;
use super::output::{
    AudioOutput, OutputError, OutputHandle, OutputSpec, SampleSource, SourceEvent,
};
use crate::prelude::{SampleBuffer, SynthError, SynthResult};

/// How often the waiting caller re-checks its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Pause before the single retry of a failed device open.
const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Slack past the buffer duration before a silent device counts as stalled.
const STALL_GRACE: Duration = Duration::from_secs(2);

/// How a playback ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackOutcome {
    Completed,
    Canceled,
}

/// Streams composite buffers to an [`AudioOutput`], one at a time.
///
/// Starting a playback while another is active cancels the earlier one and
/// waits for it to release the device before opening it again.
pub struct PlaybackStream {
    output: Arc<dyn AudioOutput>,
    active: Mutex<Option<CancelToken>>,
    device: Mutex<()>,
}

impl PlaybackStream {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            active: Mutex::new(None),
            device: Mutex::new(()),
        }
    }

    /// Plays `buffer` and blocks until it finishes or is canceled.
    pub fn play(&self, buffer: SampleBuffer) -> SynthResult<PlaybackOutcome> {
        self.play_with_token(buffer, CancelToken::new())
    }

    /// Like [`play`](Self::play), canceled through a caller-owned token.
    pub fn play_with_token(
        &self,
        buffer: SampleBuffer,
        token: CancelToken,
    ) -> SynthResult<PlaybackOutcome> {
        if buffer.sample_rate == 0 || buffer.channels == 0 {
            return Err(SynthError::InvalidParameter(format!(
                "cannot play {} Hz with {} channel(s)",
                buffer.sample_rate, buffer.channels
            )));
        }

        if let Some(previous) = self.lock_active().replace(token.clone()) {
            if !previous.same_as(&token) {
                debug!("implicitly canceling the previous playback");
                previous.cancel();
            }
        }

        let _device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        let result = if token.is_canceled() {
            Ok(PlaybackOutcome::Canceled)
        } else {
            self.stream(buffer, &token)
        };
        self.release(&token);
        result
    }

    /// Stops the active playback, if any. Returns promptly; the device is
    /// released by the playing thread within one device period.
    pub fn cancel(&self) {
        if let Some(token) = self.lock_active().as_ref() {
            token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    fn stream(&self, buffer: SampleBuffer, token: &CancelToken) -> SynthResult<PlaybackOutcome> {
        let spec = OutputSpec {
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
        };
        let duration = Duration::from_secs_f64(buffer.duration_secs());
        let samples: Arc<[f32]> = buffer.samples.into();
        let (events_tx, events_rx) = mpsc::channel();

        let handle = self.open_with_retry(spec, || {
            SampleSource::new(
                Arc::clone(&samples),
                spec.channels,
                token.clone(),
                events_tx.clone(),
            )
        })?;
        drop(events_tx);
        let opened = handle.spec();
        info!(
            "playing {:.2}s at {} Hz ({} ch into {} device ch)",
            duration.as_secs_f64(),
            opened.sample_rate,
            spec.channels,
            opened.channels
        );

        let deadline = Instant::now() + duration + STALL_GRACE;
        let outcome = loop {
            match events_rx.recv_timeout(POLL_INTERVAL) {
                Ok(SourceEvent::Drained) => break Ok(PlaybackOutcome::Completed),
                Ok(SourceEvent::Canceled) => break Ok(PlaybackOutcome::Canceled),
                Ok(SourceEvent::DeviceError(message)) => {
                    break Err(SynthError::DeviceUnavailable(message))
                }
                Err(RecvTimeoutError::Timeout) => {
                    if token.is_canceled() {
                        break Ok(PlaybackOutcome::Canceled);
                    }
                    if Instant::now() > deadline {
                        break Err(SynthError::DeviceUnavailable(
                            "output device stopped consuming samples".into(),
                        ));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(SynthError::DeviceUnavailable(
                        "output stream closed unexpectedly".into(),
                    ))
                }
            }
        };

        // Closing the device here keeps release ordered before the next open.
        drop(handle);
        debug!("playback finished: {:?}", outcome);
        outcome
    }

    fn open_with_retry<F>(
        &self,
        spec: OutputSpec,
        mut make_source: F,
    ) -> SynthResult<Box<dyn OutputHandle>>
    where
        F: FnMut() -> SampleSource,
    {
        match self.output.open(spec, make_source()) {
            Ok(handle) => Ok(handle),
            Err(first) => {
                warn!("opening output failed ({}), retrying once", first);
                thread::sleep(RETRY_DELAY);
                self.output
                    .open(spec, make_source())
                    .map_err(|err: OutputError| SynthError::DeviceUnavailable(err.to_string()))
            }
        }
    }

    fn release(&self, token: &CancelToken) {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|current| current.same_as(token)) {
            *active = None;
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancelToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
