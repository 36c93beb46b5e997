use std::sync::mpsc::Sender;
use std::sync::Arc;

use thiserror::Error;

use super::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no default output device")]
    NoDevice,

    #[error("failed to query output configs: {0}")]
    StreamConfig(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("output device config mismatch: {message}")]
    ConfigMismatch { message: String },

    #[error("failed to query devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("output worker failed: {0}")]
    Worker(String),
}

/// Terminal notification sent by a [`SampleSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Every sample was handed to the device.
    Drained,
    /// The cancel token was observed inside a device callback.
    Canceled,
    /// The device reported a stream error.
    DeviceError(String),
}

/// Pull-side cursor over a composite buffer, driven by device callbacks.
///
/// Once drained or canceled the source only produces silence and reports
/// its terminal event exactly once.
pub struct SampleSource {
    samples: Arc<[f32]>,
    channels: u16,
    position: usize,
    cancel: CancelToken,
    events: Sender<SourceEvent>,
    finished: bool,
}

impl SampleSource {
    pub fn new(
        samples: Arc<[f32]>,
        channels: u16,
        cancel: CancelToken,
        events: Sender<SourceEvent>,
    ) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            position: 0,
            cancel,
            events,
            finished: false,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fills an interleaved device buffer with `device_channels` per frame.
    ///
    /// Mono sources are copied to every device channel; extra device channels
    /// beyond the source layout stay silent. Returns the number of source
    /// samples consumed.
    ///
    /// `Drained` is reported on the first callback after the last samples
    /// were handed over, so the device has queued that final period before
    /// the stream is closed.
    pub fn fill(&mut self, out: &mut [f32], device_channels: u16) -> usize {
        let device_channels = device_channels.max(1) as usize;
        let source_channels = self.channels as usize;

        if !self.finished && self.cancel.is_canceled() {
            self.finish(SourceEvent::Canceled);
        }
        if self.finished {
            out.fill(0.0);
            return 0;
        }
        if self.is_exhausted() {
            out.fill(0.0);
            self.finish(SourceEvent::Drained);
            return 0;
        }

        let start = self.position;
        for frame in out.chunks_mut(device_channels) {
            if self.is_exhausted() {
                frame.fill(0.0);
                continue;
            }
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = if source_channels == 1 {
                    self.samples[self.position]
                } else if ch < source_channels {
                    self.samples[self.position + ch]
                } else {
                    0.0
                };
            }
            self.position += source_channels;
        }
        self.position - start
    }

    fn is_exhausted(&self) -> bool {
        self.position + self.channels as usize > self.samples.len()
    }

    /// Sender the device error callback uses to reach the waiting playback.
    pub(crate) fn error_reporter(&self) -> Sender<SourceEvent> {
        self.events.clone()
    }

    fn finish(&mut self, event: SourceEvent) {
        self.finished = true;
        let _ = self.events.send(event);
    }
}

/// Handle to an open output stream. Dropping it closes the device.
pub trait OutputHandle {
    fn spec(&self) -> OutputSpec;
}

/// Something that can open an output stream fed by a [`SampleSource`].
pub trait AudioOutput: Send + Sync {
    fn open(
        &self,
        spec: OutputSpec,
        source: SampleSource,
    ) -> Result<Box<dyn OutputHandle>, OutputError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn source(
        samples: Vec<f32>,
        channels: u16,
    ) -> (SampleSource, mpsc::Receiver<SourceEvent>, CancelToken) {
        let (tx, rx) = mpsc::channel();
        let token = CancelToken::new();
        (
            SampleSource::new(samples.into(), channels, token.clone(), tx),
            rx,
            token,
        )
    }

    #[test]
    fn mono_source_fans_out_to_stereo_device() {
        let (mut src, _rx, _) = source(vec![0.1, 0.2, 0.3], 1);
        let mut out = [9.0; 8];
        let used = src.fill(&mut out, 2);
        assert_eq!(used, 3);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.0, 0.0]);
        assert!(!src.is_finished());
    }

    #[test]
    fn drained_waits_for_callback_after_final_samples() {
        let (mut src, rx, _) = source(vec![0.25; 6], 1);
        let mut out = [9.0; 6];
        assert_eq!(src.fill(&mut out, 1), 6);
        assert!(rx.try_recv().is_err());
        assert!(!src.is_finished());

        assert_eq!(src.fill(&mut out, 1), 0);
        assert!(out.iter().all(|&v| v == 0.0));
        assert_eq!(rx.try_recv().unwrap(), SourceEvent::Drained);
        assert!(src.is_finished());

        src.fill(&mut out, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stereo_source_leaves_extra_channels_silent() {
        let (mut src, _rx, _) = source(vec![0.1, -0.1, 0.2, -0.2], 2);
        let mut out = [9.0; 3];
        src.fill(&mut out, 3);
        assert_eq!(out, [0.1, -0.1, 0.0]);
        let mut mono_out = [9.0; 1];
        src.fill(&mut mono_out, 1);
        assert_eq!(mono_out, [0.2]);
    }

    #[test]
    fn cancel_is_observed_at_next_callback() {
        let (mut src, rx, token) = source(vec![0.5; 100], 1);
        let mut out = [0.0; 10];
        assert_eq!(src.fill(&mut out, 1), 10);
        assert!(rx.try_recv().is_err());
        token.cancel();
        assert_eq!(src.fill(&mut out, 1), 0);
        assert!(out.iter().all(|&v| v == 0.0));
        assert_eq!(rx.try_recv().unwrap(), SourceEvent::Canceled);
        src.fill(&mut out, 1);
        assert!(rx.try_recv().is_err());
    }
}
