//! Real-time delivery of a composite buffer to an audio device.
//!
//! [`PlaybackStream`] owns the only blocking operation of a run. Devices are
//! reached through the [`AudioOutput`] trait so the same stream logic drives
//! real hardware ([`CpalOutput`]) and the in-memory [`CaptureOutput`].

pub mod cancel;
pub mod capture;
pub mod cpal_output;
pub mod output;
pub mod stream;

pub use cancel::CancelToken;
pub use capture::CaptureOutput;
pub use cpal_output::CpalOutput;
pub use output::{AudioOutput, OutputError, OutputHandle, OutputSpec, SampleSource, SourceEvent};
pub use stream::{PlaybackOutcome, PlaybackStream};
