use serde::{Deserialize, Serialize};

/// Sample rate shared by every buffer the engine produces.
pub const SAMPLE_RATE: u32 = 44_100;

/// Largest sample magnitude the output device can represent.
pub const OUTPUT_RANGE: f32 = 1.0;

/// Longest tone a run may request; buffers are rendered whole, up front.
pub const MAX_DURATION_SECS: f64 = 600.0;

/// Interleaved block of f32 samples at a fixed rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, 1, samples)
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copies one channel out of the interleaved samples.
    pub fn channel(&self, index: u16) -> Vec<f32> {
        if index >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(index as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }
}

/// Common error type for synthesis and playback.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SynthError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
}

pub type SynthResult<T> = Result<T, SynthError>;

pub(crate) fn ensure_finite_positive(name: &str, value: f64) -> SynthResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SynthError::InvalidParameter(format!(
            "{} must be finite and positive, got {}",
            name, value
        )));
    }
    Ok(())
}

pub(crate) fn ensure_duration(duration_secs: f64) -> SynthResult<()> {
    ensure_finite_positive("duration", duration_secs)?;
    if duration_secs > MAX_DURATION_SECS {
        return Err(SynthError::InvalidParameter(format!(
            "duration {}s exceeds the {}s limit",
            duration_secs, MAX_DURATION_SECS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_extracts_interleaved_samples() {
        let buffer = SampleBuffer::new(4, 2, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0), vec![1.0, 2.0, 3.0]);
        assert_eq!(buffer.channel(1), vec![-1.0, -2.0, -3.0]);
        assert!(buffer.channel(2).is_empty());
        assert_eq!(buffer.duration_secs(), 0.75);
    }

    #[test]
    fn finite_positive_rejects_nan_and_zero() {
        assert!(ensure_finite_positive("duration", 1.0).is_ok());
        assert!(ensure_finite_positive("duration", 0.0).is_err());
        assert!(ensure_finite_positive("duration", f64::NAN).is_err());
        assert!(ensure_finite_positive("duration", f64::INFINITY).is_err());
    }

    #[test]
    fn duration_is_capped() {
        assert!(ensure_duration(MAX_DURATION_SECS).is_ok());
        assert!(ensure_duration(MAX_DURATION_SECS + 1.0).is_err());
        assert!(matches!(
            ensure_duration(1e7),
            Err(SynthError::InvalidParameter(_))
        ));
    }
}
