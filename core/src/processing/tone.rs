use std::f64::consts::PI;

use crate::prelude::{
    ensure_duration, ensure_finite_positive, SampleBuffer, SynthError, SynthResult,
};

/// Renders pure tones at a signed Doppler offset.
///
/// Rendering is a pure function of its arguments: identical calls produce
/// identical buffers. The sign of `frequency_hz` carries the direction of
/// travel; no samples are inverted or reversed here.
pub struct ToneRenderer;

impl ToneRenderer {
    /// Mono tone: `amplitude * sin(2*pi*f*t)` for `t = i / sample_rate`,
    /// `i = 0..round(duration * sample_rate)`.
    pub fn render(
        frequency_hz: f64,
        amplitude: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> SynthResult<SampleBuffer> {
        let frames = Self::check(frequency_hz, amplitude, duration_secs, sample_rate)?;
        let step = 2.0 * PI * frequency_hz / sample_rate as f64;
        let samples = (0..frames)
            .map(|i| (amplitude * (step * i as f64).sin()) as f32)
            .collect();
        Ok(SampleBuffer::mono(sample_rate, samples))
    }

    /// Interleaved I/Q tone: `[a*cos(2*pi*f*t), gain*a*sin(2*pi*f*t)]` per frame.
    ///
    /// With a positive offset the in-phase channel leads the quadrature
    /// channel by a quarter cycle; a negative offset reverses that.
    pub fn render_quadrature(
        frequency_hz: f64,
        amplitude: f64,
        quadrature_gain: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> SynthResult<SampleBuffer> {
        let frames = Self::check(frequency_hz, amplitude, duration_secs, sample_rate)?;
        ensure_finite_positive("quadrature gain", quadrature_gain)?;
        let step = 2.0 * PI * frequency_hz / sample_rate as f64;
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let phase = step * i as f64;
            samples.push((amplitude * phase.cos()) as f32);
            samples.push((quadrature_gain * amplitude * phase.sin()) as f32);
        }
        Ok(SampleBuffer::new(sample_rate, 2, samples))
    }

    /// Validates the shared preconditions and returns the frame count.
    fn check(
        frequency_hz: f64,
        amplitude: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> SynthResult<usize> {
        if sample_rate == 0 {
            return Err(SynthError::InvalidParameter(
                "sample rate must be positive".into(),
            ));
        }
        ensure_duration(duration_secs)?;
        if !amplitude.is_finite() || amplitude <= 0.0 || amplitude > 1.0 {
            return Err(SynthError::InvalidParameter(format!(
                "amplitude must lie in (0, 1], got {}",
                amplitude
            )));
        }
        let nyquist = sample_rate as f64 / 2.0;
        if !frequency_hz.is_finite() || frequency_hz.abs() >= nyquist {
            return Err(SynthError::InvalidParameter(format!(
                "tone of {} Hz cannot be represented below the {} Hz Nyquist limit",
                frequency_hz, nyquist
            )));
        }
        Ok((duration_secs * sample_rate as f64).round() as usize)
    }
}
