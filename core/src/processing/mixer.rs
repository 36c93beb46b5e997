use ndarray::{Array1, Array2};

use crate::math::{MatrixHelper, StatsHelper};
use crate::prelude::{SampleBuffer, SynthError, SynthResult, OUTPUT_RANGE};

/// A rendered tone paired with its mixing weight.
#[derive(Debug, Clone)]
pub struct WeightedBuffer {
    pub buffer: SampleBuffer,
    pub weight: f32,
}

impl WeightedBuffer {
    pub fn new(buffer: SampleBuffer, weight: f32) -> Self {
        Self { buffer, weight }
    }
}

/// Composite buffer plus what normalization did to it.
#[derive(Debug, Clone)]
pub struct MixOutput {
    pub buffer: SampleBuffer,
    /// Peak magnitude of the weighted sum before normalization.
    pub peak: f32,
    /// Uniform gain applied to the sum; 1.0 when the peak already fit.
    pub gain: f32,
}

/// Sums weighted tones and normalizes the result once.
///
/// Normalization scales the whole composite by `range / peak` only when the
/// peak exceeds `range`. Quieter composites are left untouched, and samples
/// are never clamped individually.
#[derive(Debug, Clone, Copy)]
pub struct SignalMixer {
    output_range: f32,
}

impl SignalMixer {
    pub fn new() -> Self {
        Self {
            output_range: OUTPUT_RANGE,
        }
    }

    pub fn mix(&self, inputs: &[WeightedBuffer]) -> SynthResult<SampleBuffer> {
        self.mix_with_report(inputs).map(|output| output.buffer)
    }

    pub fn mix_with_report(&self, inputs: &[WeightedBuffer]) -> SynthResult<MixOutput> {
        let first = inputs
            .first()
            .ok_or_else(|| SynthError::InvalidParameter("nothing to mix".into()))?;
        let sample_rate = first.buffer.sample_rate;
        let channels = first.buffer.channels;

        for (index, input) in inputs.iter().enumerate() {
            if input.buffer.sample_rate != sample_rate || input.buffer.channels != channels {
                return Err(SynthError::InvalidParameter(format!(
                    "buffer {} is {} Hz x {} ch, expected {} Hz x {} ch",
                    index + 1,
                    input.buffer.sample_rate,
                    input.buffer.channels,
                    sample_rate,
                    channels
                )));
            }
            if !input.weight.is_finite() || input.weight <= 0.0 {
                return Err(SynthError::InvalidParameter(format!(
                    "weight {} must be finite and positive, got {}",
                    index + 1,
                    input.weight
                )));
            }
        }

        // Shorter buffers are padded with silence up to the longest one.
        let width = inputs
            .iter()
            .map(|input| input.buffer.samples.len())
            .max()
            .unwrap_or(0);
        let mut rows = Array2::<f32>::zeros((inputs.len(), width));
        for (mut row, input) in rows.outer_iter_mut().zip(inputs) {
            for (slot, &sample) in row.iter_mut().zip(&input.buffer.samples) {
                *slot = sample;
            }
        }
        let weights: Array1<f32> = inputs.iter().map(|input| input.weight).collect();
        let mut composite = MatrixHelper::weighted_sum(rows.view(), weights.view()).to_vec();

        let peak = StatsHelper::peak(&composite);
        let gain = self.normalize(&mut composite, peak);
        log::debug!(
            "mixed {} buffer(s): {} samples, peak {:.4}, gain {:.4}",
            inputs.len(),
            composite.len(),
            peak,
            gain
        );

        Ok(MixOutput {
            buffer: SampleBuffer::new(sample_rate, channels, composite),
            peak,
            gain,
        })
    }

    fn normalize(&self, samples: &mut [f32], peak: f32) -> f32 {
        if peak <= self.output_range {
            return 1.0;
        }
        let peak = peak as f64;
        let range = self.output_range as f64;
        for sample in samples.iter_mut() {
            // Dividing first keeps |v / peak| <= 1, so rounding never lands past the range.
            *sample = (*sample as f64 / peak * range) as f32;
        }
        (range / peak) as f32
    }
}

impl Default for SignalMixer {
    fn default() -> Self {
        Self::new()
    }
}
