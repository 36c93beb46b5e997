use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Wraps a `rustfft` plan to locate the strongest tone in a buffer.
pub struct SpectrumHelper {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
}

impl SpectrumHelper {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Forward transform of a complex sequence, zero-padded or truncated to the plan size.
    pub fn forward(&self, input: &[Complex32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = input.iter().take(self.size).copied().collect();
        buffer.resize(self.size, Complex32::zero());
        self.fft.process(&mut buffer);
        buffer
    }

    /// Magnitude of the strongest bin of a real signal, reported as a
    /// non-negative frequency in Hz.
    pub fn dominant_frequency(&self, samples: &[f32], sample_rate: u32) -> f64 {
        let input: Vec<Complex32> = samples.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        let spectrum = self.forward(&input);
        let half = self.size / 2;
        let bin = strongest_bin(&spectrum[..=half.min(spectrum.len() - 1)]);
        bin as f64 * sample_rate as f64 / self.size as f64
    }

    /// Signed frequency of the strongest component of an I/Q pair.
    pub fn dominant_frequency_iq(
        &self,
        in_phase: &[f32],
        quadrature: &[f32],
        sample_rate: u32,
    ) -> f64 {
        let input: Vec<Complex32> = in_phase
            .iter()
            .zip(quadrature)
            .map(|(&i, &q)| Complex32::new(i, q))
            .collect();
        let spectrum = self.forward(&input);
        let bin = strongest_bin(&spectrum);
        let signed = if bin > self.size / 2 {
            bin as f64 - self.size as f64
        } else {
            bin as f64
        };
        signed * sample_rate as f64 / self.size as f64
    }
}

fn strongest_bin(spectrum: &[Complex32]) -> usize {
    spectrum
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |(best, best_mag), (idx, value)| {
            let mag = value.norm_sqr();
            if mag > best_mag {
                (idx, mag)
            } else {
                (best, best_mag)
            }
        })
        .0
}
