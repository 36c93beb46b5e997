use crate::engine::state::RunState;
use crate::engine::summary::{RunSummary, VehicleSummary};
use crate::math::{DopplerCalculator, SpectrumHelper, StatsHelper, UnitConverter};
use crate::model::{OutputLayout, RunConfig};
use crate::prelude::{SampleBuffer, SynthResult};
use crate::processing::{SignalMixer, ToneRenderer, WeightedBuffer};

/// Composite buffer ready for playback, plus its description.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub buffer: SampleBuffer,
    pub summary: RunSummary,
}

/// Runs UnitConverter -> DopplerCalculator -> ToneRenderer -> SignalMixer.
///
/// `on_stage` is told when rendering and mixing begin. Each vehicle is
/// rendered at unit amplitude; its profile amplitude becomes the mixing
/// weight, so normalization happens exactly once over the composite.
pub fn synthesize<F>(
    config: &RunConfig,
    sample_rate: u32,
    mixer: &SignalMixer,
    mut on_stage: F,
) -> SynthResult<Synthesis>
where
    F: FnMut(RunState),
{
    config.validate()?;
    on_stage(RunState::Rendering);

    let mut inputs = Vec::with_capacity(config.profiles.len());
    let mut vehicles = Vec::with_capacity(config.profiles.len());
    for profile in &config.profiles {
        let speed_mps = UnitConverter::to_meters_per_second(profile.speed, profile.unit)?;
        let offset_hz = DopplerCalculator::doppler_frequency(
            speed_mps,
            profile.direction,
            config.band.carrier_hz(),
        )?;
        let buffer = match config.layout {
            OutputLayout::Mono => {
                ToneRenderer::render(offset_hz, 1.0, config.duration_secs, sample_rate)?
            }
            OutputLayout::Quadrature => ToneRenderer::render_quadrature(
                offset_hz,
                1.0,
                config.quadrature_gain,
                config.duration_secs,
                sample_rate,
            )?,
        };
        let weight = profile.amplitude as f32;
        vehicles.push(VehicleSummary {
            speed_mps,
            offset_hz,
            weight,
        });
        inputs.push(WeightedBuffer::new(buffer, weight));
    }

    on_stage(RunState::Mixing);
    let mixed = mixer.mix_with_report(&inputs)?;
    drop(inputs);

    let dominant_hz = measure_dominant(&mixed.buffer, config.layout);
    let summary = RunSummary {
        band: config.band,
        carrier_hz: config.band.carrier_hz(),
        layout: config.layout,
        sample_rate,
        frames: mixed.buffer.frames(),
        vehicles,
        peak: mixed.peak,
        gain: mixed.gain,
        rms: StatsHelper::rms(&mixed.buffer.samples),
        dominant_hz,
    };

    Ok(Synthesis {
        buffer: mixed.buffer,
        summary,
    })
}

/// FFT over at most one second of the composite (1 Hz resolution).
fn measure_dominant(buffer: &SampleBuffer, layout: OutputLayout) -> f64 {
    let window = buffer.frames().min(buffer.sample_rate as usize);
    if window == 0 {
        return 0.0;
    }
    let helper = SpectrumHelper::new(window);
    match layout {
        OutputLayout::Mono => helper.dominant_frequency(&buffer.samples, buffer.sample_rate),
        OutputLayout::Quadrature => {
            let in_phase = buffer.channel(0);
            let quadrature = buffer.channel(1);
            helper.dominant_frequency_iq(&in_phase, &quadrature, buffer.sample_rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, RadarBand, SpeedUnit, VehicleProfile};
    use crate::prelude::{SynthError, SAMPLE_RATE};

    #[test]
    fn simple_k_band_run_renders_single_tone() {
        let config = RunConfig::simple(
            60.0,
            SpeedUnit::Mph,
            Direction::Approaching,
            RadarBand::K,
            5.0,
        )
        .with_layout(OutputLayout::Mono);
        let mut stages = Vec::new();
        let synthesis =
            synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |s| stages.push(s)).unwrap();

        assert_eq!(stages, vec![RunState::Rendering, RunState::Mixing]);
        assert_eq!(synthesis.buffer.samples.len(), 220_500);
        assert_eq!(synthesis.summary.gain, 1.0);
        assert!((synthesis.summary.rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        let offset = synthesis.summary.vehicles[0].offset_hz;
        assert!((offset - 4321.396).abs() < 0.01);
        assert!((synthesis.summary.dominant_hz - offset).abs() <= 1.0);
    }

    #[test]
    fn advanced_ka_band_run_mixes_three_vehicles() {
        let profiles = vec![
            VehicleProfile::new(30.0, SpeedUnit::Kph, Direction::Approaching, 1.0),
            VehicleProfile::new(60.0, SpeedUnit::Kph, Direction::Approaching, 0.5),
            VehicleProfile::new(90.0, SpeedUnit::Kph, Direction::Approaching, 0.25),
        ];
        let config = RunConfig::advanced(profiles, RadarBand::Ka, 3.0).unwrap();
        let synthesis = synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |_| {}).unwrap();

        let offsets: Vec<f64> = synthesis
            .summary
            .vehicles
            .iter()
            .map(|v| v.offset_hz)
            .collect();
        assert!((offsets[1] - 2.0 * offsets[0]).abs() < 1e-6);
        assert!((offsets[2] - 3.0 * offsets[0]).abs() < 1e-6);
        assert_eq!(synthesis.buffer.channels, 2);
        assert_eq!(synthesis.buffer.frames(), 132_300);
        assert!(synthesis.summary.peak > 1.0);
        assert!(synthesis.summary.gain < 1.0);
        assert!(StatsHelper::peak(&synthesis.buffer.samples) <= 1.0);
        assert!((synthesis.summary.dominant_hz - offsets[0]).abs() <= 1.0);
    }

    #[test]
    fn receding_vehicle_measures_negative_in_quadrature() {
        let config = RunConfig::simple(
            40.0,
            SpeedUnit::Mph,
            Direction::Receding,
            RadarBand::X,
            1.0,
        );
        let synthesis = synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |_| {}).unwrap();
        let offset = synthesis.summary.vehicles[0].offset_hz;
        assert!(offset < 0.0);
        assert!((synthesis.summary.dominant_hz - offset).abs() <= 1.0);
    }

    #[test]
    fn stationary_vehicles_are_valid() {
        let profiles = vec![
            VehicleProfile::new(0.0, SpeedUnit::Mph, Direction::Approaching, 1.0),
            VehicleProfile::new(0.0, SpeedUnit::Mph, Direction::Receding, 0.5),
            VehicleProfile::new(0.0, SpeedUnit::Kph, Direction::Approaching, 0.25),
        ];
        let config = RunConfig::advanced(profiles, RadarBand::K, 0.5)
            .unwrap()
            .with_layout(OutputLayout::Mono);
        let synthesis = synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |_| {}).unwrap();
        assert!(synthesis.buffer.samples.iter().all(|&v| v == 0.0));
        assert_eq!(synthesis.summary.dominant_hz, 0.0);
    }

    #[test]
    fn invalid_config_fails_before_rendering() {
        let mut config = RunConfig::simple(
            60.0,
            SpeedUnit::Mph,
            Direction::Approaching,
            RadarBand::K,
            5.0,
        );
        config.duration_secs = -1.0;
        let mut stages = Vec::new();
        let err =
            synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |s| stages.push(s)).unwrap_err();
        assert!(matches!(err, SynthError::InvalidParameter(_)));
        assert!(stages.is_empty());
    }

    #[test]
    fn offset_beyond_nyquist_is_rejected() {
        let config = RunConfig::simple(
            250.0,
            SpeedUnit::Mph,
            Direction::Approaching,
            RadarBand::Ka,
            1.0,
        );
        let err = synthesize(&config, SAMPLE_RATE, &SignalMixer::new(), |_| {}).unwrap_err();
        assert!(matches!(err, SynthError::InvalidParameter(_)));
    }
}
