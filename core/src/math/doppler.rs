use crate::model::{Direction, RadarBand};
use crate::prelude::{SynthError, SynthResult};

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Two-way radar Doppler offset, `f_d = 2 * v * f_t / c`.
pub struct DopplerCalculator;

impl DopplerCalculator {
    /// Signed Doppler offset in Hz: positive when approaching, negative when receding.
    ///
    /// `carrier_hz` must be one of the band table frequencies.
    pub fn doppler_frequency(
        speed_mps: f64,
        direction: Direction,
        carrier_hz: f64,
    ) -> SynthResult<f64> {
        if !speed_mps.is_finite() || speed_mps < 0.0 {
            return Err(SynthError::InvalidParameter(format!(
                "speed must be finite and non-negative, got {} m/s",
                speed_mps
            )));
        }
        if RadarBand::from_carrier_hz(carrier_hz).is_none() {
            return Err(SynthError::InvalidParameter(format!(
                "carrier {} Hz is not a K, Ka or X band frequency",
                carrier_hz
            )));
        }
        Ok(direction.sign() * 2.0 * speed_mps * carrier_hz / SPEED_OF_LIGHT)
    }
}
