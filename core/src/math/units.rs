use crate::model::SpeedUnit;
use crate::prelude::{SynthError, SynthResult};

const MPH_TO_MPS: f64 = 0.44704;
const KPH_TO_MPS: f64 = 1000.0 / 3600.0;

pub struct UnitConverter;

impl UnitConverter {
    /// Converts a speed to meters per second.
    pub fn to_meters_per_second(value: f64, unit: SpeedUnit) -> SynthResult<f64> {
        if !value.is_finite() || value < 0.0 {
            return Err(SynthError::InvalidParameter(format!(
                "speed must be finite and non-negative, got {}",
                value
            )));
        }
        let factor = match unit {
            SpeedUnit::Mph => MPH_TO_MPS,
            SpeedUnit::Kph => KPH_TO_MPS,
        };
        Ok(value * factor)
    }
}
