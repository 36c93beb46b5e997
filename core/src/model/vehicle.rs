use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::prelude::{SynthError, SynthResult};

/// Amplitude used when a run does not specify one (Simple mode).
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Mph,
    Kph,
}

impl FromStr for SpeedUnit {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mph" => Ok(SpeedUnit::Mph),
            "kph" | "kmh" | "km/h" => Ok(SpeedUnit::Kph),
            other => Err(SynthError::InvalidParameter(format!(
                "unknown speed unit '{}'",
                other
            ))),
        }
    }
}

/// Motion of the vehicle relative to the radar gun.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Approaching,
    Receding,
}

impl Direction {
    /// Sign applied to the Doppler offset.
    pub const fn sign(self) -> f64 {
        match self {
            Direction::Approaching => 1.0,
            Direction::Receding => -1.0,
        }
    }
}

impl FromStr for Direction {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approaching" | "toward" | "towards" => Ok(Direction::Approaching),
            "receding" | "away" => Ok(Direction::Receding),
            other => Err(SynthError::InvalidParameter(format!(
                "unknown direction '{}'",
                other
            ))),
        }
    }
}

/// One simulated vehicle as seen by the radar gun.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VehicleProfile {
    pub speed: f64,
    #[serde(default)]
    pub unit: SpeedUnit,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

fn default_amplitude() -> f64 {
    DEFAULT_AMPLITUDE
}

impl VehicleProfile {
    pub fn new(speed: f64, unit: SpeedUnit, direction: Direction, amplitude: f64) -> Self {
        Self {
            speed,
            unit,
            direction,
            amplitude,
        }
    }

    pub fn validate(&self) -> SynthResult<()> {
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(SynthError::InvalidParameter(format!(
                "speed must be finite and non-negative, got {}",
                self.speed
            )));
        }
        if !self.amplitude.is_finite() || self.amplitude <= 0.0 || self.amplitude > 1.0 {
            return Err(SynthError::InvalidParameter(format!(
                "amplitude must lie in (0, 1], got {}",
                self.amplitude
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_stationary_target() {
        let profile = VehicleProfile::new(0.0, SpeedUnit::Mph, Direction::Approaching, 1.0);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_speed_and_amplitude() {
        let negative = VehicleProfile::new(-1.0, SpeedUnit::Kph, Direction::Receding, 0.5);
        assert!(negative.validate().is_err());
        let silent = VehicleProfile::new(30.0, SpeedUnit::Kph, Direction::Receding, 0.0);
        assert!(silent.validate().is_err());
        let loud = VehicleProfile::new(30.0, SpeedUnit::Kph, Direction::Receding, 1.5);
        assert!(loud.validate().is_err());
        let nan = VehicleProfile::new(f64::NAN, SpeedUnit::Mph, Direction::Approaching, 1.0);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn profile_defaults_from_json() {
        let profile: VehicleProfile = serde_json::from_str(r#"{"speed": 42.0}"#).unwrap();
        assert_eq!(profile.unit, SpeedUnit::Mph);
        assert_eq!(profile.direction, Direction::Approaching);
        assert_eq!(profile.amplitude, DEFAULT_AMPLITUDE);
    }

    #[test]
    fn parses_direction_and_unit_names() {
        assert_eq!("Receding".parse::<Direction>().unwrap(), Direction::Receding);
        assert_eq!("kph".parse::<SpeedUnit>().unwrap(), SpeedUnit::Kph);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
