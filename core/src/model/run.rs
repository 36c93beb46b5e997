use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::band::RadarBand;
use super::vehicle::{Direction, SpeedUnit, VehicleProfile, DEFAULT_AMPLITUDE};
use crate::prelude::{ensure_duration, ensure_finite_positive, SynthError, SynthResult};

/// Advanced mode accepts at most this many vehicles.
pub const MAX_VEHICLES: usize = 3;

/// Gain of the quadrature channel relative to the in-phase channel.
pub const DEFAULT_QUADRATURE_GAIN: f64 = 1.9;

/// Channel arrangement of the rendered signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// Single channel carrying `a * sin(2*pi*f*t)`.
    Mono,
    /// In-phase / quadrature pair; the sign of the Doppler offset sets which
    /// channel leads.
    #[default]
    Quadrature,
}

impl OutputLayout {
    pub const fn channels(self) -> u16 {
        match self {
            OutputLayout::Mono => 1,
            OutputLayout::Quadrature => 2,
        }
    }
}

impl FromStr for OutputLayout {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mono" => Ok(OutputLayout::Mono),
            "quadrature" | "iq" | "stereo" => Ok(OutputLayout::Quadrature),
            other => Err(SynthError::InvalidParameter(format!(
                "unknown output layout '{}'",
                other
            ))),
        }
    }
}

/// Everything one Run needs. Built once, never mutated while the run is live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub duration_secs: f64,
    pub band: RadarBand,
    pub profiles: Vec<VehicleProfile>,
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default = "default_quadrature_gain")]
    pub quadrature_gain: f64,
}

fn default_quadrature_gain() -> f64 {
    DEFAULT_QUADRATURE_GAIN
}

impl RunConfig {
    /// Simple mode: one vehicle at the default amplitude.
    pub fn simple(
        speed: f64,
        unit: SpeedUnit,
        direction: Direction,
        band: RadarBand,
        duration_secs: f64,
    ) -> Self {
        Self {
            duration_secs,
            band,
            profiles: vec![VehicleProfile::new(
                speed,
                unit,
                direction,
                DEFAULT_AMPLITUDE,
            )],
            layout: OutputLayout::default(),
            quadrature_gain: DEFAULT_QUADRATURE_GAIN,
        }
    }

    /// Advanced mode: one to three vehicles with their own amplitudes.
    pub fn advanced(
        profiles: Vec<VehicleProfile>,
        band: RadarBand,
        duration_secs: f64,
    ) -> SynthResult<Self> {
        let config = Self {
            duration_secs,
            band,
            profiles,
            layout: OutputLayout::default(),
            quadrature_gain: DEFAULT_QUADRATURE_GAIN,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_quadrature_gain(mut self, gain: f64) -> Self {
        self.quadrature_gain = gain;
        self
    }

    pub fn validate(&self) -> SynthResult<()> {
        ensure_duration(self.duration_secs)?;
        if self.profiles.is_empty() || self.profiles.len() > MAX_VEHICLES {
            return Err(SynthError::InvalidParameter(format!(
                "a run needs 1 to {} vehicles, got {}",
                MAX_VEHICLES,
                self.profiles.len()
            )));
        }
        if self.layout == OutputLayout::Quadrature {
            ensure_finite_positive("quadrature gain", self.quadrature_gain)?;
        }
        for (index, profile) in self.profiles.iter().enumerate() {
            profile.validate().map_err(|err| match err {
                SynthError::InvalidParameter(msg) => {
                    SynthError::InvalidParameter(format!("vehicle {}: {}", index + 1, msg))
                }
                other => other,
            })?;
        }
        if self.total_frames(crate::prelude::SAMPLE_RATE) == 0 {
            return Err(SynthError::InvalidParameter(format!(
                "duration {}s is shorter than one sample",
                self.duration_secs
            )));
        }
        Ok(())
    }

    /// `round(duration * sample_rate)`, the frame count of every tone in the run.
    pub fn total_frames(&self, sample_rate: u32) -> usize {
        (self.duration_secs * sample_rate as f64).round() as usize
    }
}
