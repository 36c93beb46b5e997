use serde::{Deserialize, Serialize};

use crate::model::{OutputLayout, RadarBand};

/// What a vehicle contributed to the composite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleSummary {
    pub speed_mps: f64,
    /// Signed Doppler offset in Hz.
    pub offset_hz: f64,
    pub weight: f32,
}

/// Description of a rendered composite, for logs and the control bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub band: RadarBand,
    pub carrier_hz: f64,
    pub layout: OutputLayout,
    pub sample_rate: u32,
    pub frames: usize,
    pub vehicles: Vec<VehicleSummary>,
    /// Peak of the weighted sum before normalization.
    pub peak: f32,
    /// Uniform gain applied by normalization.
    pub gain: f32,
    /// RMS level of the composite as played.
    pub rms: f32,
    /// Strongest frequency measured in the composite; signed for quadrature output.
    pub dominant_hz: f64,
}

impl RunSummary {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.sample_rate as f64
        }
    }
}
