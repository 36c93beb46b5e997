use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::prelude::SynthError;

/// Transmit band of the radar gun under test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RadarBand {
    #[default]
    K,
    Ka,
    X,
}

impl RadarBand {
    pub const ALL: [RadarBand; 3] = [RadarBand::K, RadarBand::Ka, RadarBand::X];

    /// Nominal carrier frequency in Hz.
    pub const fn carrier_hz(self) -> f64 {
        match self {
            RadarBand::K => 24.150e9,
            RadarBand::Ka => 34.7e9,
            RadarBand::X => 10.525e9,
        }
    }

    /// Reverse lookup from a carrier frequency; only the three table values match.
    pub fn from_carrier_hz(carrier_hz: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|band| band.carrier_hz() == carrier_hz)
    }
}

impl fmt::Display for RadarBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RadarBand::K => "K",
            RadarBand::Ka => "Ka",
            RadarBand::X => "X",
        };
        write!(f, "{}-band", label)
    }
}

impl FromStr for RadarBand {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_end_matches("-band") {
            "k" => Ok(RadarBand::K),
            "ka" => Ok(RadarBand::Ka),
            "x" => Ok(RadarBand::X),
            other => Err(SynthError::InvalidParameter(format!(
                "unknown radar band '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_table_matches_band_plan() {
        assert_eq!(RadarBand::K.carrier_hz(), 24.150e9);
        assert_eq!(RadarBand::Ka.carrier_hz(), 34.7e9);
        assert_eq!(RadarBand::X.carrier_hz(), 10.525e9);
    }

    #[test]
    fn carrier_lookup_rejects_off_table_frequency() {
        assert_eq!(RadarBand::from_carrier_hz(34.7e9), Some(RadarBand::Ka));
        assert_eq!(RadarBand::from_carrier_hz(5.8e9), None);
    }

    #[test]
    fn parses_band_names() {
        assert_eq!("Ka".parse::<RadarBand>().unwrap(), RadarBand::Ka);
        assert_eq!("x-band".parse::<RadarBand>().unwrap(), RadarBand::X);
        assert!("ku".parse::<RadarBand>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RadarBand::Ka).unwrap(), "\"ka\"");
    }
}
