use anyhow::Context;
use dopplercore::model::DEFAULT_QUADRATURE_GAIN;
use dopplercore::{Direction, OutputLayout, RadarBand, RunConfig, SpeedUnit, VehicleProfile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_duration() -> f64 {
    5.0
}

fn default_quadrature_gain() -> f64 {
    DEFAULT_QUADRATURE_GAIN
}

/// Run description as read from YAML, the CLI, or the bridge's JSON body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunFile {
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default)]
    pub band: RadarBand,
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default = "default_quadrature_gain")]
    pub quadrature_gain: f64,
    pub vehicles: Vec<VehicleProfile>,
}

impl RunFile {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading run file {}", path_ref.display()))?;
        let file: RunFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing run file {}", path_ref.display()))?;
        Ok(file)
    }

    /// Simple mode: a single vehicle described on the command line.
    pub fn from_args(
        speed: f64,
        unit: SpeedUnit,
        direction: Direction,
        band: RadarBand,
        duration_secs: f64,
    ) -> Self {
        let config = RunConfig::simple(speed, unit, direction, band, duration_secs);
        Self {
            duration_secs,
            band,
            layout: config.layout,
            quadrature_gain: config.quadrature_gain,
            vehicles: config.profiles,
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_quadrature_gain(mut self, gain: f64) -> Self {
        self.quadrature_gain = gain;
        self
    }

    pub fn to_run_config(&self) -> anyhow::Result<RunConfig> {
        let config = RunConfig {
            duration_secs: self.duration_secs,
            band: self.band,
            profiles: self.vehicles.clone(),
            layout: self.layout,
            quadrature_gain: self.quadrature_gain,
        };
        config.validate().context("validating run description")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn run_file_from_args_produces_simple_config() {
        let file = RunFile::from_args(
            60.0,
            SpeedUnit::Mph,
            Direction::Approaching,
            RadarBand::K,
            5.0,
        );
        let config = file.to_run_config().unwrap();
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.layout, OutputLayout::Quadrature);
        assert_eq!(config.total_frames(44_100), 220_500);
    }

    #[test]
    fn run_file_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"duration_secs: 3.0\nband: ka\nlayout: mono\nvehicles:\n  - speed: 30\n    unit: kph\n  - speed: 60\n    unit: kph\n    direction: receding\n    amplitude: 0.5\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let file = RunFile::load(&path).unwrap();
        assert_eq!(file.band, RadarBand::Ka);
        assert_eq!(file.vehicles.len(), 2);
        assert_eq!(file.vehicles[0].amplitude, 1.0);
        assert_eq!(file.vehicles[1].direction, Direction::Receding);

        let config = file.to_run_config().unwrap();
        assert_eq!(config.layout, OutputLayout::Mono);
    }

    #[test]
    fn run_file_rejects_four_vehicles() {
        let vehicle = VehicleProfile::new(20.0, SpeedUnit::Mph, Direction::Approaching, 0.5);
        let file = RunFile {
            duration_secs: 1.0,
            band: RadarBand::X,
            layout: OutputLayout::Mono,
            quadrature_gain: DEFAULT_QUADRATURE_GAIN,
            vehicles: vec![vehicle; 4],
        };
        assert!(file.to_run_config().is_err());
    }

    #[test]
    fn run_file_load_reports_path_on_bad_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"band: [not a band\n").unwrap();
        let path = temp.into_temp_path();
        let err = RunFile::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing run file"));
    }
}
