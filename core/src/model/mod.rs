pub mod band;
pub mod run;
pub mod vehicle;

pub use band::RadarBand;
pub use run::{OutputLayout, RunConfig, DEFAULT_QUADRATURE_GAIN, MAX_VEHICLES};
pub use vehicle::{Direction, SpeedUnit, VehicleProfile, DEFAULT_AMPLITUDE};
