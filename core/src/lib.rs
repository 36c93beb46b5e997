//! Doppler tone synthesis core for the DTR radar target simulator.
//!
//! A run converts each vehicle's speed into the two-way Doppler offset the
//! radar gun would observe, renders that offset as a tone, mixes up to three
//! tones into one composite normalized once, and streams it to the audio
//! device that drives the radar test hardware.

pub mod engine;
pub mod math;
pub mod model;
pub mod playback;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use engine::{RunReport, RunState, SimulationEngine};
pub use model::{Direction, OutputLayout, RadarBand, RunConfig, SpeedUnit, VehicleProfile};
pub use prelude::{SampleBuffer, SynthError, SynthResult};
