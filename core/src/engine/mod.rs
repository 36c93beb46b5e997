//! The single Run entry point and its state machine.

pub mod pipeline;
pub mod simulation;
pub mod state;
pub mod summary;

pub use pipeline::{synthesize, Synthesis};
pub use simulation::{RunReport, SimulationEngine};
pub use state::RunState;
pub use summary::{RunSummary, VehicleSummary};
