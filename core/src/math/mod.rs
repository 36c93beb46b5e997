pub mod doppler;
pub mod fft;
pub mod matrix;
pub mod stats;
pub mod units;

pub use doppler::{DopplerCalculator, SPEED_OF_LIGHT};
pub use fft::SpectrumHelper;
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
pub use units::UnitConverter;
