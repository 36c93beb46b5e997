pub mod mixer;
pub mod tone;

pub use mixer::{MixOutput, SignalMixer, WeightedBuffer};
pub use tone::ToneRenderer;
