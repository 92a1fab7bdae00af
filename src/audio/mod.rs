mod effect;
mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub mod render;
#[cfg(feature = "audio")]
mod output;

pub use effect::{Delay, Effect, LowPass, MasterBus, Reverb};
pub use engine::Engine;
pub use frame::{StereoFrame, pan_gains};
pub use sample_buffer::{SLICES, SampleBuffer};

#[cfg(feature = "audio")]
pub use output::{AudioHandle, start_audio};
