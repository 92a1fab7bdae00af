pub mod audio;
pub mod audio_api;
pub mod loader;
pub mod pipeline;
pub mod sequencer;
pub mod shared;
pub mod transport;

pub use audio_api::{AudioCommand, Instruments, InstrumentSink, EffectsSink};
pub use sequencer::Sequencer;
pub use shared::SequencerEvent;
pub use transport::Transport;
