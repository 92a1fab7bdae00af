// The seam between the sequencer and whatever makes sound.
//
// The sequencer never talks to an audio device. It resolves each hit into an
// AudioCommand and hands it to the sink registered for that track's source.
// In the app every sink is a channel into the audio engine; tests plug in
// recorders.

use crossbeam_channel::Sender;

pub use crate::audio::SampleBuffer;
use crate::pipeline::project::InstrumentSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PulseChannel {
    Radio,
    Mic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleTrigger {
    pub pad: usize,
    pub pitch: Option<i16>, // semitones
    pub slice: Option<i16>,
    pub velocity: f32, // 0.0 - 1.0
    pub pan: Option<i16>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteTrigger {
    pub frequency: f32,
    pub duration: f32, // seconds, a hint for the envelope
    pub velocity: f32,
    pub pan: Option<i16>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectParam {
    FilterCutoff(f32), // Hz
    DelayMix(f32),     // percent
    ReverbMix(f32),    // percent
    Grain(f32),        // percent
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't touch the disk, so buffers are loaded up front and registered
    RegisterSample { pad: usize, buffer: SampleBuffer },
    SetBed { channel: PulseChannel, buffer: SampleBuffer },

    Sample(SampleTrigger),
    Note(NoteTrigger),
    Pulse { channel: PulseChannel, seconds: f32 },
    Effect(EffectParam),
}

/// One instrument behind a track source.
pub trait InstrumentSink: Send {
    fn trigger(&mut self, cmd: AudioCommand);
}

/// Master effects that parameter locks are applied to right before a hit.
pub trait EffectsSink: Send {
    fn set_filter_cutoff(&mut self, hz: f32);
    fn set_delay_mix(&mut self, percent: f32);
    fn set_reverb_mix(&mut self, percent: f32);
    fn set_grain(&mut self, amount: f32);
}

// Forwards everything into the audio engine's command queue. Never blocks:
// a full queue drops the hit rather than stalling the clock.
#[derive(Clone)]
pub struct CommandSink {
    tx: Sender<AudioCommand>,
}

impl CommandSink {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            log::trace!("audio queue full or closed, dropping command");
        }
    }
}

impl InstrumentSink for CommandSink {
    fn trigger(&mut self, cmd: AudioCommand) {
        self.send(cmd);
    }
}

impl EffectsSink for CommandSink {
    fn set_filter_cutoff(&mut self, hz: f32) {
        self.send(AudioCommand::Effect(EffectParam::FilterCutoff(hz)));
    }
    fn set_delay_mix(&mut self, percent: f32) {
        self.send(AudioCommand::Effect(EffectParam::DelayMix(percent)));
    }
    fn set_reverb_mix(&mut self, percent: f32) {
        self.send(AudioCommand::Effect(EffectParam::ReverbMix(percent)));
    }
    fn set_grain(&mut self, amount: f32) {
        self.send(AudioCommand::Effect(EffectParam::Grain(amount)));
    }
}

// For headless use when nothing is listening
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl InstrumentSink for NullSink {
    fn trigger(&mut self, _cmd: AudioCommand) {}
}

impl EffectsSink for NullSink {
    fn set_filter_cutoff(&mut self, _hz: f32) {}
    fn set_delay_mix(&mut self, _percent: f32) {}
    fn set_reverb_mix(&mut self, _percent: f32) {}
    fn set_grain(&mut self, _amount: f32) {}
}

/// Dispatch table: one sink per source plus the effects bus.
pub struct Instruments {
    pub sampler: Box<dyn InstrumentSink>,
    pub synth: Box<dyn InstrumentSink>,
    pub radio: Box<dyn InstrumentSink>,
    pub mic: Box<dyn InstrumentSink>,
    pub effects: Box<dyn EffectsSink>,
}

impl Instruments {
    pub fn silent() -> Self {
        Self {
            sampler: Box::new(NullSink),
            synth: Box::new(NullSink),
            radio: Box::new(NullSink),
            mic: Box::new(NullSink),
            effects: Box::new(NullSink),
        }
    }

    // everything into one engine queue
    pub fn from_channel(tx: Sender<AudioCommand>) -> Self {
        let sink = CommandSink::new(tx);
        Self {
            sampler: Box::new(sink.clone()),
            synth: Box::new(sink.clone()),
            radio: Box::new(sink.clone()),
            mic: Box::new(sink.clone()),
            effects: Box::new(sink),
        }
    }

    pub fn sink_for(&mut self, source: InstrumentSource) -> &mut dyn InstrumentSink {
        match source {
            InstrumentSource::Sampler => self.sampler.as_mut(),
            InstrumentSource::Synth => self.synth.as_mut(),
            InstrumentSource::Radio => self.radio.as_mut(),
            InstrumentSource::Mic => self.mic.as_mut(),
        }
    }
}

impl Default for Instruments {
    fn default() -> Self {
        Self::silent()
    }
}
