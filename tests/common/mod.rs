//! Shared helpers: a set of instruments that writes down everything it is asked to do.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ondas::audio_api::{AudioCommand, EffectsSink, InstrumentSink, Instruments};
use ondas::pipeline::project::InstrumentSource;

#[derive(Clone, Debug)]
pub enum Rec {
    Hit(InstrumentSource, AudioCommand),
    Filter(f32),
    Delay(f32),
    Reverb(f32),
    Grain(f32),
}

pub type Log = Arc<Mutex<Vec<Rec>>>;

struct RecordingSink {
    source: InstrumentSource,
    log: Log,
}

impl InstrumentSink for RecordingSink {
    fn trigger(&mut self, cmd: AudioCommand) {
        self.log.lock().unwrap().push(Rec::Hit(self.source, cmd));
    }
}

struct RecordingFx {
    log: Log,
}

impl EffectsSink for RecordingFx {
    fn set_filter_cutoff(&mut self, hz: f32) {
        self.log.lock().unwrap().push(Rec::Filter(hz));
    }
    fn set_delay_mix(&mut self, percent: f32) {
        self.log.lock().unwrap().push(Rec::Delay(percent));
    }
    fn set_reverb_mix(&mut self, percent: f32) {
        self.log.lock().unwrap().push(Rec::Reverb(percent));
    }
    fn set_grain(&mut self, amount: f32) {
        self.log.lock().unwrap().push(Rec::Grain(amount));
    }
}

pub fn recording() -> (Instruments, Log) {
    let log: Log = Arc::default();
    let sink = |source: InstrumentSource| -> Box<dyn InstrumentSink> {
        Box::new(RecordingSink {
            source,
            log: Arc::clone(&log),
        })
    };
    let instruments = Instruments {
        sampler: sink(InstrumentSource::Sampler),
        synth: sink(InstrumentSource::Synth),
        radio: sink(InstrumentSource::Radio),
        mic: sink(InstrumentSource::Mic),
        effects: Box::new(RecordingFx {
            log: Arc::clone(&log),
        }),
    };
    (instruments, log)
}

/// Pads (= track indices) of sampler hits since the log was last drained.
pub fn take_pads(log: &Log) -> Vec<usize> {
    log.lock()
        .unwrap()
        .drain(..)
        .filter_map(|r| match r {
            Rec::Hit(_, AudioCommand::Sample(t)) => Some(t.pad),
            _ => None,
        })
        .collect()
}

pub fn take(log: &Log) -> Vec<Rec> {
    log.lock().unwrap().drain(..).collect()
}
