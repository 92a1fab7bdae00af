use super::effect::{Effect, MasterBus};
use super::frame::{StereoFrame, pan_gains};
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;
use crate::audio_api::{AudioCommand, EffectParam, NoteTrigger, PulseChannel, SampleTrigger};
use crate::shared::NUM_TRACKS;

const MAX_VOICES: usize = 16; // hard cap so we wont malloc in audio callback
const MAX_NOTES: usize = 8;
const NOTE_GAIN: f32 = 0.3;
const BED_GAIN: f32 = 0.8;
const MAX_GRAIN_MS: f32 = 120.0;

#[derive(Clone, Copy, Debug, Default)]
struct SineVoice {
    phase: f32,
    phase_inc: f32,
    amp: f32,
    decay: f32,
    gain_l: f32,
    gain_r: f32,
    alive: bool,
}

// A looping background stream that only comes through while a pulse holds it open.
#[derive(Default)]
struct Bed {
    buffer: Option<SampleBuffer>,
    pos: usize,
    gate: usize, // frames left open
}

impl Bed {
    fn mix_into(&mut self, out: &mut [StereoFrame]) {
        let Some(buf) = self.buffer.as_ref().filter(|b| !b.is_empty()) else {
            self.gate = self.gate.saturating_sub(out.len());
            return;
        };
        for frame in out.iter_mut() {
            let s = buf.data[self.pos];
            self.pos = (self.pos + 1) % buf.len();
            if self.gate > 0 {
                frame.left += s.left * BED_GAIN;
                frame.right += s.right * BED_GAIN;
                self.gate -= 1;
            }
        }
    }
}

pub struct Engine {
    sample_rate: u32,
    pads: Vec<Option<SampleBuffer>>,
    voices: Vec<Voice>,
    notes: [SineVoice; MAX_NOTES],
    radio: Bed,
    mic: Bed,
    bus: MasterBus,
    grain: f32, // percent, applied to hits that start after it's set
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            pads: vec![None; NUM_TRACKS],
            voices: Vec::with_capacity(MAX_VOICES),
            notes: [SineVoice::default(); MAX_NOTES],
            radio: Bed::default(),
            mic: Bed::default(),
            bus: MasterBus::new(sample_rate),
            grain: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { pad, buffer } => {
                if pad >= self.pads.len() {
                    self.pads.resize(pad + 1, None);
                }
                self.pads[pad] = Some(buffer);
            }
            AudioCommand::SetBed { channel, buffer } => {
                let bed = self.bed_mut(channel);
                bed.buffer = Some(buffer);
                bed.pos = 0;
            }
            AudioCommand::Sample(t) => self.trigger_sample(t),
            AudioCommand::Note(n) => self.trigger_note(n),
            AudioCommand::Pulse { channel, seconds } => {
                let frames = (seconds.max(0.0) * self.sample_rate as f32) as usize;
                let bed = self.bed_mut(channel);
                bed.gate = bed.gate.max(frames);
            }
            AudioCommand::Effect(param) => self.apply_effect(param),
        }
    }

    fn bed_mut(&mut self, channel: PulseChannel) -> &mut Bed {
        match channel {
            PulseChannel::Radio => &mut self.radio,
            PulseChannel::Mic => &mut self.mic,
        }
    }

    fn apply_effect(&mut self, param: EffectParam) {
        match param {
            EffectParam::FilterCutoff(hz) => self.bus.filter.set_cutoff(hz),
            EffectParam::DelayMix(p) => self.bus.delay.set_mix(p),
            EffectParam::ReverbMix(p) => self.bus.reverb.set_mix(p),
            EffectParam::Grain(p) => self.grain = p.clamp(0.0, 100.0),
        }
    }

    fn trigger_sample(&mut self, t: SampleTrigger) {
        let Some(buffer) = self.pads.get(t.pad).and_then(|p| p.as_ref()) else {
            log::trace!("pad {} has no sample", t.pad);
            return;
        };
        let range = match t.slice {
            Some(s) => buffer.slice_range(s.max(0) as usize),
            None => 0..buffer.len(),
        };
        // grain 0 plays straight through; higher values chop shorter
        let stutter = (self.grain > 0.0).then(|| {
            let ms = MAX_GRAIN_MS * (1.0 - self.grain / 100.0) + 10.0;
            (ms / 1000.0 * self.sample_rate as f32) as u32
        });
        let voice = Voice::new(
            t.pad,
            range.start,
            range.len(),
            t.pitch,
            t.velocity,
            t.pan,
            stutter,
        );

        self.voices.retain(|v| v.active);
        if self.voices.len() >= MAX_VOICES {
            // steal the oldest
            self.voices.remove(0);
        }
        self.voices.push(voice);
    }

    fn trigger_note(&mut self, n: NoteTrigger) {
        // what slot do we write to?
        let slot = self.notes.iter().position(|v| !v.alive).unwrap_or(0);
        let sr = self.sample_rate as f32;
        // reach ~-60dB by the end of the requested duration
        let frames = (n.duration.max(0.01) * sr).max(1.0);
        let (l, r) = pan_gains(n.pan);
        self.notes[slot] = SineVoice {
            phase: 0.0,
            phase_inc: std::f32::consts::TAU * n.frequency / sr,
            amp: NOTE_GAIN * n.velocity,
            decay: 0.001_f32.powf(1.0 / frames),
            gain_l: l,
            gain_r: r,
            alive: true,
        };
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count() + self.notes.iter().filter(|n| n.alive).count()
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());

        for voice in self.voices.iter_mut() {
            if let Some(Some(buffer)) = self.pads.get(voice.pad) {
                voice.render_into(buffer, out);
            } else {
                voice.active = false;
            }
        }

        for n in self.notes.iter_mut().filter(|n| n.alive) {
            for frame in out.iter_mut() {
                let s = n.amp * n.phase.sin();
                frame.left += s * n.gain_l;
                frame.right += s * n.gain_r;
                n.phase += n.phase_inc;
                if n.phase > std::f32::consts::TAU {
                    n.phase -= std::f32::consts::TAU;
                }
                n.amp *= n.decay;
                if n.amp < 0.0005 {
                    n.alive = false;
                    break;
                }
            }
        }

        self.radio.mix_into(out);
        self.mic.mix_into(out);
        self.bus.process(out);

        for frame in out.iter_mut() {
            frame.left = frame.left.clamp(-1.0, 1.0);
            frame.right = frame.right.clamp(-1.0, 1.0);
        }
    }
}
