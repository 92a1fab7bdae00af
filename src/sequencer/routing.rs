// Track routing: which instrument a track drives, mute/solo, and how a hit
// becomes an instrument command.

use log::debug;

use super::Sequencer;
use crate::audio_api::{AudioCommand, NoteTrigger, PulseChannel, SampleTrigger};
use crate::pipeline::project::{InstrumentSource, ParamLocks};
use crate::shared::NUM_TRACKS;

// A2 up to G4, one per track
pub const SYNTH_BASE_NOTES: [f32; NUM_TRACKS] =
    [110.0, 147.0, 165.0, 196.0, 220.0, 262.0, 330.0, 392.0];
pub const SYNTH_NOTE_SECONDS: f32 = 0.1;
pub const PULSE_SECONDS: f32 = 0.1;

pub fn synth_frequency(track: usize, pitch: Option<i16>) -> f32 {
    let base = SYNTH_BASE_NOTES[track % NUM_TRACKS];
    match pitch {
        Some(semis) => base * 2.0_f32.powf(f32::from(semis) / 12.0),
        None => base,
    }
}

// Resolve one hit for the given source.
pub fn command_for(
    source: InstrumentSource,
    track: usize,
    locks: &ParamLocks,
    velocity: u8,
) -> AudioCommand {
    let velocity = f32::from(velocity.min(100)) / 100.0;
    match source {
        InstrumentSource::Sampler => AudioCommand::Sample(SampleTrigger {
            pad: track,
            pitch: locks.pitch,
            slice: locks.slice,
            velocity,
            pan: locks.pan,
        }),
        InstrumentSource::Synth => AudioCommand::Note(NoteTrigger {
            frequency: synth_frequency(track, locks.pitch),
            duration: SYNTH_NOTE_SECONDS,
            velocity,
            pan: locks.pan,
        }),
        // radio and mic are continuous, so a hit just opens the channel briefly
        InstrumentSource::Radio => AudioCommand::Pulse {
            channel: PulseChannel::Radio,
            seconds: PULSE_SECONDS,
        },
        InstrumentSource::Mic => AudioCommand::Pulse {
            channel: PulseChannel::Mic,
            seconds: PULSE_SECONDS,
        },
    }
}

impl Sequencer {
    pub fn set_track_source(&mut self, track: usize, source: InstrumentSource) {
        if let Some(r) = self.routing.get_mut(track) {
            r.source = source;
            debug!("track {} source: {source}", track + 1);
        }
    }

    pub fn toggle_mute(&mut self, track: usize) -> bool {
        match self.routing.get_mut(track) {
            Some(r) => {
                r.muted = !r.muted;
                debug!("track {} mute: {}", track + 1, r.muted);
                r.muted
            }
            None => false,
        }
    }

    pub fn set_mute(&mut self, track: usize, muted: bool) {
        if let Some(r) = self.routing.get_mut(track) {
            r.muted = muted;
        }
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.routing.get(track).is_some_and(|r| r.muted)
    }

    pub fn toggle_solo(&mut self, track: usize) -> bool {
        match self.routing.get_mut(track) {
            Some(r) => {
                r.soloed = !r.soloed;
                debug!("track {} solo: {}", track + 1, r.soloed);
                r.soloed
            }
            None => false,
        }
    }

    pub fn set_solo(&mut self, track: usize, soloed: bool) {
        if let Some(r) = self.routing.get_mut(track) {
            r.soloed = soloed;
        }
    }

    pub fn is_soloed(&self, track: usize) -> bool {
        self.routing.get(track).is_some_and(|r| r.soloed)
    }

    /// Whether `track` would be heard on a tick right now. Mute always wins;
    /// with any solo engaged, only soloed tracks play.
    pub fn is_audible(&self, track: usize) -> bool {
        let Some(r) = self.routing.get(track) else {
            return false;
        };
        let has_solo = self.routing.iter().any(|r| r.soloed);
        !r.muted && (!has_solo || r.soloed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_lock_transposes_synth() {
        assert_eq!(synth_frequency(4, None), 220.0);
        assert!((synth_frequency(4, Some(12)) - 440.0).abs() < 1e-3);
        assert!((synth_frequency(0, Some(-12)) - 55.0).abs() < 1e-3);
    }

    #[test]
    fn sampler_hit_carries_pad_and_locks() {
        let locks = ParamLocks {
            pitch: Some(5),
            slice: Some(3),
            ..Default::default()
        };
        match command_for(InstrumentSource::Sampler, 2, &locks, 50) {
            AudioCommand::Sample(t) => {
                assert_eq!(t.pad, 2);
                assert_eq!(t.pitch, Some(5));
                assert_eq!(t.slice, Some(3));
                assert!((t.velocity - 0.5).abs() < 1e-6);
            }
            other => panic!("expected sample trigger, got {other:?}"),
        }
    }

    #[test]
    fn radio_and_mic_pulse() {
        let locks = ParamLocks::default();
        assert!(matches!(
            command_for(InstrumentSource::Radio, 0, &locks, 100),
            AudioCommand::Pulse { channel: PulseChannel::Radio, .. }
        ));
        assert!(matches!(
            command_for(InstrumentSource::Mic, 7, &locks, 100),
            AudioCommand::Pulse { channel: PulseChannel::Mic, .. }
        ));
    }

    #[test]
    fn mute_beats_solo() {
        let mut seq = Sequencer::default();
        seq.set_solo(1, true);
        seq.set_mute(1, true);
        assert!(!seq.is_audible(1));
        assert!(!seq.is_audible(0));
        seq.set_mute(1, false);
        assert!(seq.is_audible(1));
        assert!(!seq.is_audible(9));
    }
}
