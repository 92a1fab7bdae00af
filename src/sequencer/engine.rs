// Step engine: transport state, the per-tick trigger pass and dub recording.

use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, trace};
use rand::Rng;

use super::Sequencer;
use crate::pipeline::project::{DubMode, InstrumentSource, ParamLocks, Step, TrigKind};
use crate::shared::{MAX_SWING, NUM_TRACKS, SequencerEvent};

/// One 16th note at `tempo` BPM.
pub fn step_interval(tempo: f32) -> Duration {
    Duration::from_secs_f64(60.0 / tempo.max(1.0) as f64 / 4.0)
}

/// How late `step` plays relative to the straight grid.
///
/// Even steps are never moved. Odd steps slide by up to a third of the
/// interval, so swing 100 lands the off-beat 16th at 2/3 of the 8th-note
/// pair: a triplet shuffle.
pub fn swing_offset(step: usize, interval: Duration, swing: f32) -> Duration {
    if step % 2 == 0 || swing <= 0.0 {
        return Duration::ZERO;
    }
    let amount = (swing.min(MAX_SWING) / MAX_SWING) as f64;
    interval.mul_f64(amount / 3.0)
}

/// A pad press waiting to be written into the pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DubHit {
    pub track: usize,
    pub velocity: u8,
    pub locks: ParamLocks,
}

/// Cloneable handle for recording pad presses from another thread without
/// taking the sequencer lock. Presses are applied on the next tick.
#[derive(Clone)]
pub struct DubInput {
    tx: Sender<DubHit>,
}

impl DubInput {
    pub fn record(&self, track: usize, velocity: u8, locks: ParamLocks) -> bool {
        self.tx
            .try_send(DubHit {
                track,
                velocity,
                locks,
            })
            .is_ok()
    }
}

impl Sequencer {
    // stopped -> playing; no-op when already running
    pub fn play(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.playing = true;
        self.current_step = 0;
        self.drain_dub_queue();
        info!("sequencer started at {} BPM", self.tempo);
        true
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.current_step = 0;
        self.drain_dub_queue();
        self.notify(SequencerEvent::Stopped);
        info!("sequencer stopped");
    }

    pub fn step_interval(&self) -> Duration {
        step_interval(self.tempo)
    }

    pub fn dub_input(&self) -> DubInput {
        DubInput {
            tx: self.dub_tx.clone(),
        }
    }

    /// One 16th note. Fires every eligible track, runs the dub hook, tells
    /// observers, then advances the cursor. Returns the step that played.
    pub fn tick(&mut self) -> usize {
        let step_index = self.current_step;
        for track in 0..NUM_TRACKS {
            if !self.is_audible(track) {
                continue;
            }
            let step = self.slots[self.current_slot].tracks[track].steps[step_index];
            if step.active && self.should_trigger(&step, track) {
                self.fire(track, &step);
            }
        }

        if self.dub_mode != DubMode::Off {
            self.process_dub_queue();
        }

        self.notify(SequencerEvent::Step(step_index));

        self.current_step = (step_index + 1) % self.pattern_length();
        if self.current_step == 0 {
            // every track counts the loop, muted or not
            self.loop_count += 1;
            for r in self.routing.iter_mut() {
                r.play_count += 1;
            }
            trace!("loop {} complete", self.loop_count);
        }
        step_index
    }

    fn should_trigger(&mut self, step: &Step, track: usize) -> bool {
        let cond = step.trig_condition;
        match cond.kind {
            TrigKind::Always | TrigKind::Unknown => self.chance(step.probability),
            TrigKind::Probability => self.chance(cond.value),
            TrigKind::Fill => self.fill,
            TrigKind::NotFill => !self.fill,
            TrigKind::Nth => {
                let n = u64::from(cond.value.max(1));
                self.routing[track].play_count % n == 0
            }
            TrigKind::Neighbor => match cond.neighbor_track {
                // only the neighbour's active flag, not its own condition
                Some(n) if n < NUM_TRACKS => {
                    self.slots[self.current_slot].tracks[n].steps[self.current_step].active
                }
                _ => true,
            },
        }
    }

    fn chance(&mut self, percent: u8) -> bool {
        self.rng.gen_range(0.0..100.0) < f64::from(percent)
    }

    fn fire(&mut self, track: usize, step: &Step) {
        let source = self.routing[track].source;
        let locks = step.param_locks;
        self.apply_effect_locks(&locks);

        let cmd = super::routing::command_for(source, track, &locks, step.velocity);
        trace!("track {track} -> {source}");
        self.instruments.sink_for(source).trigger(cmd);

        if source == InstrumentSource::Sampler {
            self.notify(SequencerEvent::PadTriggered(track));
        }
    }

    // filter goes out in Hz (0-100 * 80), the sends pass straight through
    fn apply_effect_locks(&mut self, locks: &ParamLocks) {
        let fx = self.instruments.effects.as_mut();
        if let Some(v) = locks.filter {
            fx.set_filter_cutoff(f32::from(v) * 80.0);
        }
        if let Some(v) = locks.delay {
            fx.set_delay_mix(f32::from(v));
        }
        if let Some(v) = locks.reverb {
            fx.set_reverb_mix(f32::from(v));
        }
        if let Some(v) = locks.grain {
            fx.set_grain(f32::from(v));
        }
    }

    /// Write a live pad press into the step under the playhead.
    /// Dub only fills empty steps; overdub always overwrites. Does nothing
    /// while stopped or with dub off. Returns whether the step was written.
    pub fn record_dub_trigger(&mut self, track: usize, locks: &ParamLocks, velocity: u8) -> bool {
        if self.dub_mode == DubMode::Off || !self.playing || track >= NUM_TRACKS {
            return false;
        }
        let step_index = self.current_step;
        let step = &mut self.slots[self.current_slot].tracks[track].steps[step_index];
        if self.dub_mode == DubMode::Dub && step.active {
            return false;
        }
        step.active = true;
        step.velocity = velocity.min(100);
        step.param_locks.merge(locks);
        debug!("dub recorded: track {} step {}", track + 1, step_index + 1);
        true
    }

    fn process_dub_queue(&mut self) {
        while let Ok(hit) = self.dub_rx.try_recv() {
            self.record_dub_trigger(hit.track, &hit.locks, hit.velocity);
        }
    }

    // presses made while stopped never reach the pattern
    pub(super) fn drain_dub_queue(&mut self) {
        while self.dub_rx.try_recv().is_ok() {}
    }
}
