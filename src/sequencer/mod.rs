// The sequencer aggregate. Owns every slot, the per-track routing, transport
// position, dub state, clipboard and history.
//
// Out-of-range input is never an error here: it's logged and ignored, because
// an exception in the middle of a live set is worse than a dropped edit.

mod clipboard;
mod engine;
mod routing;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::audio_api::Instruments;
use crate::pipeline::generator::{self, Recipe, Rotation, Surprise, Vibe, RECIPE_STEPS};
use crate::pipeline::history::{History, Snapshot};
use crate::pipeline::project::{
    DubMode, InstrumentSource, ParamLocks, ParamName, PatternSlot, ProjectState, Step, Track,
    TrackRouting, TrigCondition, TrigKind,
};
use crate::pipeline::scenes::SceneSnapshot;
use crate::shared::{
    DEFAULT_TEMPO, MAX_STEPS, MAX_SWING, MAX_TEMPO, MIN_TEMPO, NUM_PATTERNS, NUM_TRACKS,
    SequencerEvent, slot_label,
};

use clipboard::Clipboard;
pub use engine::{DubHit, DubInput, step_interval, swing_offset};
pub use routing::{SYNTH_BASE_NOTES, command_for, synth_frequency};

const EVENT_QUEUE: usize = 256;
const DUB_QUEUE: usize = 64;

pub struct Sequencer {
    slots: [PatternSlot; NUM_PATTERNS],
    current_slot: usize,
    routing: [TrackRouting; NUM_TRACKS],
    selected_track: usize,

    tempo: f32,
    swing: f32,
    playing: bool,
    current_step: usize,
    loop_count: u64,
    fill: bool,

    dub_mode: DubMode,
    dub_tx: Sender<DubHit>,
    dub_rx: Receiver<DubHit>,

    clipboard: Option<Clipboard>,
    history: History,

    instruments: Instruments,
    listeners: Vec<Sender<SequencerEvent>>,
    rng: StdRng,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(Instruments::silent())
    }
}

impl Sequencer {
    pub fn new(instruments: Instruments) -> Self {
        let (dub_tx, dub_rx) = crossbeam_channel::bounded(DUB_QUEUE);
        Self {
            slots: std::array::from_fn(|_| PatternSlot::default()),
            current_slot: 0,
            routing: [TrackRouting::default(); NUM_TRACKS],
            selected_track: 0,
            tempo: DEFAULT_TEMPO,
            swing: 0.0,
            playing: false,
            current_step: 0,
            loop_count: 0,
            fill: false,
            dub_mode: DubMode::Off,
            dub_tx,
            dub_rx,
            clipboard: None,
            history: History::default(),
            instruments,
            listeners: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    // deterministic probability gates and generation, mostly for tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_project(instruments: Instruments, state: ProjectState) -> Self {
        let mut seq = Self::new(instruments);
        seq.load_project(state);
        seq
    }

    // ── observers ───────────────────────────────────────────────────

    pub fn subscribe(&mut self) -> Receiver<SequencerEvent> {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_QUEUE);
        self.listeners.push(tx);
        rx
    }

    // slow listeners miss events instead of stalling the tick; dropped ones are forgotten
    pub(crate) fn notify(&mut self, event: SequencerEvent) {
        self.listeners.retain(|tx| match tx.try_send(event) {
            Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => true,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        });
    }

    // ── pattern store ───────────────────────────────────────────────

    pub fn select_pattern(&mut self, slot: usize) {
        if slot >= NUM_PATTERNS {
            warn!("pattern slot {slot} out of range");
            return;
        }
        self.current_slot = slot;
        self.current_step = 0;
        info!("selected pattern {}", slot_label(slot));
        self.notify(SequencerEvent::PatternChanged);
    }

    pub fn current_pattern_slot(&self) -> usize {
        self.current_slot
    }

    pub fn pattern_length(&self) -> usize {
        self.slots[self.current_slot].length
    }

    // Only the current slot. Checkpointing first is the caller's call.
    pub fn set_pattern_length(&mut self, length: usize) {
        let length = length.clamp(1, MAX_STEPS);
        self.slots[self.current_slot].length = length;
        if self.current_step >= length {
            self.current_step = 0;
        }
        debug!("pattern length set to {length}");
        self.notify(SequencerEvent::PatternChanged);
    }

    pub fn pattern_has_data(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(PatternSlot::has_data)
    }

    pub fn pattern(&self) -> &[Track; NUM_TRACKS] {
        &self.slots[self.current_slot].tracks
    }

    pub fn slot(&self, slot: usize) -> Option<&PatternSlot> {
        self.slots.get(slot)
    }

    pub fn track(&self, track: usize) -> Option<&Track> {
        self.pattern().get(track)
    }

    pub fn step(&self, track: usize, step: usize) -> Option<&Step> {
        if step >= self.pattern_length() {
            return None;
        }
        self.track(track)?.steps.get(step)
    }

    fn step_mut(&mut self, track: usize, step: usize) -> Option<&mut Step> {
        if track >= NUM_TRACKS || step >= self.pattern_length() {
            debug!("step ({track}, {step}) out of range, ignoring");
            return None;
        }
        let slot = self.current_slot;
        Some(&mut self.slots[slot].tracks[track].steps[step])
    }

    fn track_mut(&mut self, track: usize) -> Option<&mut Track> {
        if track >= NUM_TRACKS {
            debug!("track {track} out of range, ignoring");
            return None;
        }
        let slot = self.current_slot;
        Some(&mut self.slots[slot].tracks[track])
    }

    pub fn clear_track(&mut self, track: usize) {
        let Some(t) = self.track_mut(track) else {
            return;
        };
        t.clear();
        self.routing[track].play_count = 0;
    }

    pub fn clear_all_tracks(&mut self) {
        for track in 0..NUM_TRACKS {
            self.clear_track(track);
        }
        self.reset_play_counts();
    }

    pub fn reset_play_counts(&mut self) {
        self.loop_count = 0;
        for r in self.routing.iter_mut() {
            r.play_count = 0;
        }
    }

    // ── step editing ────────────────────────────────────────────────

    pub fn set_step(&mut self, track: usize, step: usize, active: bool) {
        if let Some(s) = self.step_mut(track, step) {
            s.active = active;
        }
    }

    // Returns the new active state; false for out-of-range cells.
    pub fn toggle_step(&mut self, track: usize, step: usize) -> bool {
        match self.step_mut(track, step) {
            Some(s) => {
                s.active = !s.active;
                s.active
            }
            None => false,
        }
    }

    pub fn set_step_probability(&mut self, track: usize, step: usize, probability: u8) {
        if let Some(s) = self.step_mut(track, step) {
            s.probability = probability.min(100);
        }
    }

    pub fn set_step_velocity(&mut self, track: usize, step: usize, velocity: u8) {
        if let Some(s) = self.step_mut(track, step) {
            s.velocity = velocity.min(100);
        }
    }

    pub fn set_track_probability(&mut self, track: usize, probability: u8) {
        let length = self.pattern_length();
        if let Some(t) = self.track_mut(track) {
            for s in t.steps.iter_mut().take(length) {
                s.probability = probability.min(100);
            }
        }
    }

    // density is a 0.0-1.0 chance per step
    pub fn randomize_track(&mut self, track: usize, density: f64) {
        if track >= NUM_TRACKS {
            return;
        }
        let density = density.clamp(0.0, 1.0);
        let length = self.pattern_length();
        let slot = self.current_slot;
        for step in self.slots[slot].tracks[track].steps.iter_mut().take(length) {
            step.active = rand::Rng::gen_bool(&mut self.rng, density);
        }
    }

    // ── parameter locks ─────────────────────────────────────────────

    pub fn set_param_lock(&mut self, track: usize, step: usize, param: ParamName, value: Option<i16>) {
        if let Some(s) = self.step_mut(track, step) {
            s.param_locks.set(param, value);
            debug!("p-lock: track {} step {} {:?} = {:?}", track + 1, step + 1, param, value);
        }
    }

    pub fn clear_param_lock(&mut self, track: usize, step: usize, param: ParamName) {
        self.set_param_lock(track, step, param, None);
    }

    pub fn clear_all_param_locks(&mut self, track: usize, step: usize) {
        if let Some(s) = self.step_mut(track, step) {
            s.param_locks = ParamLocks::default();
        }
    }

    pub fn param_lock(&self, track: usize, step: usize, param: ParamName) -> Option<i16> {
        self.step(track, step)?.param_locks.get(param)
    }

    pub fn has_param_locks(&self, track: usize, step: usize) -> bool {
        self.step(track, step)
            .is_some_and(|s| !s.param_locks.is_empty())
    }

    // ── trig conditions ─────────────────────────────────────────────

    pub fn set_trig_condition(
        &mut self,
        track: usize,
        step: usize,
        kind: TrigKind,
        value: u8,
        neighbor_track: Option<usize>,
    ) {
        if let Some(s) = self.step_mut(track, step) {
            s.trig_condition = TrigCondition {
                kind,
                value,
                neighbor_track,
            };
            debug!("trig condition: track {} step {} {:?} ({value})", track + 1, step + 1, kind);
        }
    }

    pub fn trig_condition(&self, track: usize, step: usize) -> TrigCondition {
        self.step(track, step)
            .map(|s| s.trig_condition)
            .unwrap_or_default()
    }

    pub fn set_fill_mode(&mut self, active: bool) {
        self.fill = active;
    }

    pub fn fill_mode(&self) -> bool {
        self.fill
    }

    // ── tempo / swing ───────────────────────────────────────────────

    // Clamped to 30-300. A running clock picks the new rate up on its next tick.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.tempo = if bpm.is_nan() {
            DEFAULT_TEMPO
        } else {
            bpm.clamp(MIN_TEMPO, MAX_TEMPO)
        };
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    pub fn set_swing(&mut self, amount: f32) {
        self.swing = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, MAX_SWING) };
        debug!("swing set to {}%", self.swing);
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    // ── track selection ─────────────────────────────────────────────

    pub fn select_track(&mut self, track: usize) {
        if track < NUM_TRACKS {
            self.selected_track = track;
        }
    }

    pub fn selected_track(&self) -> usize {
        self.selected_track
    }

    // ── euclidean + generators ──────────────────────────────────────

    /// Write a Euclidean rhythm into the first `steps` cells of the playing
    /// window. Cells past `steps` (up to the pattern length) go inactive;
    /// locks and conditions are untouched.
    pub fn apply_euclidean(&mut self, track: usize, hits: usize, steps: usize, rotation: usize) {
        let rhythm = generator::generate_euclidean(hits, steps, rotation);
        let length = self.pattern_length();
        let Some(t) = self.track_mut(track) else {
            return;
        };
        for (s, cell) in t.steps.iter_mut().take(length).enumerate() {
            cell.active = rhythm.get(s).copied().unwrap_or(false);
        }
        debug!("applied euclidean {hits}/{steps} (rot {rotation}) to track {track}");
    }

    /// Fill the current slot from a vibe template, then thin it by `density`
    /// and, above 50 `complexity`, scatter step probabilities.
    pub fn generate_vibe_pattern(&mut self, vibe: Vibe, density: f32, complexity: f32) {
        for (track, recipe) in vibe.recipe().into_iter().enumerate() {
            match recipe {
                Recipe::Clear => self.clear_track(track),
                Recipe::Euclid(hits, rotation) => {
                    let rotation = match rotation {
                        Rotation::Fixed(r) => r,
                        Rotation::Random => rand::Rng::gen_range(&mut self.rng, 0..RECIPE_STEPS),
                    };
                    self.apply_euclidean(track, hits, RECIPE_STEPS, rotation);
                }
            }
        }

        let slot = &mut self.slots[self.current_slot];
        generator::thin_density(slot, density, &mut self.rng);
        generator::vary_probability(slot, complexity, &mut self.rng);
        info!("generated {vibe} pattern (density {density}%, complexity {complexity}%)");
    }

    pub fn generate_surprise(&mut self) -> Surprise {
        let surprise = Surprise::roll(&mut self.rng);
        self.generate_vibe_pattern(surprise.vibe, surprise.density, surprise.complexity);
        self.set_tempo(surprise.tempo);
        surprise
    }

    // ── history ─────────────────────────────────────────────────────

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tracks: self.pattern().clone(),
            sources: self.track_sources(),
            length: self.pattern_length(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let slot = &mut self.slots[self.current_slot];
        slot.tracks = snapshot.tracks;
        slot.length = snapshot.length;
        for (r, source) in self.routing.iter_mut().zip(snapshot.sources) {
            r.source = source;
        }
        if self.current_step >= snapshot.length {
            self.current_step = 0;
        }
    }

    pub fn save_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.record(snapshot);
    }

    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(prev) = self.history.undo(current) else {
            debug!("nothing to undo");
            return false;
        };
        self.restore(prev);
        self.notify(SequencerEvent::PatternChanged);
        true
    }

    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            debug!("nothing to redo");
            return false;
        };
        self.restore(next);
        self.notify(SequencerEvent::PatternChanged);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── scenes / project ────────────────────────────────────────────

    pub fn capture_scene(&self) -> SceneSnapshot {
        SceneSnapshot {
            tracks: self.pattern().clone(),
            sources: self.track_sources(),
            length: self.pattern_length(),
            tempo: self.tempo,
        }
    }

    pub fn recall_scene(&mut self, scene: &SceneSnapshot) {
        self.restore(Snapshot {
            tracks: scene.tracks.clone(),
            sources: scene.sources,
            length: scene.length.clamp(1, MAX_STEPS),
        });
        self.set_tempo(scene.tempo);
        self.notify(SequencerEvent::PatternChanged);
    }

    pub fn project_state(&self) -> ProjectState {
        ProjectState {
            slots: self.slots.clone(),
            current_slot: self.current_slot,
            routing: self.routing,
            tempo: self.tempo,
            swing: self.swing,
        }
    }

    pub fn load_project(&mut self, state: ProjectState) {
        self.slots = state.slots;
        for slot in self.slots.iter_mut() {
            slot.length = slot.length.clamp(1, MAX_STEPS);
        }
        self.routing = state.routing;
        for r in self.routing.iter_mut() {
            r.play_count = 0;
        }
        self.current_slot = state.current_slot.min(NUM_PATTERNS - 1);
        self.current_step = 0;
        self.loop_count = 0;
        self.set_tempo(state.tempo);
        self.set_swing(state.swing);
        self.notify(SequencerEvent::PatternChanged);
    }

    // ── read-only transport state ───────────────────────────────────

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    pub fn track_play_count(&self, track: usize) -> u64 {
        self.routing.get(track).map_or(0, |r| r.play_count)
    }

    pub fn dub_mode(&self) -> DubMode {
        self.dub_mode
    }

    pub fn set_dub_mode(&mut self, mode: DubMode) {
        self.dub_mode = mode;
        if mode != DubMode::Off {
            // stale presses from an earlier take don't belong in this one
            self.drain_dub_queue();
        }
        info!("dub mode: {mode:?}");
    }

    pub fn track_source(&self, track: usize) -> InstrumentSource {
        self.routing
            .get(track)
            .map(|r| r.source)
            .unwrap_or_default()
    }

    pub fn track_sources(&self) -> [InstrumentSource; NUM_TRACKS] {
        self.routing.map(|r| r.source)
    }
}
