// Grid dimensions and bounds shared by every layer.
//
// Terminology, since it trips people up:
//   "slot":  one of the 8 stored patterns (A-H), a full 8-track grid.
//   "track": one row of a slot, 64 step cells of which `length` are played.
//   "step":  a single cell; whether it fires is decided per pass by its trig condition.

pub const NUM_TRACKS: usize = 8;
pub const NUM_PATTERNS: usize = 8;
pub const MAX_STEPS: usize = 64;
pub const DEFAULT_LENGTH: usize = 16;
pub const NUM_SCENES: usize = 4;

pub const MIN_TEMPO: f32 = 30.0;
pub const MAX_TEMPO: f32 = 300.0;
pub const DEFAULT_TEMPO: f32 = 120.0;
pub const MAX_SWING: f32 = 100.0;

pub const HISTORY_LIMIT: usize = 50;

// A-H for slots, A-D for scenes
pub fn slot_label(index: usize) -> char {
    (b'A' + (index as u8 % 26)) as char
}

// What observers (playhead UI, arrangement, tests) get told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    Step(usize),         // the step index that just played
    Stopped,             // transport went to stopped; playhead should clear
    PatternChanged,      // slot switch, length change, undo/redo, paste, recall
    PadTriggered(usize), // a sampler track fired, for pad lights
}
