// Data model for the sequencer: steps, tracks, slots and the saved project.
//
// Everything here is a plain value type. Cloning is a deep copy (no Rc/Arc
// anywhere), which is what history snapshots, the clipboard and scenes rely on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::{DEFAULT_LENGTH, DEFAULT_TEMPO, MAX_STEPS, NUM_PATTERNS, NUM_TRACKS};

// The closed set of things a track can play.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentSource {
    #[default]
    Sampler,
    Synth,
    Radio,
    Mic,
}

impl InstrumentSource {
    pub const ALL: [InstrumentSource; 4] = [
        InstrumentSource::Sampler,
        InstrumentSource::Synth,
        InstrumentSource::Radio,
        InstrumentSource::Mic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InstrumentSource::Sampler => "sampler",
            InstrumentSource::Synth => "synth",
            InstrumentSource::Radio => "radio",
            InstrumentSource::Mic => "mic",
        }
    }
}

impl fmt::Display for InstrumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstrumentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrumentSource::ALL
            .into_iter()
            .find(|src| src.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source '{s}' (sampler, synth, radio, mic)"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamName {
    Pitch,
    Slice,
    Filter,
    Decay,
    Pan,
    Delay,
    Reverb,
    Grain,
}

impl ParamName {
    pub const ALL: [ParamName; 8] = [
        ParamName::Pitch,
        ParamName::Slice,
        ParamName::Filter,
        ParamName::Decay,
        ParamName::Pan,
        ParamName::Delay,
        ParamName::Reverb,
        ParamName::Grain,
    ];

    // inclusive value range a lock of this parameter is clamped into
    pub fn range(self) -> (i16, i16) {
        match self {
            ParamName::Pitch => (-24, 24), // semitones
            ParamName::Slice => (0, 15),
            ParamName::Pan => (-100, 100),
            _ => (0, 100),
        }
    }

    pub fn clamp(self, value: i16) -> i16 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// Per-step parameter overrides. `None` means "inherit the track/global default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamLocks {
    pub pitch: Option<i16>,
    pub slice: Option<i16>,
    pub filter: Option<i16>,
    pub decay: Option<i16>,
    pub pan: Option<i16>,
    pub delay: Option<i16>,
    pub reverb: Option<i16>,
    pub grain: Option<i16>,
}

impl ParamLocks {
    pub fn get(&self, param: ParamName) -> Option<i16> {
        match param {
            ParamName::Pitch => self.pitch,
            ParamName::Slice => self.slice,
            ParamName::Filter => self.filter,
            ParamName::Decay => self.decay,
            ParamName::Pan => self.pan,
            ParamName::Delay => self.delay,
            ParamName::Reverb => self.reverb,
            ParamName::Grain => self.grain,
        }
    }

    pub fn set(&mut self, param: ParamName, value: Option<i16>) {
        let value = value.map(|v| param.clamp(v));
        let slot = match param {
            ParamName::Pitch => &mut self.pitch,
            ParamName::Slice => &mut self.slice,
            ParamName::Filter => &mut self.filter,
            ParamName::Decay => &mut self.decay,
            ParamName::Pan => &mut self.pan,
            ParamName::Delay => &mut self.delay,
            ParamName::Reverb => &mut self.reverb,
            ParamName::Grain => &mut self.grain,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        ParamName::ALL.iter().all(|p| self.get(*p).is_none())
    }

    // copy every lock that `incoming` actually sets, leave the rest alone
    pub fn merge(&mut self, incoming: &ParamLocks) {
        for param in ParamName::ALL {
            if let Some(v) = incoming.get(param) {
                self.set(param, Some(v));
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrigKind {
    #[default]
    Always,
    Probability,
    Fill,
    NotFill,
    Nth,
    Neighbor,
    // anything we don't recognise in a loaded file; fires like `Always`
    #[serde(other)]
    Unknown,
}

/// Decides whether an already-active step fires on this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrigCondition {
    pub kind: TrigKind,
    pub value: u8, // probability percent, or N for nth
    pub neighbor_track: Option<usize>,
}

impl Default for TrigCondition {
    fn default() -> Self {
        Self {
            kind: TrigKind::Always,
            value: 100,
            neighbor_track: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Step {
    pub active: bool,
    pub probability: u8, // 0-100, only consulted by the `Always` condition
    pub velocity: u8,    // 0-100
    pub param_locks: ParamLocks,
    pub trig_condition: TrigCondition,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            active: false,
            probability: 100,
            velocity: 100,
            param_locks: ParamLocks::default(),
            trig_condition: TrigCondition::default(),
        }
    }
}

// One row of a slot. Always MAX_STEPS cells; the slot's length decides how many play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Step>", into = "Vec<Step>")]
pub struct Track {
    pub steps: Vec<Step>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            steps: vec![Step::default(); MAX_STEPS],
        }
    }
}

impl Track {
    pub fn clear(&mut self) {
        self.steps.fill(Step::default());
    }

    pub fn any_active(&self, length: usize) -> bool {
        self.steps.iter().take(length).any(|s| s.active)
    }
}

// older or hand-edited files may carry fewer (or more) cells; pad/trim to the grid
impl From<Vec<Step>> for Track {
    fn from(mut steps: Vec<Step>) -> Self {
        steps.resize(MAX_STEPS, Step::default());
        Self { steps }
    }
}

impl From<Track> for Vec<Step> {
    fn from(track: Track) -> Self {
        track.steps
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSlot {
    pub tracks: [Track; NUM_TRACKS],
    pub length: usize, // 1-64
    pub name: String,
}

impl Default for PatternSlot {
    fn default() -> Self {
        Self {
            tracks: std::array::from_fn(|_| Track::default()),
            length: DEFAULT_LENGTH,
            name: String::new(),
        }
    }
}

impl PatternSlot {
    pub fn has_data(&self) -> bool {
        self.tracks.iter().any(|t| t.any_active(self.length))
    }
}

// Per-track state that lives outside the slots: routing, mute/solo and the
// loop counter nth conditions key off of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRouting {
    pub source: InstrumentSource,
    pub muted: bool,
    pub soloed: bool,
    #[serde(skip)]
    pub play_count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DubMode {
    #[default]
    Off,
    Dub,     // only fills empty steps
    Overdub, // always writes
}

impl FromStr for DubMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(DubMode::Off),
            "dub" => Ok(DubMode::Dub),
            "overdub" => Ok(DubMode::Overdub),
            other => Err(format!("unknown dub mode '{other}' (off, dub, overdub)")),
        }
    }
}

// What gets written to .ondas/project.json
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub slots: [PatternSlot; NUM_PATTERNS],
    pub current_slot: usize,
    pub routing: [TrackRouting; NUM_TRACKS],
    pub tempo: f32,
    pub swing: f32,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| PatternSlot::default()),
            current_slot: 0,
            routing: [TrackRouting::default(); NUM_TRACKS],
            tempo: DEFAULT_TEMPO,
            swing: 0.0,
        }
    }
}
