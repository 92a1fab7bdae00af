// Rhythm generation: the deterministic Euclidean primitive and the
// stochastic vibe templates layered on top of it.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use super::project::PatternSlot;
use crate::shared::NUM_TRACKS;

/// Spread `hits` onsets as evenly as possible over `steps` cells, then rotate
/// the result left by `rotation`.
///
/// Bucket accumulator: every cell adds `hits` to the bucket and emits a hit
/// when the bucket overflows `steps`. The bucket starts pre-charged to
/// `steps - hits` so the first cell is always a hit (4/16 gives 0, 4, 8, 12).
/// `hits` above `steps` is clamped, zero hits gives all rests.
pub fn generate_euclidean(hits: usize, steps: usize, rotation: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    let hits = hits.min(steps);
    if hits == 0 {
        return vec![false; steps];
    }

    let mut bucket = steps - hits;
    let pattern: Vec<bool> = (0..steps)
        .map(|_| {
            bucket += hits;
            if bucket >= steps {
                bucket -= steps;
                true
            } else {
                false
            }
        })
        .collect();

    let mut rotated = pattern;
    rotated.rotate_left(rotation % steps);
    rotated
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vibe {
    Calm,
    Urban,
    Nature,
    Chaos,
}

impl Vibe {
    pub const ALL: [Vibe; 4] = [Vibe::Calm, Vibe::Urban, Vibe::Nature, Vibe::Chaos];

    pub fn label(self) -> &'static str {
        match self {
            Vibe::Calm => "calm",
            Vibe::Urban => "urban",
            Vibe::Nature => "nature",
            Vibe::Chaos => "chaos",
        }
    }

    // one instruction per track, kick first
    pub fn recipe(self) -> [Recipe; NUM_TRACKS] {
        use Recipe::{Clear, Euclid};
        use Rotation::{Fixed, Random};
        match self {
            // sparse and steady
            Vibe::Calm => [
                Euclid(4, Fixed(0)), // four on the floor
                Clear,               // no snare
                Euclid(2, Fixed(0)),
                Clear,
                Clear,
                Clear,
                Euclid(3, Fixed(2)),
                Clear,
            ],
            // busy, syncopated
            Vibe::Urban => [
                Euclid(4, Fixed(0)),
                Euclid(4, Fixed(4)), // backbeat
                Euclid(8, Fixed(0)),
                Euclid(3, Fixed(2)),
                Euclid(2, Fixed(6)),
                Clear,
                Euclid(5, Fixed(1)),
                Euclid(2, Fixed(8)),
            ],
            // organic, irregular
            Vibe::Nature => [
                Euclid(3, Fixed(0)),
                Clear,
                Euclid(5, Fixed(3)),
                Clear,
                Euclid(2, Fixed(5)),
                Euclid(3, Fixed(7)),
                Euclid(7, Fixed(0)),
                Clear,
            ],
            Vibe::Chaos => [
                Euclid(7, Random),
                Euclid(5, Random),
                Euclid(11, Random),
                Euclid(7, Random),
                Euclid(5, Random),
                Euclid(9, Random),
                Euclid(13, Random),
                Euclid(3, Random),
            ],
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Vibe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vibe::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown vibe '{s}' (calm, urban, nature, chaos)"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Fixed(usize),
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipe {
    Clear,
    Euclid(usize, Rotation), // hits over the 16-step bar
}

/// Steps per bar the vibe recipes are written against.
pub const RECIPE_STEPS: usize = 16;

// Knock out active steps at random; each survives with chance density/100.
pub fn thin_density<R: Rng>(slot: &mut PatternSlot, density: f32, rng: &mut R) {
    let keep = (density / 100.0).clamp(0.0, 1.0) as f64;
    let length = slot.length;
    for track in slot.tracks.iter_mut() {
        for step in track.steps.iter_mut().take(length) {
            if step.active && rng.r#gen::<f64>() > keep {
                step.active = false;
            }
        }
    }
}

// Above 50% complexity every surviving step gets a fresh probability in [50, 100).
pub fn vary_probability<R: Rng>(slot: &mut PatternSlot, complexity: f32, rng: &mut R) {
    if complexity <= 50.0 {
        return;
    }
    let length = slot.length;
    for track in slot.tracks.iter_mut() {
        for step in track.steps.iter_mut().take(length) {
            if step.active {
                step.probability = rng.gen_range(50..100);
            }
        }
    }
}

/// Settings picked by a "surprise me" generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surprise {
    pub vibe: Vibe,
    pub density: f32,
    pub complexity: f32,
    pub tempo: f32,
}

impl Surprise {
    pub fn roll<R: Rng>(rng: &mut R) -> Self {
        Self {
            vibe: Vibe::ALL[rng.gen_range(0..Vibe::ALL.len())],
            density: rng.gen_range(30.0..90.0),
            complexity: rng.gen_range(20.0..80.0),
            tempo: rng.gen_range(80..160) as f32,
        }
    }
}
