// Scene snapshots: the sequencer half of a scene save/recall.

use serde::{Deserialize, Serialize};

use super::project::{InstrumentSource, Track};
use crate::shared::{NUM_SCENES, NUM_TRACKS, slot_label};

/// Exported sequencer state. Serializes to JSON and restores by deep copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub tracks: [Track; NUM_TRACKS],
    pub sources: [InstrumentSource; NUM_TRACKS],
    pub length: usize,
    pub tempo: f32,
}

impl SceneSnapshot {
    pub fn active_steps(&self) -> usize {
        self.tracks
            .iter()
            .map(|t| t.steps.iter().take(self.length).filter(|s| s.active).count())
            .sum()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneBank {
    scenes: [Option<SceneSnapshot>; NUM_SCENES],
    current: usize,
}

impl SceneBank {
    pub fn store(&mut self, index: usize, scene: SceneSnapshot) -> bool {
        let Some(slot) = self.scenes.get_mut(index) else {
            log::warn!("scene index {index} out of range");
            return false;
        };
        log::info!(
            "saved scene {}: tempo={} active steps={}",
            slot_label(index),
            scene.tempo,
            scene.active_steps()
        );
        *slot = Some(scene);
        true
    }

    // A copy of the stored scene, ready to hand to Sequencer::recall_scene.
    pub fn recall(&mut self, index: usize) -> Option<SceneSnapshot> {
        let scene = self.scenes.get(index)?.clone();
        match scene {
            Some(scene) => {
                self.current = index;
                Some(scene)
            }
            None => {
                log::info!("scene {} is empty, save it first", slot_label(index));
                None
            }
        }
    }

    pub fn has_scene(&self, index: usize) -> bool {
        matches!(self.scenes.get(index), Some(Some(_)))
    }

    pub fn get(&self, index: usize) -> Option<&SceneSnapshot> {
        self.scenes.get(index)?.as_ref()
    }

    pub fn current(&self) -> usize {
        self.current
    }
}
