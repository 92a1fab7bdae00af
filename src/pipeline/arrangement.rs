// Song mode: an ordered list of scene blocks, each held for some bars.
// One bar here is one full pass of the pattern (one loop wrap).

use serde::{Deserialize, Serialize};

use crate::shared::{NUM_SCENES, slot_label};

pub const MAX_BLOCK_BARS: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub scene: usize,
    pub bars: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub block: usize,
    pub scene: usize,
    pub bar: u32, // 1-based
    pub bars: u32,
    pub blocks: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Arrangement {
    blocks: Vec<Block>,
    current_block: usize,
    current_bar: u32,
    playing: bool,
}

impl Arrangement {
    pub fn add_block(&mut self, scene: usize, bars: u32) -> bool {
        if scene >= NUM_SCENES {
            log::warn!("arrangement: scene {scene} out of range");
            return false;
        }
        self.blocks.push(Block {
            scene,
            bars: bars.clamp(1, MAX_BLOCK_BARS),
        });
        true
    }

    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index >= self.blocks.len() {
            return None;
        }
        let removed = self.blocks.remove(index);
        if self.current_block >= self.blocks.len() {
            self.current_block = 0;
            self.current_bar = 0;
        }
        Some(removed)
    }

    // swap a block with its neighbour; direction is -1 (up) or +1 (down)
    pub fn move_block(&mut self, index: usize, direction: isize) -> bool {
        let Some(target) = index.checked_add_signed(direction) else {
            return false;
        };
        if index >= self.blocks.len() || target >= self.blocks.len() {
            return false;
        }
        self.blocks.swap(index, target);
        true
    }

    pub fn set_block_bars(&mut self, index: usize, bars: u32) {
        if let Some(block) = self.blocks.get_mut(index) {
            block.bars = bars.clamp(1, MAX_BLOCK_BARS);
        }
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.current_block = 0;
        self.current_bar = 0;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn total_bars(&self) -> u32 {
        self.blocks.iter().map(|b| b.bars).sum()
    }

    /// Start from the top. Returns the scene to recall, or None if empty.
    pub fn start(&mut self) -> Option<usize> {
        let first = self.blocks.first()?.scene;
        self.playing = true;
        self.current_block = 0;
        self.current_bar = 0;
        log::info!("arrangement started on scene {}", slot_label(first));
        Some(first)
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Feed one completed pattern loop. Returns a scene index when the
    /// arrangement moves into a new block (wrapping to the first at the end).
    pub fn on_loop_complete(&mut self) -> Option<usize> {
        if !self.playing || self.blocks.is_empty() {
            return None;
        }
        self.current_bar += 1;
        if self.current_bar < self.blocks[self.current_block].bars {
            return None;
        }
        self.current_bar = 0;
        self.current_block += 1;
        if self.current_block >= self.blocks.len() {
            self.current_block = 0;
            log::info!("arrangement looped");
        }
        let scene = self.blocks[self.current_block].scene;
        log::debug!(
            "arrangement: block {} scene {}",
            self.current_block,
            slot_label(scene)
        );
        Some(scene)
    }

    pub fn position(&self) -> Option<Position> {
        let block = self.blocks.get(self.current_block)?;
        Some(Position {
            block: self.current_block,
            scene: block.scene,
            bar: self.current_bar + 1,
            bars: block.bars,
            blocks: self.blocks.len(),
        })
    }
}
