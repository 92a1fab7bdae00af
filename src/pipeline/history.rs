// Bounded undo/redo over the current slot's grid, track routing and length.

use std::collections::VecDeque;

use super::project::{InstrumentSource, Track};
use crate::shared::{HISTORY_LIMIT, NUM_TRACKS};

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub tracks: [Track; NUM_TRACKS],
    pub sources: [InstrumentSource; NUM_TRACKS],
    pub length: usize,
}

#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(limit.min(HISTORY_LIMIT)),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Checkpoint before a mutation. Evicts the oldest entry past the limit
    /// and drops anything that could have been redone.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.push_undo(snapshot);
        self.redo.clear();
    }

    // Swap `current` for the newest undo entry; `current` becomes redoable.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let prev = self.undo.pop_back()?;
        self.redo.push(current);
        Some(prev)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }
}
