//! Bounded undo/redo over whole-state snapshots.

use super::error::EngineError;

pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Undo/redo stack of full snapshots.
///
/// `push` records the state from *before* an action. Undoing from the live
/// tip first records the live state so redo can come back to it. While
/// `live_recorded` is set, `entries[index]` is the state currently shown.
#[derive(Clone, Debug)]
pub struct HistoryStack<T> {
    entries: Vec<T>,
    index: usize,
    max_history: usize,
    live_recorded: bool,
}

impl<T: Clone> HistoryStack<T> {
    /// `max_history` below 2 would leave no room to undo; it is raised to 2.
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            max_history: max_history.max(2),
            live_recorded: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Record a pre-action snapshot. Any redo branch is discarded.
    pub fn push(&mut self, snapshot: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
            if self.live_recorded {
                // entries[index] is the live state, i.e. this same snapshot
                self.entries.pop();
            }
        }
        self.entries.push(snapshot);
        self.live_recorded = false;
        self.evict();
        self.index = self.entries.len() - 1;
    }

    /// Step back. `live` is the state currently shown.
    pub fn undo(&mut self, live: &T) -> Result<T, EngineError> {
        if self.entries.is_empty() {
            return Err(EngineError::NothingToUndo);
        }
        if !self.live_recorded {
            self.entries.push(live.clone());
            self.live_recorded = true;
            self.evict();
            self.index = self.entries.len() - 1;
        }
        if self.index == 0 {
            return Err(EngineError::NothingToUndo);
        }
        self.index -= 1;
        Ok(self.entries[self.index].clone())
    }

    pub fn redo(&mut self) -> Result<T, EngineError> {
        if !self.live_recorded || self.index + 1 >= self.entries.len() {
            return Err(EngineError::NothingToRedo);
        }
        self.index += 1;
        Ok(self.entries[self.index].clone())
    }

    pub fn can_undo(&self) -> bool {
        if self.live_recorded {
            self.index > 0
        } else {
            !self.entries.is_empty()
        }
    }

    pub fn can_redo(&self) -> bool {
        self.live_recorded && self.index + 1 < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
        self.live_recorded = false;
    }

    // FIFO: oldest entries go first.
    fn evict(&mut self) {
        if self.entries.len() > self.max_history {
            let excess = self.entries.len() - self.max_history;
            self.entries.drain(..excess);
        }
    }
}
