//! Per-page undo/redo history of encoded page snapshots

use std::collections::VecDeque;

/// Default number of undo steps kept per page
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Undo and redo stacks for one page
#[derive(Debug, Clone)]
pub struct PageHistory {
    undo: VecDeque<Vec<u8>>,
    redo: Vec<Vec<u8>>,
    limit: usize,
}

impl PageHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Push the state that precedes a new edit. Clears redo.
    pub fn record(&mut self, snapshot: Vec<u8>) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
        self.redo.clear();
    }

    /// Step back: returns the snapshot to install, keeping `current` for redo
    pub fn undo(&mut self, current: Vec<u8>) -> Option<Vec<u8>> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: returns the snapshot to install, keeping `current` for undo
    pub fn redo(&mut self, current: Vec<u8>) -> Option<Vec<u8>> {
        let next = self.redo.pop()?;
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

impl Default for PageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
