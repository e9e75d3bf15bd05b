//! Bounded undo/redo history of canvas snapshots.

use crate::canvas::CanvasState;
use std::collections::VecDeque;

/// Undo and redo stacks.
///
/// Snapshots share unchanged elements through `Arc`, so holding many of them
/// costs roughly one copy of each element version.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<CanvasState>,
    redo_stack: Vec<CanvasState>,
    limit: usize,
}

impl History {
    /// Create an empty history keeping at most `limit` undo states.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state as it was before a committed mutation.
    pub fn push(&mut self, snapshot: CanvasState) {
        self.undo_stack.push_back(snapshot);

        // New changes invalidate anything that was undone.
        self.redo_stack.clear();

        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        log::debug!("History push ({} undo states)", self.undo_stack.len());
    }

    /// Step back. `current` goes onto the redo stack and the state to restore
    /// is returned, or None if there is nothing to undo.
    pub fn undo(&mut self, current: CanvasState) -> Option<CanvasState> {
        let snapshot = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(snapshot)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: CanvasState) -> Option<CanvasState> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of states that can be undone.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(height: f64) -> CanvasState {
        CanvasState {
            canvas_height: height,
            ..CanvasState::default()
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new(50);
        assert!(!history.can_undo());
        assert!(history.undo(state(1.0)).is_none());

        history.push(state(1.0));
        let restored = history.undo(state(2.0)).unwrap();
        assert_eq!(restored.canvas_height, 1.0);
        assert!(history.can_redo());

        let again = history.redo(restored).unwrap();
        assert_eq!(again.canvas_height, 2.0);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new(50);
        history.push(state(1.0));
        history.undo(state(2.0));
        assert!(history.can_redo());
        history.push(state(3.0));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for h in 0..5 {
            history.push(state(h as f64));
        }
        assert_eq!(history.undo_len(), 3);
        let mut current = state(99.0);
        let mut seen = Vec::new();
        while let Some(previous) = history.undo(current) {
            seen.push(previous.canvas_height);
            current = previous;
        }
        assert_eq!(seen, vec![4.0, 3.0, 2.0]);
    }
}
