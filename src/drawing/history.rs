use std::collections::VecDeque;

/// Linear undo/redo stack of encoded canvas snapshots.
///
/// The cursor is `None` only while the buffer is empty; otherwise it always
/// points at a stored snapshot. Once `capacity` snapshots are held, pushing
/// evicts the oldest one.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    snapshots: VecDeque<String>,
    cursor: Option<usize>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Drops all history and starts again from `blank`.
    pub fn initialize(&mut self, blank: String) {
        self.snapshots.clear();
        self.snapshots.push_back(blank);
        self.cursor = Some(0);
    }

    /// Records a new state, discarding any redo tail past the cursor.
    pub fn push(&mut self, snapshot: String) {
        let keep = self.cursor.map(|cursor| cursor + 1).unwrap_or(0);
        self.snapshots.truncate(keep);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = Some(self.snapshots.len() - 1);
    }

    pub fn undo(&mut self) -> Option<&str> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn redo(&mut self) -> Option<&str> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.snapshots.len() => {
                self.cursor = Some(cursor + 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor
            .and_then(|cursor| self.snapshots.get(cursor))
            .map(String::as_str)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.snapshots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: usize) -> HistoryBuffer {
        let mut history = HistoryBuffer::new(100);
        history.initialize("blank".into());
        for i in 1..=count {
            history.push(format!("s{i}"));
        }
        history
    }

    #[test]
    fn empty_buffer_has_no_cursor() {
        let mut history = HistoryBuffer::new(4);
        assert_eq!(history.cursor(), None);
        assert!(history.is_empty());
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn full_undo_returns_to_blank_and_full_redo_restores_last() {
        let mut history = filled(3);
        for _ in 0..3 {
            assert!(history.undo().is_some());
        }
        assert_eq!(history.current(), Some("blank"));
        assert_eq!(history.undo(), None);
        for _ in 0..3 {
            assert!(history.redo().is_some());
        }
        assert_eq!(history.current(), Some("s3"));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn push_after_partial_undo_discards_redo_tail() {
        let mut history = filled(3);
        history.undo();
        history.undo();
        history.push("branch".into());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some("branch"));
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some("s1"));
    }

    #[test]
    fn push_on_empty_buffer_starts_history() {
        let mut history = HistoryBuffer::new(4);
        history.push("first".into());
        assert_eq!(history.cursor(), Some(0));
        assert!(!history.can_undo());
    }

    #[test]
    fn capacity_evicts_oldest_snapshots() {
        let mut history = HistoryBuffer::new(3);
        history.initialize("blank".into());
        for i in 1..=5 {
            history.push(format!("s{i}"));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.undo(), Some("s4"));
        assert_eq!(history.undo(), Some("s3"));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn initialize_discards_previous_history() {
        let mut history = filled(2);
        history.initialize("fresh".into());
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some("fresh"));
        assert!(!history.can_undo());
    }
}
