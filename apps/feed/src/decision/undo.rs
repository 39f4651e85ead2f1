use std::collections::VecDeque;

use crate::models::opportunity::OpportunityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoEntry {
    pub opportunity_id: OpportunityId,
    pub previous_index: usize,
}

/// Bounded stack of recent swipes. Pushing onto a full buffer drops the oldest
/// entry, so with depth 1 each swipe replaces the last one.
#[derive(Debug, Clone)]
pub struct UndoBuffer {
    entries: VecDeque<UndoEntry>,
    depth: usize,
}

impl UndoBuffer {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    pub fn push(&mut self, entry: UndoEntry) {
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: OpportunityId, idx: usize) -> UndoEntry {
        UndoEntry {
            opportunity_id: id,
            previous_index: idx,
        }
    }

    #[test]
    fn test_depth_one_replaces_entry() {
        let mut buf = UndoBuffer::new(1);
        buf.push(entry(3, 2));
        buf.push(entry(2, 1));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.pop(), Some(entry(2, 1)));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn test_deeper_buffer_is_lifo_and_bounded() {
        let mut buf = UndoBuffer::new(2);
        buf.push(entry(3, 2));
        buf.push(entry(2, 1));
        buf.push(entry(1, 0));
        assert_eq!(buf.pop(), Some(entry(1, 0)));
        assert_eq!(buf.pop(), Some(entry(2, 1)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_depth_is_treated_as_one() {
        let mut buf = UndoBuffer::new(0);
        buf.push(entry(1, 0));
        assert_eq!(buf.len(), 1);
    }
}
