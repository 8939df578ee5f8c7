use std::collections::VecDeque;

use super::{PolicyKind, ReplacementPolicy};
use crate::memory::{
    errors::{MemoryError, MemoryResult},
    ids::FrameId,
};

/// Evicts in load order. Hits do not reorder the queue.
#[derive(Debug, Default)]
pub struct FifoPolicy {
    queue: VecDeque<FrameId>,
}

impl FifoPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn on_load(&mut self, frame: FrameId) {
        self.remove(frame);
        self.queue.push_back(frame);
    }

    fn on_access(&mut self, _frame: FrameId) {}

    fn peek_victim(&self) -> Option<FrameId> {
        self.queue.front().copied()
    }

    fn choose_victim(&mut self) -> MemoryResult<FrameId> {
        self.queue.pop_front().ok_or(MemoryError::EmptyPolicyState)
    }

    fn remove(&mut self, frame: FrameId) -> bool {
        match self.queue.iter().position(|f| *f == frame) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    fn order(&self) -> Vec<FrameId> {
        self.queue.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}
