use super::{PolicyKind, ReplacementPolicy};
use crate::memory::{
    errors::{MemoryError, MemoryResult},
    ids::FrameId,
};

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list threaded through a slot per frame id, so promote, evict
/// and remove are O(1). `head` is least recently used, `tail` most.
#[derive(Debug, Default)]
pub struct LruPolicy {
    links: Vec<Option<Link>>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl LruPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            links: vec![None; capacity],
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn contains(&self, idx: usize) -> bool {
        matches!(self.links.get(idx), Some(Some(_)))
    }

    fn detach(&mut self, idx: usize) -> bool {
        let Some(link) = self.links.get_mut(idx).and_then(Option::take) else {
            return false;
        };

        match link.prev {
            Some(prev) => {
                if let Some(p) = self.links[prev].as_mut() {
                    p.next = link.next;
                }
            }
            None => self.head = link.next,
        }

        match link.next {
            Some(next) => {
                if let Some(n) = self.links[next].as_mut() {
                    n.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }

        self.len -= 1;
        true
    }

    fn push_mru(&mut self, idx: usize) {
        if idx >= self.links.len() {
            self.links.resize(idx + 1, None);
        }

        self.links[idx] = Some(Link {
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => {
                if let Some(t) = self.links[tail].as_mut() {
                    t.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }

        self.tail = Some(idx);
        self.len += 1;
    }

    fn touch(&mut self, frame: FrameId) {
        self.detach(frame.0);
        self.push_mru(frame.0);
    }
}

impl ReplacementPolicy for LruPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }

    fn on_load(&mut self, frame: FrameId) {
        self.touch(frame);
    }

    fn on_access(&mut self, frame: FrameId) {
        self.touch(frame);
    }

    fn peek_victim(&self) -> Option<FrameId> {
        self.head.map(FrameId)
    }

    fn choose_victim(&mut self) -> MemoryResult<FrameId> {
        let victim = self.head.ok_or(MemoryError::EmptyPolicyState)?;
        self.detach(victim);
        Ok(FrameId(victim))
    }

    fn remove(&mut self, frame: FrameId) -> bool {
        self.contains(frame.0) && self.detach(frame.0)
    }

    fn order(&self) -> Vec<FrameId> {
        let mut order = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            order.push(FrameId(idx));
            cursor = self.links[idx].and_then(|link| link.next);
        }
        order
    }

    fn len(&self) -> usize {
        self.len
    }
}
