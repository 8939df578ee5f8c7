//! Page replacement policies.
//!
//! A policy tracks exactly the set of occupied frames and decides which of
//! them is evicted next. It never looks at frame contents or page tables.

pub mod fifo;
pub mod lru;

use std::fmt;
use std::str::FromStr;

use crate::memory::{errors::MemoryResult, ids::FrameId};

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;

pub trait ReplacementPolicy: Send + fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// A frame was filled with a newly loaded page.
    fn on_load(&mut self, frame: FrameId);

    /// A resident frame was referenced without faulting.
    fn on_access(&mut self, frame: FrameId);

    /// The frame that `choose_victim` would return, without removing it.
    fn peek_victim(&self) -> Option<FrameId>;

    /// Removes and returns the next victim.
    fn choose_victim(&mut self) -> MemoryResult<FrameId>;

    /// Stops tracking a frame that was freed outside of eviction.
    fn remove(&mut self, frame: FrameId) -> bool;

    /// Tracked frames, next victim first.
    fn order(&self) -> Vec<FrameId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Fifo,
    Lru,
}

impl PolicyKind {
    pub fn build(self, capacity: usize) -> Box<dyn ReplacementPolicy> {
        match self {
            PolicyKind::Fifo => Box::new(FifoPolicy::new(capacity)),
            PolicyKind::Lru => Box::new(LruPolicy::new(capacity)),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" => Ok(PolicyKind::Lru),
            other => anyhow::bail!("unknown replacement policy '{}' (expected fifo or lru)", other),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Fifo => write!(f, "FIFO"),
            PolicyKind::Lru => write!(f, "LRU"),
        }
    }
}
