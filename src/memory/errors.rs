use std::fmt;

use crate::memory::ids::{Pid, Vpn};

pub type MemoryResult<T> = Result<T, MemoryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The manager was configured with zero frames.
    OutOfMemory,

    InvalidProcess { pid: Pid },

    ProcessExists { pid: Pid },

    InvalidPage { pid: Pid, vpn: Vpn, bound: u64 },

    InvalidOffset { offset: usize, page_size: usize },

    /// An eviction was requested while the replacement policy tracks nothing.
    EmptyPolicyState,

    Corruption { reason: String },
}

impl MemoryError {
    /// User errors leave the manager untouched and can simply be reported.
    /// Everything else is an internal invariant violation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MemoryError::InvalidProcess { .. }
                | MemoryError::ProcessExists { .. }
                | MemoryError::InvalidPage { .. }
                | MemoryError::InvalidOffset { .. }
        )
    }

    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        MemoryError::Corruption {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfMemory => {
                write!(f, "memory error: out of memory (no physical frames)")
            }

            MemoryError::InvalidProcess { pid } => {
                write!(f, "memory error: unknown process {}", pid.0)
            }

            MemoryError::ProcessExists { pid } => {
                write!(f, "memory error: process {} already exists", pid.0)
            }

            MemoryError::InvalidPage { pid, vpn, bound } => {
                write!(
                    f,
                    "memory error: page {} outside address space of process {} (bound {})",
                    vpn.0, pid.0, bound
                )
            }

            MemoryError::InvalidOffset { offset, page_size } => {
                write!(
                    f,
                    "memory error: offset {} outside page of {} bytes",
                    offset, page_size
                )
            }

            MemoryError::EmptyPolicyState => {
                write!(
                    f,
                    "memory error: policy state corruption (no resident frames to evict)"
                )
            }

            MemoryError::Corruption { reason } => {
                write!(f, "memory error: policy state corruption ({})", reason)
            }
        }
    }
}

impl std::error::Error for MemoryError {}
