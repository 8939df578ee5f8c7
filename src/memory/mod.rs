pub mod backing;
pub mod errors;
pub mod frame;
pub mod frame_store;
pub mod ids;
pub mod manager;
pub mod page_table;
pub mod replacement;
pub mod stats;

pub use errors::{MemoryError, MemoryResult};
pub use ids::{FrameId, PageKey, Pid, Vpn};
pub use manager::{AccessOutcome, Eviction, MemoryHandle, MemoryManager};
pub use page_table::{PageTable, PageTableEntry};
pub use replacement::{PolicyKind, ReplacementPolicy};
pub use stats::MemoryStats;
