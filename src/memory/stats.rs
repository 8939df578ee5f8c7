use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    /// Accesses resolved without a fault
    pub hits: u64,

    /// Page faults of any kind
    pub faults: u64,

    /// Faults on pages that had been evicted before
    pub refaults: u64,

    /// Writes that broke copy-on-write sharing
    pub cow_breaks: u64,

    /// Frames reclaimed from the replacement policy
    pub evictions: u64,

    /// Evictions of dirty frames
    pub writebacks: u64,
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} faults={} refaults={} cow_breaks={} evictions={} writebacks={}",
            self.hits, self.faults, self.refaults, self.cow_breaks, self.evictions, self.writebacks
        )
    }
}
