use crate::memory::{
    errors::{MemoryError, MemoryResult},
    ids::{FrameId, Pid, Vpn},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTableEntry {
    Unmapped,
    Resident {
        frame: FrameId,
        writable: bool,
        cow: bool,
    },
    Evicted,
}

impl PageTableEntry {
    pub fn frame(&self) -> Option<FrameId> {
        match self {
            PageTableEntry::Resident { frame, .. } => Some(*frame),
            _ => None,
        }
    }

    pub fn is_resident(&self) -> bool {
        matches!(self, PageTableEntry::Resident { .. })
    }
}

/// Per-process mapping from virtual page number to entry state.
///
/// The table stores frame ids only; reference counts live in the frame
/// store and are kept in step by the memory manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    pid: Pid,
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    pub fn new(pid: Pid, pages: usize) -> Self {
        Self {
            pid,
            entries: vec![PageTableEntry::Unmapped; pages],
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Number of virtual pages in the address space.
    pub fn bound(&self) -> u64 {
        self.entries.len() as u64
    }

    fn index(&self, vpn: Vpn) -> MemoryResult<usize> {
        if vpn.0 < self.bound() {
            Ok(vpn.0 as usize)
        } else {
            Err(MemoryError::InvalidPage {
                pid: self.pid,
                vpn,
                bound: self.bound(),
            })
        }
    }

    pub fn lookup(&self, vpn: Vpn) -> MemoryResult<PageTableEntry> {
        let idx = self.index(vpn)?;
        Ok(self.entries[idx])
    }

    pub fn map(&mut self, vpn: Vpn, frame: FrameId, writable: bool, cow: bool) -> MemoryResult<()> {
        let idx = self.index(vpn)?;
        self.entries[idx] = PageTableEntry::Resident {
            frame,
            writable,
            cow,
        };
        Ok(())
    }

    /// Moves a resident entry to `Evicted` and returns the frame it held.
    /// Non-resident entries are left as they are.
    pub fn unmap(&mut self, vpn: Vpn) -> MemoryResult<Option<FrameId>> {
        let idx = self.index(vpn)?;
        let prior = self.entries[idx].frame();
        if prior.is_some() {
            self.entries[idx] = PageTableEntry::Evicted;
        }
        Ok(prior)
    }

    /// Write-protects every writable resident entry as copy-on-write and
    /// returns the child's table, an independent copy of the result.
    pub fn fork_share(&mut self, child: Pid) -> PageTable {
        for entry in self.entries.iter_mut() {
            if let PageTableEntry::Resident {
                writable, cow, ..
            } = entry
            {
                if *writable {
                    *writable = false;
                    *cow = true;
                }
            }
        }

        PageTable {
            pid: child,
            entries: self.entries.clone(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (Vpn, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (Vpn(idx as u64), *entry))
    }

    pub fn resident(&self) -> impl Iterator<Item = (Vpn, FrameId)> + '_ {
        self.entries()
            .filter_map(|(vpn, entry)| entry.frame().map(|frame| (vpn, frame)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_unmapped_and_bounded() {
        let table = PageTable::new(Pid(1), 4);

        assert_eq!(table.lookup(Vpn(3)).unwrap(), PageTableEntry::Unmapped);
        assert_eq!(
            table.lookup(Vpn(4)).unwrap_err(),
            MemoryError::InvalidPage {
                pid: Pid(1),
                vpn: Vpn(4),
                bound: 4
            }
        );
    }

    #[test]
    fn unmap_moves_resident_to_evicted() {
        let mut table = PageTable::new(Pid(1), 2);
        table.map(Vpn(0), FrameId(3), true, false).unwrap();

        assert_eq!(table.unmap(Vpn(0)).unwrap(), Some(FrameId(3)));
        assert_eq!(table.lookup(Vpn(0)).unwrap(), PageTableEntry::Evicted);

        assert_eq!(table.unmap(Vpn(1)).unwrap(), None);
        assert_eq!(table.lookup(Vpn(1)).unwrap(), PageTableEntry::Unmapped);
    }

    #[test]
    fn fork_share_marks_both_tables_cow() {
        let mut parent = PageTable::new(Pid(1), 3);
        parent.map(Vpn(0), FrameId(0), true, false).unwrap();
        parent.map(Vpn(2), FrameId(1), true, false).unwrap();

        let mut child = parent.fork_share(Pid(2));

        let shared = PageTableEntry::Resident {
            frame: FrameId(0),
            writable: false,
            cow: true,
        };
        assert_eq!(parent.lookup(Vpn(0)).unwrap(), shared);
        assert_eq!(child.lookup(Vpn(0)).unwrap(), shared);
        assert_eq!(child.lookup(Vpn(1)).unwrap(), PageTableEntry::Unmapped);
        assert_eq!(child.pid(), Pid(2));

        child.map(Vpn(0), FrameId(2), true, false).unwrap();
        assert_eq!(parent.lookup(Vpn(0)).unwrap(), shared);
    }
}
