use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::MemoryConfig;
use crate::debugger::DebugLevel;
use crate::memory::{
    backing::BackingStore,
    errors::{MemoryError, MemoryResult},
    frame::Frame,
    frame_store::PageFrameStore,
    ids::{FrameId, PageKey, Pid, Vpn},
    page_table::{PageTable, PageTableEntry},
    replacement::{PolicyKind, ReplacementPolicy},
    stats::MemoryStats,
};
use crate::{vm_debug, vm_error, vm_info, vm_scope, vm_trace};

/// The single lock every fault and eviction runs under.
pub type MemoryHandle = Arc<Mutex<MemoryManager>>;

/// A frame reclaimed to make room, with every page that lost it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub frame: FrameId,
    pub victims: Vec<PageKey>,
    pub written_back: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit {
        frame: FrameId,
    },
    Fault {
        frame: FrameId,
        refault: bool,
        eviction: Option<Eviction>,
    },
    CowBreak {
        frame: FrameId,
        copied: bool,
        eviction: Option<Eviction>,
    },
}

impl AccessOutcome {
    pub fn frame(&self) -> FrameId {
        match self {
            AccessOutcome::Hit { frame }
            | AccessOutcome::Fault { frame, .. }
            | AccessOutcome::CowBreak { frame, .. } => *frame,
        }
    }

    pub fn eviction(&self) -> Option<&Eviction> {
        match self {
            AccessOutcome::Hit { .. } => None,
            AccessOutcome::Fault { eviction, .. } | AccessOutcome::CowBreak { eviction, .. } => {
                eviction.as_ref()
            }
        }
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOutcome::Hit { frame } => write!(f, "hit {}", frame)?,
            AccessOutcome::Fault { frame, refault, .. } => {
                let kind = if *refault { "refault" } else { "fault" };
                write!(f, "{} -> {}", kind, frame)?
            }
            AccessOutcome::CowBreak { frame, copied, .. } => {
                let how = if *copied { "copied" } else { "reused" };
                write!(f, "cow break -> {} ({})", frame, how)?
            }
        }

        if let Some(eviction) = self.eviction() {
            let victims: Vec<String> = eviction.victims.iter().map(|k| k.to_string()).collect();
            write!(f, ", evicted {} from {}", eviction.frame, victims.join(" "))?;
            if eviction.written_back {
                write!(f, " (written back)")?;
            }
        }

        Ok(())
    }
}

/// Owns physical memory, the replacement policy and one page table per
/// process. All state changes go through `&mut self`; share it between
/// threads as a [`MemoryHandle`].
#[derive(Debug)]
pub struct MemoryManager {
    config: MemoryConfig,
    store: PageFrameStore,
    policy: Box<dyn ReplacementPolicy>,
    tables: BTreeMap<Pid, PageTable>,
    backing: BackingStore,
    stats: MemoryStats,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> MemoryResult<Self> {
        let store = PageFrameStore::new(config.frames, config.page_size)?;
        let policy = config.policy.build(config.frames);

        vm_info!(
            Mm,
            "memory manager up: {} frames x {} bytes, {} replacement",
            config.frames,
            config.page_size,
            config.policy
        );

        Ok(Self {
            config,
            store,
            policy,
            tables: BTreeMap::new(),
            backing: BackingStore::new(),
            stats: MemoryStats::default(),
        })
    }

    pub fn into_handle(self) -> MemoryHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    pub fn store(&self) -> &PageFrameStore {
        &self.store
    }

    pub fn frame(&self, id: FrameId) -> MemoryResult<&Frame> {
        self.store.frame(id)
    }

    pub fn processes(&self) -> impl Iterator<Item = Pid> + '_ {
        self.tables.keys().copied()
    }

    pub fn contains_process(&self, pid: Pid) -> bool {
        self.tables.contains_key(&pid)
    }

    pub fn page_table(&self, pid: Pid) -> MemoryResult<&PageTable> {
        self.tables
            .get(&pid)
            .ok_or(MemoryError::InvalidProcess { pid })
    }

    fn page_table_mut(&mut self, pid: Pid) -> MemoryResult<&mut PageTable> {
        self.tables
            .get_mut(&pid)
            .ok_or(MemoryError::InvalidProcess { pid })
    }

    pub fn entry(&self, pid: Pid, vpn: Vpn) -> MemoryResult<PageTableEntry> {
        self.page_table(pid)?.lookup(vpn)
    }

    /// Tracked frames, next victim first.
    pub fn policy_order(&self) -> Vec<FrameId> {
        self.policy.order()
    }

    pub fn resident_frames(&self) -> impl Iterator<Item = &Frame> {
        self.store.occupied()
    }

    #[cfg(test)]
    pub(crate) fn policy_mut(&mut self) -> &mut dyn ReplacementPolicy {
        self.policy.as_mut()
    }

    pub fn spawn(&mut self, pid: Pid) -> MemoryResult<()> {
        self.spawn_with_pages(pid, self.config.address_space_pages)
    }

    pub fn spawn_with_pages(&mut self, pid: Pid, pages: usize) -> MemoryResult<()> {
        if self.tables.contains_key(&pid) {
            return Err(MemoryError::ProcessExists { pid });
        }

        self.tables.insert(pid, PageTable::new(pid, pages));
        vm_info!(Mm, "spawned {} with {} pages", pid, pages);
        Ok(())
    }

    pub fn access(&mut self, pid: Pid, vpn: Vpn, is_write: bool) -> MemoryResult<AccessOutcome> {
        let result = self.dispatch_access(pid, vpn, is_write);

        if let Err(err) = &result {
            if err.is_recoverable() {
                vm_debug!(Mm, "access ({}, {}) rejected: {}", pid, vpn, err);
            } else {
                vm_error!(Mm, "access ({}, {}) aborted: {}", pid, vpn, err);
            }
        }

        result
    }

    fn dispatch_access(&mut self, pid: Pid, vpn: Vpn, is_write: bool) -> MemoryResult<AccessOutcome> {
        let key = PageKey::new(pid, vpn);

        match self.entry(pid, vpn)? {
            PageTableEntry::Unmapped => self.fault(key, false, is_write),

            PageTableEntry::Evicted => self.fault(key, true, is_write),

            PageTableEntry::Resident {
                frame, cow: true, ..
            } if is_write => vm_scope!(DebugLevel::Debug, Mm, format!("cow break {}", key), {
                self.break_cow(key, frame)
            }),

            PageTableEntry::Resident {
                writable: false,
                cow: false,
                ..
            } if is_write => Err(MemoryError::corruption(format!(
                "{} is read-only without copy-on-write",
                key
            ))),

            PageTableEntry::Resident { frame, .. } => {
                self.policy.on_access(frame);
                if is_write {
                    self.store.mark_dirty(frame)?;
                }
                self.stats.hits += 1;

                vm_trace!(Mm, "hit {} in {}", key, frame);
                Ok(AccessOutcome::Hit { frame })
            }
        }
    }

    fn fault(&mut self, key: PageKey, refault: bool, is_write: bool) -> MemoryResult<AccessOutcome> {
        vm_scope!(DebugLevel::Debug, Mm, format!("page fault {}", key), {
            self.resolve_fault(key, refault, is_write)
        })
    }

    fn resolve_fault(
        &mut self,
        key: PageKey,
        refault: bool,
        is_write: bool,
    ) -> MemoryResult<AccessOutcome> {
        let (frame, eviction) = self.obtain_frame()?;

        if let Some(saved) = self.backing.read_page(key) {
            self.store.fill(frame, saved)?;
        }
        self.store.bind(frame, key)?;
        if is_write {
            self.store.mark_dirty(frame)?;
        }
        self.page_table_mut(key.pid)?.map(key.vpn, frame, true, false)?;
        self.policy.on_load(frame);

        self.stats.faults += 1;
        if refault {
            self.stats.refaults += 1;
        }

        vm_debug!(Mm, "loaded {} into {}", key, frame);
        Ok(AccessOutcome::Fault {
            frame,
            refault,
            eviction,
        })
    }

    fn break_cow(&mut self, key: PageKey, shared: FrameId) -> MemoryResult<AccessOutcome> {
        if self.store.frame(shared)?.ref_count() == 1 {
            self.page_table_mut(key.pid)?.map(key.vpn, shared, true, false)?;
            self.store.mark_dirty(shared)?;
            self.policy.on_access(shared);
            self.stats.cow_breaks += 1;

            vm_debug!(Mm, "{} is the last sharer of {}, reusing it", key, shared);
            return Ok(AccessOutcome::CowBreak {
                frame: shared,
                copied: false,
                eviction: None,
            });
        }

        // The allocation below may evict `shared` itself.
        let snapshot = self.store.data(shared)?.to_vec();
        let (frame, eviction) = self.obtain_frame()?;

        if self.page_table(key.pid)?.lookup(key.vpn)?.frame() == Some(shared) {
            self.store.unbind(shared, key)?;
        }

        self.store.fill(frame, &snapshot)?;
        self.store.bind(frame, key)?;
        self.store.mark_dirty(frame)?;
        self.page_table_mut(key.pid)?.map(key.vpn, frame, true, false)?;
        self.policy.on_load(frame);
        self.stats.cow_breaks += 1;

        vm_debug!(Mm, "copied {} into {} for {}", shared, frame, key);
        Ok(AccessOutcome::CowBreak {
            frame,
            copied: true,
            eviction,
        })
    }

    /// Hands out a free frame, evicting the policy's victim when memory is
    /// full. Every page sharing the victim loses it together.
    fn obtain_frame(&mut self) -> MemoryResult<(FrameId, Option<Eviction>)> {
        if let Some(id) = self.store.find_free() {
            return Ok((id, None));
        }

        // Validate the whole eviction before touching anything.
        let victim = self
            .policy
            .peek_victim()
            .ok_or(MemoryError::EmptyPolicyState)?;
        let frame = self.store.frame(victim)?;
        if frame.is_free() {
            return Err(MemoryError::corruption(format!(
                "policy chose free {}",
                victim
            )));
        }

        let victims = frame.owners().to_vec();
        let written_back = frame.dirty;
        for key in &victims {
            let mapped = self
                .tables
                .get(&key.pid)
                .map(|table| table.lookup(key.vpn))
                .transpose()?
                .and_then(|entry| entry.frame());
            if mapped != Some(victim) {
                return Err(MemoryError::corruption(format!(
                    "{} owned by {} but not mapped there",
                    victim, key
                )));
            }
        }

        self.policy.choose_victim()?;

        for key in &victims {
            if written_back || !self.backing.contains(*key) {
                self.backing.write_page(*key, self.store.data(victim)?);
            }
        }
        for key in &victims {
            self.page_table_mut(key.pid)?.unmap(key.vpn)?;
            self.store.unbind(victim, *key)?;
        }

        self.stats.evictions += 1;
        if written_back {
            self.stats.writebacks += 1;
        }

        vm_debug!(
            Mm,
            "evicted {} ({} sharer(s), dirty={})",
            victim,
            victims.len(),
            written_back
        );

        let id = self.store.allocate_or_reuse(Some(victim))?;
        Ok((
            id,
            Some(Eviction {
                frame: victim,
                victims,
                written_back,
            }),
        ))
    }

    /// Gives `child` a copy-on-write view of `parent`'s address space. No
    /// page contents are copied here.
    pub fn fork(&mut self, parent: Pid, child: Pid) -> MemoryResult<()> {
        if self.tables.contains_key(&child) {
            return Err(MemoryError::ProcessExists { pid: child });
        }

        let mut parent_table = self.page_table(parent)?.clone();
        let child_table = parent_table.fork_share(child);

        for (vpn, frame) in child_table.resident() {
            if !self.store.frame(frame)?.is_mapped_by(PageKey::new(parent, vpn)) {
                return Err(MemoryError::corruption(format!(
                    "{} maps {} without owning it",
                    PageKey::new(parent, vpn),
                    frame
                )));
            }
        }

        let mut shared = 0;
        for (vpn, entry) in child_table.entries() {
            match entry {
                PageTableEntry::Resident { frame, .. } => {
                    self.store.bind(frame, PageKey::new(child, vpn))?;
                    shared += 1;
                }
                PageTableEntry::Evicted => {
                    self.backing
                        .duplicate(PageKey::new(parent, vpn), PageKey::new(child, vpn));
                }
                PageTableEntry::Unmapped => {}
            }
        }

        self.tables.insert(parent, parent_table);
        self.tables.insert(child, child_table);

        vm_info!(Mm, "forked {} -> {} sharing {} frame(s)", parent, child, shared);
        Ok(())
    }

    /// Releases every frame the process maps. A second call for the same
    /// pid reports `InvalidProcess`.
    pub fn terminate(&mut self, pid: Pid) -> MemoryResult<()> {
        let table = self.page_table(pid)?;

        for (vpn, frame) in table.resident() {
            if !self.store.frame(frame)?.is_mapped_by(PageKey::new(pid, vpn)) {
                return Err(MemoryError::corruption(format!(
                    "{} maps {} without owning it",
                    PageKey::new(pid, vpn),
                    frame
                )));
            }
        }

        let table = self
            .tables
            .remove(&pid)
            .ok_or(MemoryError::InvalidProcess { pid })?;

        let mut freed = 0;
        for (vpn, frame) in table.resident() {
            if self.store.unbind(frame, PageKey::new(pid, vpn))? == 0 {
                self.policy.remove(frame);
                freed += 1;
            }
        }
        self.backing.purge_process(pid);

        vm_info!(Mm, "terminated {}, freed {} frame(s)", pid, freed);
        Ok(())
    }

    pub fn read(&mut self, pid: Pid, vpn: Vpn, offset: usize) -> MemoryResult<(u8, AccessOutcome)> {
        self.check_offset(pid, vpn, offset)?;
        let outcome = self.access(pid, vpn, false)?;
        let byte = self.store.data(outcome.frame())?[offset];
        Ok((byte, outcome))
    }

    pub fn write(
        &mut self,
        pid: Pid,
        vpn: Vpn,
        offset: usize,
        byte: u8,
    ) -> MemoryResult<AccessOutcome> {
        self.check_offset(pid, vpn, offset)?;
        let outcome = self.access(pid, vpn, true)?;
        self.store.data_mut(outcome.frame())?[offset] = byte;
        Ok(outcome)
    }

    fn check_offset(&self, pid: Pid, vpn: Vpn, offset: usize) -> MemoryResult<()> {
        self.entry(pid, vpn)?;

        let page_size = self.store.page_size();
        if offset >= page_size {
            return Err(MemoryError::InvalidOffset { offset, page_size });
        }
        Ok(())
    }

    /// Cross-checks frames, page tables and policy state.
    pub fn check_invariants(&self) -> MemoryResult<()> {
        if self.store.occupied_count() > self.store.capacity() {
            return Err(MemoryError::corruption("more frames occupied than exist"));
        }

        let mut mappings: HashMap<FrameId, Vec<(PageKey, bool)>> = HashMap::new();
        for table in self.tables.values() {
            for (vpn, entry) in table.entries() {
                if let PageTableEntry::Resident { frame, cow, .. } = entry {
                    mappings
                        .entry(frame)
                        .or_default()
                        .push((PageKey::new(table.pid(), vpn), cow));
                }
            }
        }

        for frame in self.store.frames() {
            let mapped = mappings.remove(&frame.id).unwrap_or_default();

            if frame.ref_count() != mapped.len() {
                return Err(MemoryError::corruption(format!(
                    "{} has {} reference(s) but {} mapping(s)",
                    frame.id,
                    frame.ref_count(),
                    mapped.len()
                )));
            }

            if let Some((key, _)) = mapped.iter().find(|(key, _)| !frame.is_mapped_by(*key)) {
                return Err(MemoryError::corruption(format!(
                    "{} mapped by {} which it does not record",
                    frame.id, key
                )));
            }

            if mapped.len() > 1 && mapped.iter().any(|(_, cow)| !cow) {
                return Err(MemoryError::corruption(format!(
                    "{} shared by a non-cow entry",
                    frame.id
                )));
            }
        }

        if let Some(frame) = mappings.keys().next() {
            return Err(MemoryError::corruption(format!(
                "entries reference nonexistent {}",
                frame
            )));
        }

        let tracked: BTreeSet<FrameId> = self.policy.order().into_iter().collect();
        let occupied: BTreeSet<FrameId> = self.store.occupied().map(|f| f.id).collect();
        if tracked != occupied || tracked.len() != self.policy.len() {
            return Err(MemoryError::corruption(format!(
                "policy tracks {:?} but occupied frames are {:?}",
                tracked, occupied
            )));
        }

        Ok(())
    }
}
