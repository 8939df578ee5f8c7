use crate::memory::{
    errors::{MemoryError, MemoryResult},
    frame::Frame,
    ids::{FrameId, PageKey},
};
use crate::vm_trace;

/// Fixed-capacity physical memory.
///
/// The store only tracks occupancy and contents. Choosing a victim is the
/// replacement policy's job, and unmapping the victim's owners is the
/// memory manager's.
#[derive(Debug)]
pub struct PageFrameStore {
    page_size: usize,
    frames: Vec<Frame>,
}

impl PageFrameStore {
    pub fn new(capacity: usize, page_size: usize) -> MemoryResult<Self> {
        if capacity == 0 {
            return Err(MemoryError::OutOfMemory);
        }

        let frames = (0..capacity)
            .map(|idx| Frame::new(FrameId(idx), page_size))
            .collect();

        Ok(Self { page_size, frames })
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn occupied_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_free()).count()
    }

    pub fn is_full(&self) -> bool {
        self.frames.iter().all(|f| !f.is_free())
    }

    pub fn find_free(&self) -> Option<FrameId> {
        self.frames.iter().find(|f| f.is_free()).map(|f| f.id)
    }

    pub fn frame(&self, id: FrameId) -> MemoryResult<&Frame> {
        self.frames
            .get(id.0)
            .ok_or_else(|| MemoryError::corruption(format!("{} out of range", id)))
    }

    fn frame_mut(&mut self, id: FrameId) -> MemoryResult<&mut Frame> {
        self.frames
            .get_mut(id.0)
            .ok_or_else(|| MemoryError::corruption(format!("{} out of range", id)))
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn occupied(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| !f.is_free())
    }

    /// Returns a free frame, or `victim_hint` once the caller has released
    /// every mapping of it.
    pub fn allocate_or_reuse(&self, victim_hint: Option<FrameId>) -> MemoryResult<FrameId> {
        if let Some(id) = self.find_free() {
            return Ok(id);
        }

        match victim_hint {
            Some(victim) if self.frame(victim)?.is_free() => Ok(victim),
            Some(victim) => Err(MemoryError::corruption(format!(
                "victim {} is still mapped",
                victim
            ))),
            None => Err(MemoryError::OutOfMemory),
        }
    }

    /// Adds `key` as a mapping of `id`. The first binding is a fresh load
    /// and starts clean; later bindings are COW sharers and mark it dirty.
    pub fn bind(&mut self, id: FrameId, key: PageKey) -> MemoryResult<()> {
        let frame = self.frame_mut(id)?;

        if frame.is_mapped_by(key) {
            return Err(MemoryError::corruption(format!(
                "{} already mapped by {}",
                id, key
            )));
        }

        frame.dirty = !frame.is_free();
        frame.add_owner(key);

        vm_trace!(Frames, "bind {} -> {} (refs={})", key, id, frame.ref_count());
        Ok(())
    }

    /// Drops the mapping of `key` and returns the remaining reference count.
    /// A frame reaching zero is cleared and becomes free.
    pub fn unbind(&mut self, id: FrameId, key: PageKey) -> MemoryResult<usize> {
        let frame = self.frame_mut(id)?;

        if !frame.remove_owner(key) {
            return Err(MemoryError::corruption(format!(
                "{} is not mapped by {}",
                id, key
            )));
        }

        let remaining = frame.ref_count();
        if remaining == 0 {
            frame.clear();
        }

        vm_trace!(Frames, "unbind {} from {} (refs={})", key, id, remaining);
        Ok(remaining)
    }

    pub fn mark_dirty(&mut self, id: FrameId) -> MemoryResult<()> {
        self.frame_mut(id)?.dirty = true;
        Ok(())
    }

    pub fn data(&self, id: FrameId) -> MemoryResult<&[u8]> {
        Ok(&self.frame(id)?.data)
    }

    pub fn data_mut(&mut self, id: FrameId) -> MemoryResult<&mut [u8]> {
        Ok(&mut self.frame_mut(id)?.data)
    }

    /// Overwrites the contents of `id`. `bytes` shorter than a page leave
    /// the tail zeroed.
    pub fn fill(&mut self, id: FrameId, bytes: &[u8]) -> MemoryResult<()> {
        let frame = self.frame_mut(id)?;
        let len = bytes.len().min(frame.data.len());
        frame.data.fill(0);
        frame.data[..len].copy_from_slice(&bytes[..len]);
        Ok(())
    }
}
