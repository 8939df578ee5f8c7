use crate::memory::ids::{FrameId, PageKey};

/// A physical frame and the page-table entries currently mapping it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pub data: Box<[u8]>,
    pub dirty: bool,
    /// One key per mapping entry; more than one only under COW sharing.
    owners: Vec<PageKey>,
}

impl Frame {
    pub fn new(id: FrameId, page_size: usize) -> Self {
        Self {
            id,
            data: vec![0u8; page_size].into_boxed_slice(),
            dirty: false,
            owners: Vec::new(),
        }
    }

    pub fn ref_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_free(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn is_shared(&self) -> bool {
        self.owners.len() > 1
    }

    pub fn owners(&self) -> &[PageKey] {
        &self.owners
    }

    pub fn is_mapped_by(&self, key: PageKey) -> bool {
        self.owners.contains(&key)
    }

    pub(super) fn add_owner(&mut self, key: PageKey) {
        self.owners.push(key);
    }

    /// Returns false when `key` did not map this frame.
    pub(super) fn remove_owner(&mut self, key: PageKey) -> bool {
        match self.owners.iter().position(|owner| *owner == key) {
            Some(pos) => {
                self.owners.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub(super) fn clear(&mut self) {
        self.data.fill(0);
        self.dirty = false;
    }
}
