use std::collections::HashMap;

use crate::memory::ids::{Pid, PageKey};

/// Secondary storage for evicted pages.
///
/// Reads and writes always complete; a page never written here faults in
/// zero-filled.
#[derive(Debug, Default)]
pub struct BackingStore {
    pages: HashMap<PageKey, Box<[u8]>>,
}

impl BackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_page(&mut self, key: PageKey, data: &[u8]) {
        self.pages.insert(key, data.into());
    }

    pub fn read_page(&self, key: PageKey) -> Option<&[u8]> {
        self.pages.get(&key).map(|data| &data[..])
    }

    pub fn contains(&self, key: PageKey) -> bool {
        self.pages.contains_key(&key)
    }

    /// Gives `to` its own copy of whatever `from` has saved.
    pub fn duplicate(&mut self, from: PageKey, to: PageKey) {
        if let Some(data) = self.pages.get(&from).cloned() {
            self.pages.insert(to, data);
        }
    }

    pub fn purge_process(&mut self, pid: Pid) -> usize {
        let before = self.pages.len();
        self.pages.retain(|key, _| key.pid != pid);
        before - self.pages.len()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
