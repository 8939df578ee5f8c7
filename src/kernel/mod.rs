//! Simulated kernel services that call into the memory manager.
//!
//! Every entry point takes the memory lock once, so a fault, its eviction
//! and the load that follows are never interleaved with another fault.

pub mod syscall;
pub mod trap;

use std::sync::MutexGuard;

use anyhow::{Result, anyhow};

use crate::config::MemoryConfig;
use crate::memory::{AccessOutcome, MemoryHandle, MemoryManager, Pid, Vpn};

pub use syscall::{Syscall, SyscallReturn, SyscallTable};
pub use trap::{Trap, TrapOutcome, handle_trap};

pub struct Kernel {
    memory: MemoryHandle,
    syscalls: SyscallTable,
}

impl Kernel {
    pub fn new(config: MemoryConfig) -> Result<Self> {
        let memory = MemoryManager::new(config)?.into_handle();
        Ok(Self::with_memory(memory))
    }

    pub fn with_memory(memory: MemoryHandle) -> Self {
        Self {
            memory,
            syscalls: SyscallTable::default(),
        }
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory.clone()
    }

    pub fn syscalls(&self) -> &SyscallTable {
        &self.syscalls
    }

    pub fn syscalls_mut(&mut self) -> &mut SyscallTable {
        &mut self.syscalls
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, MemoryManager>> {
        self.memory
            .lock()
            .map_err(|_| anyhow!("memory manager lock poisoned"))
    }

    pub fn spawn(&self, pid: Pid, pages: Option<usize>) -> Result<()> {
        let mut memory = self.lock()?;
        match pages {
            Some(pages) => memory.spawn_with_pages(pid, pages)?,
            None => memory.spawn(pid)?,
        }
        Ok(())
    }

    pub fn access(&self, pid: Pid, vpn: Vpn, is_write: bool) -> Result<AccessOutcome> {
        Ok(self.lock()?.access(pid, vpn, is_write)?)
    }

    pub fn read(&self, pid: Pid, vpn: Vpn, offset: usize) -> Result<(u8, AccessOutcome)> {
        Ok(self.lock()?.read(pid, vpn, offset)?)
    }

    pub fn write(&self, pid: Pid, vpn: Vpn, offset: usize, byte: u8) -> Result<AccessOutcome> {
        Ok(self.lock()?.write(pid, vpn, offset, byte)?)
    }

    pub fn fork(&self, parent: Pid, child: Pid) -> Result<()> {
        Ok(self.lock()?.fork(parent, child)?)
    }

    pub fn terminate(&self, pid: Pid) -> Result<()> {
        Ok(self.lock()?.terminate(pid)?)
    }

    pub fn syscall(&self, pid: Pid, nr: u32, args: &[u64]) -> Result<SyscallReturn> {
        let mut memory = self.lock()?;
        self.syscalls.dispatch(&mut memory, pid, nr, args)
    }

    pub fn trap(&self, pid: Pid, trap: Trap) -> Result<TrapOutcome> {
        let mut memory = self.lock()?;
        handle_trap(&mut memory, pid, trap)
    }
}
