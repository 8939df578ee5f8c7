use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result, bail};
use maplit::btreemap;

use crate::memory::{AccessOutcome, MemoryManager, Pid, Vpn};
use crate::vm_debug;

/// Syscall numbers at or above this are rejected at registration.
pub const SYSCALL_LIMIT: u32 = 64;

pub const SYS_WRITE: u32 = 0;
pub const SYS_READ: u32 = 1;
pub const SYS_FORK: u32 = 2;
pub const SYS_EXIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// `write(vpn, offset, byte)`
    Write,
    /// `read(vpn, offset)`
    Read,
    /// `fork(child_pid)`
    Fork,
    /// `exit()`
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyscallReturn {
    Written(AccessOutcome),
    Read { byte: u8, outcome: AccessOutcome },
    Forked { child: Pid },
    Exited,
}

impl Syscall {
    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Write => "write",
            Syscall::Read => "read",
            Syscall::Fork => "fork",
            Syscall::Exit => "exit",
        }
    }

    fn arity(&self) -> usize {
        match self {
            Syscall::Write => 3,
            Syscall::Read => 2,
            Syscall::Fork => 1,
            Syscall::Exit => 0,
        }
    }

    pub fn execute(&self, memory: &mut MemoryManager, pid: Pid, args: &[u64]) -> Result<SyscallReturn> {
        if args.len() != self.arity() {
            bail!(
                "sys_{} takes {} argument(s), got {}",
                self.name(),
                self.arity(),
                args.len()
            );
        }

        let ret = match self {
            Syscall::Write => {
                let offset = usize::try_from(args[1]).context("offset out of range")?;
                let byte = u8::try_from(args[2]).context("sys_write stores a single byte")?;
                SyscallReturn::Written(memory.write(pid, Vpn(args[0]), offset, byte)?)
            }
            Syscall::Read => {
                let offset = usize::try_from(args[1]).context("offset out of range")?;
                let (byte, outcome) = memory.read(pid, Vpn(args[0]), offset)?;
                SyscallReturn::Read { byte, outcome }
            }
            Syscall::Fork => {
                let child = Pid(u32::try_from(args[0]).context("child pid out of range")?);
                memory.fork(pid, child)?;
                SyscallReturn::Forked { child }
            }
            Syscall::Exit => {
                memory.terminate(pid)?;
                SyscallReturn::Exited
            }
        };

        Ok(ret)
    }
}

impl fmt::Display for SyscallReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallReturn::Written(outcome) => write!(f, "written ({})", outcome),
            SyscallReturn::Read { byte, outcome } => write!(f, "read {} ({})", byte, outcome),
            SyscallReturn::Forked { child } => write!(f, "forked {}", child),
            SyscallReturn::Exited => write!(f, "exited"),
        }
    }
}

/// Syscall number to handler. Numbers are checked when registered, so
/// dispatch never indexes past the table.
#[derive(Debug, Clone)]
pub struct SyscallTable {
    entries: BTreeMap<u32, Syscall>,
    limit: u32,
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self {
            entries: btreemap! {
                SYS_WRITE => Syscall::Write,
                SYS_READ => Syscall::Read,
                SYS_FORK => Syscall::Fork,
                SYS_EXIT => Syscall::Exit,
            },
            limit: SYSCALL_LIMIT,
        }
    }
}

impl SyscallTable {
    pub fn empty(limit: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            limit,
        }
    }

    pub fn register(&mut self, nr: u32, syscall: Syscall) -> Result<()> {
        if nr >= self.limit {
            bail!("syscall number {} outside table of {} slots", nr, self.limit);
        }
        if let Some(existing) = self.entries.get(&nr) {
            bail!("syscall {} already bound to sys_{}", nr, existing.name());
        }

        self.entries.insert(nr, syscall);
        Ok(())
    }

    pub fn get(&self, nr: u32) -> Option<Syscall> {
        self.entries.get(&nr).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, Syscall)> + '_ {
        self.entries.iter().map(|(nr, syscall)| (*nr, *syscall))
    }

    pub fn dispatch(
        &self,
        memory: &mut MemoryManager,
        pid: Pid,
        nr: u32,
        args: &[u64],
    ) -> Result<SyscallReturn> {
        let Some(syscall) = self.get(nr) else {
            bail!("unknown syscall {}", nr);
        };

        vm_debug!(Kernel, "{} calls sys_{}{:?}", pid, syscall.name(), args);
        syscall
            .execute(memory, pid, args)
            .with_context(|| format!("sys_{} failed for {}", syscall.name(), pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MemoryConfig, memory::PolicyKind};

    fn memory() -> MemoryManager {
        let mut mm = MemoryManager::new(MemoryConfig::new(2, PolicyKind::Fifo)).unwrap();
        mm.spawn(Pid(1)).unwrap();
        mm
    }

    #[test]
    fn registration_rejects_out_of_range_and_duplicates() {
        let mut table = SyscallTable::empty(4);

        assert!(table.register(4, Syscall::Read).is_err());
        table.register(3, Syscall::Read).unwrap();
        assert!(table.register(3, Syscall::Write).is_err());
        assert_eq!(table.get(3), Some(Syscall::Read));
    }

    #[test]
    fn defaults_cover_memory_calls() {
        let table = SyscallTable::default();
        let numbers: Vec<u32> = table.entries().map(|(nr, _)| nr).collect();
        assert_eq!(numbers, vec![SYS_WRITE, SYS_READ, SYS_FORK, SYS_EXIT]);
    }

    #[test]
    fn dispatch_drives_memory_manager() {
        let table = SyscallTable::default();
        let mut mm = memory();

        table.dispatch(&mut mm, Pid(1), SYS_WRITE, &[0, 4, 200]).unwrap();
        table.dispatch(&mut mm, Pid(1), SYS_FORK, &[2]).unwrap();

        match table.dispatch(&mut mm, Pid(2), SYS_READ, &[0, 4]).unwrap() {
            SyscallReturn::Read { byte, .. } => assert_eq!(byte, 200),
            other => panic!("expected read, got {:?}", other),
        }

        assert_eq!(
            table.dispatch(&mut mm, Pid(2), SYS_EXIT, &[]).unwrap(),
            SyscallReturn::Exited
        );
        assert!(!mm.contains_process(Pid(2)));
    }

    #[test]
    fn dispatch_rejects_bad_calls() {
        let table = SyscallTable::default();
        let mut mm = memory();

        assert!(table.dispatch(&mut mm, Pid(1), 40, &[]).is_err());
        assert!(table.dispatch(&mut mm, Pid(1), SYS_READ, &[0]).is_err());
        assert!(table.dispatch(&mut mm, Pid(1), SYS_WRITE, &[0, 0, 300]).is_err());
        assert!(table.dispatch(&mut mm, Pid(7), SYS_EXIT, &[]).is_err());
        mm.check_invariants().unwrap();
    }
}
