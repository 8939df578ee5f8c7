use std::fmt;

use anyhow::{Result, bail};

use crate::memory::{AccessOutcome, MemoryError, MemoryManager, Pid, Vpn};
use crate::{vm_info, vm_warn};

pub const TRAP_DIVIDE_BY_ZERO: u32 = 0;
pub const TRAP_GENERAL_PROTECTION: u32 = 13;
pub const TRAP_PAGE_FAULT: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    DivideByZero,
    GeneralProtection,
    PageFault { vpn: Vpn, write: bool },
}

impl Trap {
    /// Decodes an x86-style trap number. Page faults need the faulting page.
    pub fn from_number(num: u32, fault: Option<(Vpn, bool)>) -> Result<Self> {
        match (num, fault) {
            (TRAP_DIVIDE_BY_ZERO, _) => Ok(Trap::DivideByZero),
            (TRAP_GENERAL_PROTECTION, _) => Ok(Trap::GeneralProtection),
            (TRAP_PAGE_FAULT, Some((vpn, write))) => Ok(Trap::PageFault { vpn, write }),
            (TRAP_PAGE_FAULT, None) => bail!("page fault trap needs a faulting page"),
            (other, _) => bail!("unhandled trap {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapOutcome {
    Resolved(AccessOutcome),
    Killed { pid: Pid, reason: String },
}

impl fmt::Display for TrapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapOutcome::Resolved(outcome) => write!(f, "resolved: {}", outcome),
            TrapOutcome::Killed { pid, reason } => write!(f, "killed {}: {}", pid, reason),
        }
    }
}

/// Page faults go to the memory manager; anything fatal terminates the
/// process.
pub fn handle_trap(memory: &mut MemoryManager, pid: Pid, trap: Trap) -> Result<TrapOutcome> {
    let reason = match trap {
        Trap::PageFault { vpn, write } => match memory.access(pid, vpn, write) {
            Ok(outcome) => return Ok(TrapOutcome::Resolved(outcome)),
            Err(err @ MemoryError::InvalidPage { .. }) => format!("segmentation fault ({})", err),
            Err(err) => return Err(err.into()),
        },
        Trap::DivideByZero => "divide by zero".to_string(),
        Trap::GeneralProtection => "general protection fault".to_string(),
    };

    vm_warn!(Kernel, "{} trapped: {}", pid, reason);
    memory.terminate(pid)?;
    vm_info!(Kernel, "{} killed", pid);

    Ok(TrapOutcome::Killed { pid, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MemoryConfig, memory::PolicyKind};

    fn memory() -> MemoryManager {
        let config = MemoryConfig::new(2, PolicyKind::Lru).with_address_space(4);
        let mut mm = MemoryManager::new(config).unwrap();
        mm.spawn(Pid(1)).unwrap();
        mm
    }

    #[test]
    fn decodes_trap_numbers() {
        assert_eq!(Trap::from_number(0, None).unwrap(), Trap::DivideByZero);
        assert_eq!(Trap::from_number(13, None).unwrap(), Trap::GeneralProtection);
        assert_eq!(
            Trap::from_number(14, Some((Vpn(2), true))).unwrap(),
            Trap::PageFault {
                vpn: Vpn(2),
                write: true
            }
        );
        assert!(Trap::from_number(14, None).is_err());
        assert!(Trap::from_number(6, None).is_err());
    }

    #[test]
    fn page_fault_is_resolved() {
        let mut mm = memory();
        let outcome = handle_trap(
            &mut mm,
            Pid(1),
            Trap::PageFault {
                vpn: Vpn(1),
                write: false,
            },
        )
        .unwrap();

        assert!(matches!(
            outcome,
            TrapOutcome::Resolved(AccessOutcome::Fault { .. })
        ));
    }

    #[test]
    fn bad_page_and_fatal_traps_kill() {
        let mut mm = memory();
        mm.access(Pid(1), Vpn(0), true).unwrap();

        let outcome = handle_trap(
            &mut mm,
            Pid(1),
            Trap::PageFault {
                vpn: Vpn(9),
                write: false,
            },
        )
        .unwrap();
        assert!(matches!(outcome, TrapOutcome::Killed { pid: Pid(1), .. }));
        assert!(!mm.contains_process(Pid(1)));
        assert_eq!(mm.store().occupied_count(), 0);

        mm.spawn(Pid(2)).unwrap();
        let outcome = handle_trap(&mut mm, Pid(2), Trap::GeneralProtection).unwrap();
        assert!(matches!(outcome, TrapOutcome::Killed { .. }));

        assert!(handle_trap(&mut mm, Pid(2), Trap::DivideByZero).is_err());
    }
}
