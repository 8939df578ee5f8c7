use std::fmt::Write as _;

use anyhow::Result;

use crate::config::MemoryConfig;
use crate::kernel::{Kernel, Trap};
use crate::memory::{MemoryManager, PageTableEntry, Pid};
use crate::shell::command::{Command, HELP, parse};
use crate::vm_trace;

/// Runs harness commands against one kernel and renders each result as
/// text.
pub struct Session {
    kernel: Kernel,
}

impl Session {
    pub fn new(config: MemoryConfig) -> Result<Self> {
        Ok(Self {
            kernel: Kernel::new(config)?,
        })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn execute(&mut self, line: &str) -> Result<String> {
        let command = parse(line)?;
        vm_trace!(Shell, "{:?}", command);
        self.run(command)
    }

    pub fn run(&mut self, command: Command) -> Result<String> {
        let kernel = &self.kernel;

        let output = match command {
            Command::Spawn { pid, pages } => {
                kernel.spawn(pid, pages)?;
                let bound = kernel.lock()?.page_table(pid)?.bound();
                format!("spawned {} ({} pages)", pid, bound)
            }
            Command::Access { pid, vpn, write } => {
                let outcome = kernel.access(pid, vpn, write)?;
                let mode = if write { "write" } else { "read" };
                format!("{} {} {}: {}", pid, vpn, mode, outcome)
            }
            Command::Read { pid, vpn, offset } => {
                let (byte, outcome) = kernel.read(pid, vpn, offset)?;
                format!("{} {} [{}] = {}: {}", pid, vpn, offset, byte, outcome)
            }
            Command::Write {
                pid,
                vpn,
                offset,
                byte,
            } => {
                let outcome = kernel.write(pid, vpn, offset, byte)?;
                format!("{} {} [{}] <- {}: {}", pid, vpn, offset, byte, outcome)
            }
            Command::Fork { parent, child } => {
                kernel.fork(parent, child)?;
                format!("forked {} -> {}", parent, child)
            }
            Command::Terminate { pid } => {
                kernel.terminate(pid)?;
                format!("terminated {}", pid)
            }
            Command::Syscall { pid, nr, args } => {
                let ret = kernel.syscall(pid, nr, &args)?;
                format!("{} syscall {}: {}", pid, nr, ret)
            }
            Command::Trap { pid, num, fault } => {
                let outcome = kernel.trap(pid, Trap::from_number(num, fault)?)?;
                format!("{} trap {}: {}", pid, num, outcome)
            }
            Command::Frames => {
                let memory = kernel.lock()?;
                render_frames(&memory)
            }
            Command::Table { pid } => {
                let memory = kernel.lock()?;
                render_table(&memory, pid)?
            }
            Command::Stats => kernel.lock()?.stats().to_string(),
            Command::Help => HELP.to_string(),
        };

        Ok(output)
    }
}

fn render_frames(memory: &MemoryManager) -> String {
    let mut out = String::new();

    for frame in memory.store().frames() {
        if frame.is_free() {
            let _ = writeln!(out, "{}: free", frame.id);
            continue;
        }

        let owners: Vec<String> = frame.owners().iter().map(|k| k.to_string()).collect();
        let _ = writeln!(
            out,
            "{}: {} refs={}{}",
            frame.id,
            owners.join(" "),
            frame.ref_count(),
            if frame.dirty { " dirty" } else { "" }
        );
    }

    let order: Vec<String> = memory
        .policy_order()
        .iter()
        .map(|id| id.0.to_string())
        .collect();
    let _ = write!(
        out,
        "{} order (next victim first): [{}]",
        memory.policy_kind(),
        order.join(", ")
    );

    out
}

fn render_table(memory: &MemoryManager, pid: Pid) -> Result<String> {
    let table = memory.page_table(pid)?;
    let mut lines = Vec::new();

    for (vpn, entry) in table.entries() {
        let state = match entry {
            PageTableEntry::Unmapped => continue,
            PageTableEntry::Evicted => "evicted".to_string(),
            PageTableEntry::Resident {
                frame,
                writable,
                cow,
            } => format!(
                "{} {}{}",
                frame,
                if writable { "rw" } else { "ro" },
                if cow { " cow" } else { "" }
            ),
        };
        lines.push(format!("  {}: {}", vpn, state));
    }

    if lines.is_empty() {
        return Ok(format!("{}: no pages touched", pid));
    }

    Ok(format!("{} ({} pages):\n{}", pid, table.bound(), lines.join("\n")))
}
