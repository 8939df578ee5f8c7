use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

use crate::memory::{Pid, Vpn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Spawn { pid: Pid, pages: Option<usize> },
    Access { pid: Pid, vpn: Vpn, write: bool },
    Read { pid: Pid, vpn: Vpn, offset: usize },
    Write { pid: Pid, vpn: Vpn, offset: usize, byte: u8 },
    Fork { parent: Pid, child: Pid },
    Terminate { pid: Pid },
    Syscall { pid: Pid, nr: u32, args: Vec<u64> },
    Trap { pid: Pid, num: u32, fault: Option<(Vpn, bool)> },
    Frames,
    Table { pid: Pid },
    Stats,
    Help,
}

pub const HELP: &str = "\
commands:
  spawn PID [PAGES]              start a process with an empty address space
  access PID VPN [read|write]    touch a page
  read PID VPN OFFSET            read one byte
  write PID VPN OFFSET BYTE      write one byte
  fork PARENT CHILD              copy-on-write fork
  terminate PID                  release a process
  syscall PID NR [ARGS..]        0=write 1=read 2=fork 3=exit
  trap PID NUM [VPN [read|write]] 0=divide 13=protection 14=page fault
  frames                         physical frames and policy order
  table PID                      page table of a process
  stats                          fault counters
  help";

struct Args<'a> {
    verb: &'a str,
    words: std::slice::Iter<'a, &'a str>,
}

impl<'a> Args<'a> {
    fn next<T>(&mut self, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let word = self
            .words
            .next()
            .ok_or_else(|| anyhow!("{}: missing {}", self.verb, what))?;
        word.parse::<T>()
            .with_context(|| format!("{}: invalid {} '{}'", self.verb, what, word))
    }

    fn optional<T>(&mut self, what: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        if self.words.as_slice().is_empty() {
            Ok(None)
        } else {
            self.next(what).map(Some)
        }
    }

    fn pid(&mut self, what: &str) -> Result<Pid> {
        self.next(what).map(Pid)
    }

    fn vpn(&mut self) -> Result<Vpn> {
        self.next("VPN").map(Vpn)
    }

    fn mode(&mut self) -> Result<bool> {
        match self.words.next().copied() {
            None | Some("read") | Some("r") => Ok(false),
            Some("write") | Some("w") => Ok(true),
            Some(other) => bail!("{}: expected read or write, got '{}'", self.verb, other),
        }
    }

    fn rest<T>(&mut self, what: &str) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let mut values = Vec::new();
        while !self.words.as_slice().is_empty() {
            values.push(self.next(what)?);
        }
        Ok(values)
    }

    fn finish(self) -> Result<()> {
        let extra: Vec<&str> = self.words.copied().collect();
        if !extra.is_empty() {
            bail!("{}: unexpected '{}'", self.verb, extra.join(" "));
        }
        Ok(())
    }
}

pub fn parse(line: &str) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, rest)) = words.split_first() else {
        bail!("empty command");
    };

    let verb = verb.to_ascii_lowercase();
    let mut args = Args {
        verb: &verb,
        words: rest.iter(),
    };

    let command = match verb.as_str() {
        "spawn" => Command::Spawn {
            pid: args.pid("PID")?,
            pages: args.optional("PAGES")?,
        },
        "access" => Command::Access {
            pid: args.pid("PID")?,
            vpn: args.vpn()?,
            write: args.mode()?,
        },
        "read" => Command::Read {
            pid: args.pid("PID")?,
            vpn: args.vpn()?,
            offset: args.next("OFFSET")?,
        },
        "write" => Command::Write {
            pid: args.pid("PID")?,
            vpn: args.vpn()?,
            offset: args.next("OFFSET")?,
            byte: args.next("BYTE")?,
        },
        "fork" => Command::Fork {
            parent: args.pid("PARENT")?,
            child: args.pid("CHILD")?,
        },
        "terminate" | "kill" => Command::Terminate {
            pid: args.pid("PID")?,
        },
        "syscall" => Command::Syscall {
            pid: args.pid("PID")?,
            nr: args.next("NR")?,
            args: args.rest("ARG")?,
        },
        "trap" => {
            let pid = args.pid("PID")?;
            let num = args.next("NUM")?;
            let fault = match args.optional("VPN")? {
                Some(vpn) => Some((Vpn(vpn), args.mode()?)),
                None => None,
            };
            Command::Trap { pid, num, fault }
        }
        "frames" => Command::Frames,
        "table" => Command::Table {
            pid: args.pid("PID")?,
        },
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        other => bail!("unknown command '{}' (try help)", other),
    };

    args.finish()?;
    Ok(command)
}
