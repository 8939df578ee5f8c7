use anyhow::{Context, Result, bail};

use crate::debugger::Component;
use crate::memory::replacement::PolicyKind;

pub const DEFAULT_FRAMES: usize = 5;
pub const DEFAULT_PAGE_SIZE: usize = 256;
pub const DEFAULT_ADDRESS_SPACE_PAGES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Physical frames available to every process combined
    pub frames: usize,

    /// Bytes per page and per frame
    pub page_size: usize,

    pub policy: PolicyKind,

    /// Virtual pages given to a process spawned without an explicit size
    pub address_space_pages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            page_size: DEFAULT_PAGE_SIZE,
            policy: PolicyKind::Fifo,
            address_space_pages: DEFAULT_ADDRESS_SPACE_PAGES,
        }
    }
}

impl MemoryConfig {
    pub fn new(frames: usize, policy: PolicyKind) -> Self {
        Self {
            frames,
            policy,
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_address_space(mut self, pages: usize) -> Self {
        self.address_space_pages = pages;
        self
    }

    /// Reads `--frames=N`, `--policy=fifo|lru`, `--page-size=N` and
    /// `--pages=N`. `--debug=N` and `--log=...` are skipped; the binary
    /// handles them.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();

        for arg in args {
            let arg = arg.as_ref();
            let Some((flag, value)) = arg.split_once('=') else {
                bail!("expected --flag=value, got '{}'", arg);
            };

            match flag {
                "--frames" => config.frames = parse_count(flag, value)?,
                "--page-size" => config.page_size = parse_count(flag, value)?,
                "--pages" => config.address_space_pages = parse_count(flag, value)?,
                "--policy" => config.policy = value.parse()?,
                "--debug" | "--log" => {}
                other => bail!("unknown option '{}'", other),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames == 0 {
            bail!("frame count must be at least 1");
        }
        if self.page_size == 0 {
            bail!("page size must be at least 1 byte");
        }
        if self.address_space_pages == 0 {
            bail!("address space must have at least 1 page");
        }
        Ok(())
    }
}

/// Parses a `--log=mm,kernel` component list.
pub fn parse_components(value: &str) -> Result<Vec<Component>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Component::from_name(name).with_context(|| format!("unknown log component '{}'", name))
        })
        .collect()
}

fn parse_count(flag: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .with_context(|| format!("{} expects a number, got '{}'", flag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_flags() {
        let config = MemoryConfig::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(config, MemoryConfig::default());
    }

    #[test]
    fn parses_all_flags() {
        let config = MemoryConfig::from_args([
            "--frames=3",
            "--policy=LRU",
            "--page-size=64",
            "--pages=8",
            "--debug=4",
            "--log=mm",
        ])
        .unwrap();

        assert_eq!(config.frames, 3);
        assert_eq!(config.policy, PolicyKind::Lru);
        assert_eq!(config.page_size, 64);
        assert_eq!(config.address_space_pages, 8);
    }

    #[test]
    fn parses_log_components() {
        assert_eq!(
            parse_components("mm, Kernel").unwrap(),
            vec![Component::Mm, Component::Kernel]
        );
        assert!(parse_components("").unwrap().is_empty());
        assert!(parse_components("mm,disk").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(MemoryConfig::from_args(["--frames=0"]).is_err());
        assert!(MemoryConfig::from_args(["--frames=many"]).is_err());
        assert!(MemoryConfig::from_args(["--policy=clock"]).is_err());
        assert!(MemoryConfig::from_args(["--verbose"]).is_err());
        assert!(MemoryConfig::from_args(["--color=always"]).is_err());
    }
}
