use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl DebugLevel {
    pub fn from_u8(level: u8) -> Self {
        match level {
            0 => DebugLevel::Off,
            1 => DebugLevel::Error,
            2 => DebugLevel::Warn,
            3 => DebugLevel::Info,
            4 => DebugLevel::Debug,
            _ => DebugLevel::Trace,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "OFF" => Some(DebugLevel::Off),
            "ERROR" => Some(DebugLevel::Error),
            "WARN" => Some(DebugLevel::Warn),
            "INFO" => Some(DebugLevel::Info),
            "DEBUG" => Some(DebugLevel::Debug),
            "TRACE" => Some(DebugLevel::Trace),
            _ => None,
        }
    }
}

/// Subsystems that tag their log lines. Each one can be muted separately.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Component {
    Mm = 0,
    Frames = 1,
    Kernel = 2,
    Shell = 3,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Mm,
        Component::Frames,
        Component::Kernel,
        Component::Shell,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::Mm => "mm",
            Component::Frames => "frames",
            Component::Kernel => "kernel",
            Component::Shell => "shell",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL_COMPONENTS: u8 = 0b1111;

pub static DEBUG_LEVEL: AtomicU8 = AtomicU8::new(DebugLevel::Off as u8);
pub static COMPONENTS: AtomicU8 = AtomicU8::new(ALL_COMPONENTS);

thread_local! {
    static INDENT: Cell<usize> = const { Cell::new(0) };
}

pub fn set_debug_level(level: DebugLevel) {
    DEBUG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_debug_level() -> DebugLevel {
    DebugLevel::from_u8(DEBUG_LEVEL.load(Ordering::Relaxed))
}

/// Restricts logging to `components`. An empty slice mutes everything.
pub fn set_components(components: &[Component]) {
    let mask = components.iter().fold(0, |mask, c| mask | c.bit());
    COMPONENTS.store(mask, Ordering::Relaxed);
}

pub fn enable_all_components() {
    COMPONENTS.store(ALL_COMPONENTS, Ordering::Relaxed);
}

#[inline]
pub fn should_log(level: DebugLevel, component: Component) -> bool {
    level != DebugLevel::Off
        && (level as u8) <= DEBUG_LEVEL.load(Ordering::Relaxed)
        && COMPONENTS.load(Ordering::Relaxed) & component.bit() != 0
}

pub fn indent() {
    INDENT.with(|depth| depth.set(depth.get() + 1));
}

pub fn dedent() {
    INDENT.with(|depth| depth.set(depth.get().saturating_sub(1)));
}

pub fn format_indent() -> String {
    INDENT.with(|depth| "  ".repeat(depth.get()))
}

pub mod color {
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const BLUE: &str = "\x1b[34m";
    pub const GRAY: &str = "\x1b[90m";
    pub const RESET: &str = "\x1b[0m";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level_and_component() {
        set_debug_level(DebugLevel::Warn);
        set_components(&[Component::Shell, Component::Kernel]);

        assert!(should_log(DebugLevel::Warn, Component::Shell));
        assert!(should_log(DebugLevel::Error, Component::Kernel));
        assert!(!should_log(DebugLevel::Info, Component::Shell));
        assert!(!should_log(DebugLevel::Warn, Component::Mm));
        assert!(!should_log(DebugLevel::Off, Component::Shell));

        enable_all_components();
        assert!(should_log(DebugLevel::Warn, Component::Frames));

        set_debug_level(DebugLevel::Off);
        assert!(!should_log(DebugLevel::Error, Component::Mm));
    }

    #[test]
    fn component_names_round_trip() {
        for component in Component::ALL {
            assert_eq!(Component::from_name(component.name()), Some(component));
        }
        assert_eq!(Component::from_name("FRAMES"), Some(Component::Frames));
        assert_eq!(Component::from_name("policy"), None);
    }
}
