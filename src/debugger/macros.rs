/// Logs under a `Component` variant named bare, e.g. `vm_log!(level, Mm, ...)`.
#[macro_export]
macro_rules! vm_log {
    ($level:expr, $component:ident, $($arg:tt)*) => {{
        let component = $crate::debugger::Component::$component;
        if $crate::debugger::debugger::should_log($level, component) {
            use $crate::debugger::debugger::color::*;
            let indent = $crate::debugger::debugger::format_indent();
            let level_str = match $level {
                $crate::debugger::DebugLevel::Error => format!("{}ERROR{}", RED, RESET),
                $crate::debugger::DebugLevel::Warn => format!("{}WARN{}", YELLOW, RESET),
                $crate::debugger::DebugLevel::Info => format!("{}INFO{}", GREEN, RESET),
                $crate::debugger::DebugLevel::Debug => format!("{}DEBUG{}", BLUE, RESET),
                $crate::debugger::DebugLevel::Trace => format!("{}TRACE{}", GRAY, RESET),
                $crate::debugger::DebugLevel::Off => String::new(),
            };
            eprintln!("{}{} [{}] {}", indent, level_str, component, format!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! vm_error {
    ($component:ident, $($arg:tt)*) => {
        $crate::vm_log!($crate::debugger::DebugLevel::Error, $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! vm_warn {
    ($component:ident, $($arg:tt)*) => {
        $crate::vm_log!($crate::debugger::DebugLevel::Warn, $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! vm_info {
    ($component:ident, $($arg:tt)*) => {
        $crate::vm_log!($crate::debugger::DebugLevel::Info, $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! vm_debug {
    ($component:ident, $($arg:tt)*) => {
        $crate::vm_log!($crate::debugger::DebugLevel::Debug, $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! vm_trace {
    ($component:ident, $($arg:tt)*) => {
        $crate::vm_log!($crate::debugger::DebugLevel::Trace, $component, $($arg)*)
    };
}

/// Brackets `$body` with enter/leave lines and indents everything logged
/// inside it. Used around page faults and COW breaks.
#[macro_export]
macro_rules! vm_scope {
    ($level:expr, $component:ident, $name:expr, $body:block) => {{
        let scoped =
            $crate::debugger::debugger::should_log($level, $crate::debugger::Component::$component);
        if scoped {
            $crate::vm_log!($level, $component, "→ {}", $name);
            $crate::debugger::debugger::indent();
        }

        let result = $body;

        if scoped {
            $crate::debugger::debugger::dedent();
            $crate::vm_log!($level, $component, "← {}", $name);
        }

        result
    }};
}
