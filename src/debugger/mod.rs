pub mod debugger;
mod macros;

pub use debugger::{
    Component, DebugLevel, enable_all_components, get_debug_level, set_components,
    set_debug_level,
};
