pub mod config;
pub mod debugger;

pub mod kernel;
pub mod memory;
pub mod shell;
