pub mod command;
pub mod session;
pub mod unit_tests;

pub use command::{Command, parse};
pub use session::Session;
