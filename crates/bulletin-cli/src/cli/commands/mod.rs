//! CLI command handlers.

pub mod config;
pub mod newsletters;
pub mod watch;
