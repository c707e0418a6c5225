//! Subcommand implementations

pub mod diagram;
pub mod validate;
