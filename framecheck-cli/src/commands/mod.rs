//! Subcommand implementations

pub mod directed;
pub mod expect;
pub mod run;
