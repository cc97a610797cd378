//! CLI module for tidal-bridge.

pub mod args;
pub mod commands;

pub use args::{AuthCommands, Cli, Commands};
