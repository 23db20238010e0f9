//! Mechanic's logbook CLI library.
//!
//! This crate provides the CLI interface for live recording sessions.

mod cli;
pub mod commands;
mod config;
pub mod session;

pub use cli::{Cli, Commands, KindArg};
pub use config::Config;
