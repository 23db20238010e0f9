//! CLI subcommand implementations.

pub mod days;
pub mod location;
pub mod record;
pub mod status;
