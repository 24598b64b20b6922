//! Boundary crate for the attendance kiosk: CLI definitions, configuration,
//! and the spreadsheet report projection.

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands, ExportTarget, MemberAction};
pub use config::Config;
