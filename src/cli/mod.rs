//! CLI layer - Command-line interface

pub mod commands;
pub mod output;

pub use commands::{Cli, Commands, ContentCommand, EdgeCommand, ReviewCommand};
