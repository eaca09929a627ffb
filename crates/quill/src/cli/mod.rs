//! Command-line interface module.

mod commands;
mod play;

pub use commands::{Cli, Commands};
pub use play::{list_passages, play_demo};
