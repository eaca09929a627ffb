//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill - branching-narrative playback
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Play branching-narrative stories in the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export tracing spans to stdout (requires the `observability` feature)
    #[arg(long, global = true)]
    pub export_spans: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play the built-in demo story
    Play {
        /// Story configuration TOML file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the demo story's passages
    Passages {
        /// Only passages with this tag
        #[arg(long)]
        tag: Option<String>,
    },
}
