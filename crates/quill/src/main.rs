//! Quill CLI binary.
//!
//! Plays the built-in demo story in the terminal.

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, list_passages, play_demo};

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Play { config } => play_demo(config.as_deref())?,
        Commands::Passages { tag } => list_passages(tag.as_deref()),
    }

    #[cfg(feature = "observability")]
    quill::shutdown_observability();

    Ok(())
}

#[cfg(feature = "observability")]
fn init_logging(args: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = quill::ObservabilityConfig::new("quill")
        .with_json_logs(args.json_logs)
        .with_span_export(args.export_spans);
    if args.verbose {
        config = config.with_log_level("debug");
    }
    quill::init_observability_with_config(config)
}

#[cfg(not(feature = "observability"))]
fn init_logging(args: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    if args.export_spans {
        tracing::warn!("Span export requires the observability feature");
    }
    Ok(())
}
