//! Demo story commands.

use quill::{Story, StoryConfig, console, demo};
use std::io;
use std::path::Path;
use tracing::info;

/// Plays the demo story on stdin/stdout.
pub fn play_demo(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => StoryConfig::from_file(path)?,
        None => StoryConfig::default(),
    };
    info!(start = %config.start_passage(), "Starting demo story");

    let mut story = Story::new(demo::passages()).with_config(config);
    let stdin = io::stdin();
    console::play(&mut story, stdin.lock(), io::stdout().lock())?;
    Ok(())
}

/// Prints the demo story's passage names, optionally filtered by tag.
pub fn list_passages(tag: Option<&str>) {
    let passages = demo::passages();
    let mut names: Vec<String> = match tag {
        Some(tag) => passages.passages_with_tag(tag),
        None => passages.names().map(str::to_string).collect(),
    };
    names.sort();
    for name in names {
        println!("{}", name);
    }
}
