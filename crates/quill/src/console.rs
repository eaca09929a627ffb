//! Line-oriented console player.
//!
//! Each turn prints the passage text followed by a numbered list of links and
//! reads one line: a link number follows that link, `q` or end of input quits.

use quill_error::QuillResult;
use quill_story::{Story, StoryState};
use std::io::{BufRead, Write};
use tracing::{debug, info, instrument};

/// Plays `story` from its start passage until no links remain or the reader quits.
///
/// Returns the number of links followed.
///
/// # Errors
///
/// Returns story errors raised by playback and I/O errors from either stream.
#[instrument(skip_all)]
pub fn play<R, W>(story: &mut Story, input: R, mut output: W) -> Result<usize, Box<dyn std::error::Error>>
where
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    let mut turns = 0;
    story.begin()?;

    loop {
        settle(story)?;
        render(story, &mut output)?;

        let links = story.current_links().len();
        if links == 0 {
            writeln!(output, "The end.")?;
            break;
        }
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            debug!("Input closed");
            break;
        };
        let line = line?;
        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            break;
        }
        match choice.parse::<usize>() {
            Ok(number) if (1..=links).contains(&number) => {
                story.do_link(number - 1)?;
                turns += 1;
            }
            _ => writeln!(output, "Choose 1-{} or q.", links)?,
        }
    }

    info!(turns, passage = ?story.current_passage(), "Console session finished");
    Ok(turns)
}

/// Resumes until nothing is holding playback paused.
fn settle(story: &mut Story) -> QuillResult<()> {
    while story.state() == StoryState::Paused {
        story.resume()?;
    }
    Ok(())
}

fn render<W: Write>(story: &Story, output: &mut W) -> std::io::Result<()> {
    writeln!(output, "{}", story.current_text().trim_end())?;
    for (number, link) in story.current_links().iter().enumerate() {
        writeln!(output, "  {}. {}", number + 1, link.name().unwrap_or_default())?;
    }
    Ok(())
}
