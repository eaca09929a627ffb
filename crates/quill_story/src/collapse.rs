//! Flattening of embedded content into a single stream.

use crate::{BoxedThread, OutputKind, Step, Story, StoryOutput};
use quill_error::{QuillResult, StoryError, StoryErrorKind};
use std::rc::Rc;
use tracing::{debug, warn};

struct Frame {
    thread: BoxedThread,
    embed: Option<Rc<StoryOutput>>,
}

/// A thread with every embedded passage and fragment flattened in.
///
/// Each embed is yielded before its content so the story can fire the
/// embed's cues first. Items are tagged with the innermost embed that
/// produced them. Nesting is bounded by `max_depth`.
pub struct CollapsedThread {
    frames: Vec<Frame>,
    pending: Option<StoryOutput>,
    max_depth: usize,
}

impl CollapsedThread {
    /// Wraps a root thread.
    pub fn new(root: BoxedThread, max_depth: usize) -> Self {
        Self {
            frames: vec![Frame {
                thread: root,
                embed: None,
            }],
            pending: None,
            max_depth,
        }
    }

    /// Current embed nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Pulls the next step of the flattened stream.
    ///
    /// # Errors
    ///
    /// Fails if an embedded passage does not exist, if nesting exceeds the
    /// configured depth, or if content itself fails.
    pub fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>> {
        if let Some(embed) = self.pending.take() {
            self.open_embed(embed, story)?;
        }

        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };
            match frame.thread.next(story)? {
                None => {
                    if let Some(mut finished) = self.frames.pop() {
                        finished.thread.dispose(story)?;
                    }
                }
                Some(Step::Skip) => return Ok(Some(Step::Skip)),
                Some(Step::Output(mut output)) => {
                    if let Some(embed) = &frame.embed {
                        output.tag_embed(embed);
                    }
                    if output.is_embed() {
                        self.pending = Some(output.clone());
                    }
                    return Ok(Some(Step::Output(output)));
                }
            }
        }
    }

    /// Disposes every open frame, innermost first.
    pub fn dispose(&mut self, story: &mut Story) -> QuillResult<()> {
        self.pending = None;
        let mut first_error = None;
        while let Some(mut frame) = self.frames.pop() {
            if let Err(err) = frame.thread.dispose(story) {
                warn!(error = %err, "Failed to dispose thread frame");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn open_embed(&mut self, embed: StoryOutput, story: &mut Story) -> QuillResult<()> {
        let label = embed
            .embedded_passage_name()
            .map_or_else(|| "fragment".to_string(), str::to_string);

        if self.depth() >= self.max_depth {
            return Err(StoryError::new(StoryErrorKind::EmbedDepthExceeded {
                passage: label,
                depth: self.max_depth,
            })
            .into());
        }

        let thread = match embed.kind() {
            OutputKind::EmbedPassage(passage) => story
                .passage(passage.passage_name())?
                .main_thread(passage.parameters()),
            OutputKind::EmbedFragment(fragment) => (fragment.action())(),
            _ => return Ok(()),
        };

        debug!(embed = %label, depth = self.depth() + 1, "Opening embedded content");
        self.frames.push(Frame {
            thread,
            embed: Some(Rc::new(embed)),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PassageRegistry, Sequence, thread};
    use quill_core::Style;

    fn pull_all(thread: &mut CollapsedThread, story: &mut Story) -> Vec<String> {
        let mut labels = Vec::new();
        while let Some(step) = thread.next(story).unwrap() {
            if let Step::Output(output) = step {
                labels.push(output.text().unwrap_or(output.kind_name()).to_string());
            }
        }
        labels
    }

    #[test]
    fn test_fragment_content_follows_its_embed() {
        let mut story = Story::new(PassageRegistry::new());
        let root = thread::from_outputs(vec![
            StoryOutput::from_text("a"),
            StoryOutput::embed_fragment(|| Sequence::new().text("b").boxed()),
            StoryOutput::from_text("c"),
        ]);
        let mut collapsed = CollapsedThread::new(root, 4);

        assert_eq!(
            pull_all(&mut collapsed, &mut story),
            vec!["a", "EmbedFragment", "b", "c"]
        );
        assert_eq!(collapsed.depth(), 0);
    }

    #[test]
    fn test_missing_passage_is_not_found() {
        let mut story = Story::new(PassageRegistry::new());
        let root = Sequence::new().embed_passage("Nowhere", Vec::new()).boxed();
        let mut collapsed = CollapsedThread::new(root, 4);

        assert!(collapsed.next(&mut story).unwrap().is_some());
        let err = collapsed.next(&mut story).unwrap_err();
        assert!(err.story_kind().is_some_and(StoryErrorKind::is_not_found));
    }

    #[test]
    fn test_dispose_releases_open_frames() {
        let mut story = Story::new(PassageRegistry::new());
        let root = Sequence::new()
            .embed_fragment(|| {
                Sequence::new()
                    .styled(
                        Style::pair("color", "red"),
                        Sequence::new().text("x").text("y"),
                    )
                    .boxed()
            })
            .boxed();
        let mut collapsed = CollapsedThread::new(root, 4);

        collapsed.next(&mut story).unwrap();
        collapsed.next(&mut story).unwrap();
        assert_eq!(collapsed.depth(), 1);
        assert!(!story.current_style().is_empty());

        collapsed.dispose(&mut story).unwrap();
        assert!(story.current_style().is_empty());
        assert!(collapsed.next(&mut story).unwrap().is_none());
    }
}
