//! Pull-based content sequences.
//!
//! A thread is a one-shot sequence of output items. Passages and link or
//! fragment actions are factories producing a fresh thread each time they
//! run; the story pulls items one at a time and may stop pulling at any
//! point, in which case [`StoryThread::dispose`] releases whatever the
//! thread holds (open style scopes, insertion points).

use crate::{Link, Story, StoryOutput};
use quill_core::{Style, StyleScope};
use quill_error::QuillResult;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fmt;

/// One pull from a thread.
#[derive(Debug, Clone)]
pub enum Step {
    /// An output item
    Output(StoryOutput),
    /// Nothing this pull; the story keeps pulling
    Skip,
}

/// A lazily produced sequence of output items.
pub trait StoryThread {
    /// Produces the next step, or `None` once the thread is exhausted.
    ///
    /// # Errors
    ///
    /// Content errors (unknown passages, misused style scopes) stop playback
    /// and propagate to the story's caller.
    fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>>;

    /// Releases resources when the thread ends or is abandoned early.
    fn dispose(&mut self, _story: &mut Story) -> QuillResult<()> {
        Ok(())
    }
}

/// Owned, type-erased thread.
pub type BoxedThread = Box<dyn StoryThread>;

/// A thread that produces nothing.
pub fn empty() -> BoxedThread {
    Box::new(Sequence::new())
}

/// A thread over already-built outputs.
pub fn from_outputs<I>(outputs: I) -> BoxedThread
where
    I: IntoIterator<Item = StoryOutput>,
    I::IntoIter: 'static,
{
    Box::new(Outputs(outputs.into_iter()))
}

/// A thread driven by a closure, called once per pull until it returns `None`.
pub fn from_fn<F>(f: F) -> BoxedThread
where
    F: FnMut(&mut Story) -> Option<Step> + 'static,
{
    Box::new(FromFn(f))
}

struct Outputs<I>(I);

impl<I: Iterator<Item = StoryOutput>> StoryThread for Outputs<I> {
    fn next(&mut self, _story: &mut Story) -> QuillResult<Option<Step>> {
        Ok(self.0.next().map(Step::Output))
    }
}

struct FromFn<F>(F);

impl<F: FnMut(&mut Story) -> Option<Step>> StoryThread for FromFn<F> {
    fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>> {
        Ok((self.0)(story))
    }
}

enum Segment {
    Output(StoryOutput),
    Skip,
    Item(Box<dyn FnOnce(&mut Story) -> Option<StoryOutput>>),
    Lazy(Box<dyn FnOnce(&mut Story) -> BoxedThread>),
    Thread(BoxedThread),
}

/// Builder for passage content.
///
/// Segments are evaluated lazily, in order, one per pull: closures added
/// with [`Sequence::then`] run only when the story reaches them, so they
/// observe variables and history as they are at that moment.
///
/// # Examples
///
/// ```
/// use quill_story::{Link, Sequence, Style};
///
/// let content = Sequence::new()
///     .text("You wake up.")
///     .styled(Style::pair("color", "red"), Sequence::new().text("Something moves."))
///     .line_break()
///     .link("Get up", Link::to("Hall"))
///     .boxed();
/// # let _ = content;
/// ```
#[derive(Default)]
pub struct Sequence {
    segments: VecDeque<Segment>,
}

impl Sequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a ready-made output.
    pub fn output(mut self, output: StoryOutput) -> Self {
        self.segments.push_back(Segment::Output(output));
        self
    }

    /// Appends plain text.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.output(StoryOutput::from_text(text))
    }

    /// Appends a line break.
    pub fn line_break(self) -> Self {
        self.output(StoryOutput::line_break())
    }

    /// Appends a raw markup tag.
    pub fn html_tag(self, tag: impl Into<String>) -> Self {
        self.output(StoryOutput::html_tag(tag))
    }

    /// Appends a link.
    pub fn link(self, name: impl Into<String>, link: Link) -> Self {
        self.output(StoryOutput::link(name, link))
    }

    /// Appends an embedded passage.
    pub fn embed_passage(self, passage: impl Into<String>, parameters: Vec<JsonValue>) -> Self {
        self.output(StoryOutput::embed_passage(passage, parameters))
    }

    /// Appends an embedded fragment.
    pub fn embed_fragment(self, action: impl Fn() -> BoxedThread + 'static) -> Self {
        self.output(StoryOutput::embed_fragment(action))
    }

    /// Appends an abort.
    pub fn abort(self, passage: Option<&str>) -> Self {
        self.output(StoryOutput::abort(passage))
    }

    /// Appends an explicit "no output this step".
    pub fn skip(mut self) -> Self {
        self.segments.push_back(Segment::Skip);
        self
    }

    /// Appends an item computed when the story reaches it; `None` emits nothing.
    pub fn then(mut self, item: impl FnOnce(&mut Story) -> Option<StoryOutput> + 'static) -> Self {
        self.segments.push_back(Segment::Item(Box::new(item)));
        self
    }

    /// Inlines a thread chosen when the story reaches it.
    pub fn lazy(mut self, thread: impl FnOnce(&mut Story) -> BoxedThread + 'static) -> Self {
        self.segments.push_back(Segment::Lazy(Box::new(thread)));
        self
    }

    /// Inlines another thread's items.
    pub fn thread(mut self, thread: BoxedThread) -> Self {
        self.segments.push_back(Segment::Thread(thread));
        self
    }

    /// Inlines `inner` with `style` applied to everything it emits.
    pub fn styled(self, style: Style, inner: Sequence) -> Self {
        self.thread(Box::new(Styled::new(style, inner.boxed())))
    }

    /// Inlines `inner`, inserting its output at `index` of the output list.
    pub fn insert_at(self, index: usize, inner: Sequence) -> Self {
        self.thread(Box::new(InsertAt::new(index, inner.boxed())))
    }

    /// Boxes the sequence.
    pub fn boxed(self) -> BoxedThread {
        Box::new(self)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("remaining", &self.segments.len())
            .finish()
    }
}

impl StoryThread for Sequence {
    fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>> {
        loop {
            let Some(segment) = self.segments.pop_front() else {
                return Ok(None);
            };
            match segment {
                Segment::Output(output) => return Ok(Some(Step::Output(output))),
                Segment::Skip => return Ok(Some(Step::Skip)),
                Segment::Item(item) => {
                    return Ok(Some(item(story).map_or(Step::Skip, Step::Output)));
                }
                Segment::Lazy(make) => {
                    let thread = make(story);
                    self.segments.push_front(Segment::Thread(thread));
                }
                Segment::Thread(mut thread) => match thread.next(story)? {
                    Some(step) => {
                        self.segments.push_front(Segment::Thread(thread));
                        return Ok(Some(step));
                    }
                    None => thread.dispose(story)?,
                },
            }
        }
    }

    fn dispose(&mut self, story: &mut Story) -> QuillResult<()> {
        while let Some(segment) = self.segments.pop_front() {
            if let Segment::Thread(mut thread) = segment {
                thread.dispose(story)?;
            }
        }
        Ok(())
    }
}

/// Applies a style to everything an inner thread emits.
///
/// The scope opens on the first pull and closes when the inner thread is
/// exhausted or the wrapper is disposed, whichever comes first.
pub struct Styled {
    style: Option<Style>,
    scope: Option<StyleScope>,
    inner: BoxedThread,
}

impl Styled {
    /// Wraps `inner` in a style scope.
    pub fn new(style: Style, inner: BoxedThread) -> Self {
        Self {
            style: Some(style),
            scope: None,
            inner,
        }
    }

    fn close(&mut self, story: &mut Story) -> QuillResult<()> {
        self.inner.dispose(story)?;
        if let Some(scope) = self.scope.take() {
            story.close_style(scope)?;
        }
        Ok(())
    }
}

impl StoryThread for Styled {
    fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>> {
        if let Some(style) = self.style.take() {
            self.scope = Some(story.open_style(style)?);
        }
        match self.inner.next(story)? {
            Some(step) => Ok(Some(step)),
            None => {
                self.close(story)?;
                Ok(None)
            }
        }
    }

    fn dispose(&mut self, story: &mut Story) -> QuillResult<()> {
        self.close(story)
    }
}

/// Redirects everything an inner thread emits to a position in the output list.
pub struct InsertAt {
    index: usize,
    active: bool,
    inner: BoxedThread,
}

impl InsertAt {
    /// Wraps `inner` so its output lands at `index`.
    pub fn new(index: usize, inner: BoxedThread) -> Self {
        Self {
            index,
            active: false,
            inner,
        }
    }

    fn release(&mut self, story: &mut Story) -> QuillResult<()> {
        self.inner.dispose(story)?;
        if std::mem::take(&mut self.active) {
            story.pop_insertion_point()?;
        }
        Ok(())
    }
}

impl StoryThread for InsertAt {
    fn next(&mut self, story: &mut Story) -> QuillResult<Option<Step>> {
        if !self.active {
            story.push_insertion_point(self.index)?;
            self.active = true;
        }
        match self.inner.next(story)? {
            Some(step) => Ok(Some(step)),
            None => {
                self.release(story)?;
                Ok(None)
            }
        }
    }

    fn dispose(&mut self, story: &mut Story) -> QuillResult<()> {
        self.release(story)
    }
}
