//! Output items produced by passage content.

use crate::BoxedThread;
use quill_core::{Indexed, OutputId, Style};
use serde_json::Value as JsonValue;
use std::fmt;
use std::rc::Rc;

/// Factory producing a fresh sub-thread, used by links and embedded fragments.
pub type ThreadAction = Rc<dyn Fn() -> BoxedThread>;

/// A player choice.
///
/// Activating a link runs its optional action as a sub-thread, then moves to
/// the target passage if one is set.
#[derive(Clone, Default)]
pub struct Link {
    passage_name: Option<String>,
    action: Option<ThreadAction>,
}

impl Link {
    /// A link with neither a target nor an action.
    pub fn new() -> Self {
        Self::default()
    }

    /// A link that moves to `passage` once activated.
    pub fn to(passage: impl Into<String>) -> Self {
        Self {
            passage_name: Some(passage.into()),
            action: None,
        }
    }

    /// Builder method setting the action run when the link is activated.
    pub fn with_action(mut self, action: impl Fn() -> BoxedThread + 'static) -> Self {
        self.action = Some(Rc::new(action));
        self
    }

    /// Target passage.
    pub fn passage_name(&self) -> Option<&str> {
        self.passage_name.as_deref()
    }

    /// Action producing the link's sub-thread.
    pub fn action(&self) -> Option<&ThreadAction> {
        self.action.as_ref()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("passage_name", &self.passage_name)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Another passage embedded into the current stream.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct EmbedPassage {
    /// Passage whose content is flattened in
    passage_name: String,
    /// Parameters handed to the passage's content factory
    parameters: Vec<JsonValue>,
}

/// Inline content embedded into the current stream.
#[derive(Clone)]
pub struct EmbedFragment {
    action: ThreadAction,
}

impl EmbedFragment {
    /// Action producing the fragment's content.
    pub fn action(&self) -> &ThreadAction {
        &self.action
    }
}

impl fmt::Debug for EmbedFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedFragment").finish_non_exhaustive()
    }
}

/// Stops the current thread, optionally moving on to another passage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Abort {
    go_to_passage: Option<String>,
}

impl Abort {
    /// Passage to go to after the thread stops.
    pub fn go_to_passage(&self) -> Option<&str> {
        self.go_to_passage.as_deref()
    }
}

/// The variant part of a [`StoryOutput`].
#[derive(Debug, Clone, strum::AsRefStr)]
pub enum OutputKind {
    /// Plain text
    Text,
    /// Raw markup tag passed through to the renderer
    HtmlTag,
    /// Line break
    LineBreak,
    /// Player choice
    Link(Link),
    /// Opening of a style scope
    StyleGroup(Style),
    /// Embedded passage
    EmbedPassage(EmbedPassage),
    /// Embedded inline fragment
    EmbedFragment(EmbedFragment),
    /// Control signal stopping the thread
    Abort(Abort),
}

/// A single item of narrative output.
///
/// `index` is owned by the story's output list: it is `None` until the item
/// is stored and is rewritten whenever content is inserted or removed before
/// it. Clones handed to listeners carry the index at the time they were sent.
///
/// # Examples
///
/// ```
/// use quill_story::{Link, StoryOutput};
///
/// let greeting = StoryOutput::from_text("Hi");
/// assert_eq!(greeting.text(), Some("Hi"));
///
/// let go = StoryOutput::link("Go", Link::to("Room"));
/// assert_eq!(go.as_link().and_then(|link| link.passage_name()), Some("Room"));
/// ```
#[derive(Debug, Clone)]
pub struct StoryOutput {
    id: OutputId,
    index: Option<usize>,
    name: Option<String>,
    text: Option<String>,
    style: Style,
    embed_info: Option<Rc<StoryOutput>>,
    kind: OutputKind,
}

impl StoryOutput {
    /// Creates an output of the given kind with no name or text.
    pub fn new(kind: OutputKind) -> Self {
        Self {
            id: OutputId::next(),
            index: None,
            name: None,
            text: None,
            style: Style::new(),
            embed_info: None,
            kind,
        }
    }

    /// Plain text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Text).with_text(text)
    }

    /// A raw markup tag.
    pub fn html_tag(tag: impl Into<String>) -> Self {
        Self::new(OutputKind::HtmlTag).with_text(tag)
    }

    /// A line break.
    pub fn line_break() -> Self {
        Self::new(OutputKind::LineBreak)
    }

    /// A link named `name`, displayed with the same text.
    pub fn link(name: impl Into<String>, link: Link) -> Self {
        let name = name.into();
        Self::new(OutputKind::Link(link))
            .with_text(name.clone())
            .with_name(name)
    }

    /// The opening of a style scope.
    pub fn style_group(style: Style) -> Self {
        Self::new(OutputKind::StyleGroup(style))
    }

    /// Embeds another passage's content.
    pub fn embed_passage(passage: impl Into<String>, parameters: Vec<JsonValue>) -> Self {
        let passage_name = passage.into();
        Self::new(OutputKind::EmbedPassage(EmbedPassage {
            passage_name: passage_name.clone(),
            parameters,
        }))
        .with_name(passage_name)
    }

    /// Embeds inline content.
    pub fn embed_fragment(action: impl Fn() -> BoxedThread + 'static) -> Self {
        Self::new(OutputKind::EmbedFragment(EmbedFragment {
            action: Rc::new(action),
        }))
    }

    /// Stops the thread, optionally going to `passage` afterwards.
    pub fn abort(passage: Option<&str>) -> Self {
        Self::new(OutputKind::Abort(Abort {
            go_to_passage: passage.map(str::to_string),
        }))
    }

    /// Builder method setting the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method setting the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Stable identity.
    pub fn id(&self) -> OutputId {
        self.id
    }

    /// Position in the output list when last stored or sent.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Name (link name, embedded passage name).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Style in effect when the output was emitted.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// The innermost embed this output was produced inside of.
    ///
    /// This is a snapshot of the embed as it was produced; look it up by id
    /// in the output list for its current position.
    pub fn embed_info(&self) -> Option<&StoryOutput> {
        self.embed_info.as_deref()
    }

    /// Variant part.
    pub fn kind(&self) -> &OutputKind {
        &self.kind
    }

    /// Name of the variant, e.g. `"Text"` or `"EmbedPassage"`.
    pub fn kind_name(&self) -> &str {
        self.kind.as_ref()
    }

    /// Link payload, if this is a link.
    pub fn as_link(&self) -> Option<&Link> {
        match &self.kind {
            OutputKind::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Abort payload, if this is an abort.
    pub fn as_abort(&self) -> Option<&Abort> {
        match &self.kind {
            OutputKind::Abort(abort) => Some(abort),
            _ => None,
        }
    }

    /// True for links.
    pub fn is_link(&self) -> bool {
        matches!(self.kind, OutputKind::Link(_))
    }

    /// True for embedded passages and fragments.
    pub fn is_embed(&self) -> bool {
        matches!(
            self.kind,
            OutputKind::EmbedPassage(_) | OutputKind::EmbedFragment(_)
        )
    }

    /// Name of the embedded passage, if this embeds one.
    pub fn embedded_passage_name(&self) -> Option<&str> {
        match &self.kind {
            OutputKind::EmbedPassage(embed) => Some(embed.passage_name().as_str()),
            _ => None,
        }
    }

    pub(crate) fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub(crate) fn tag_embed(&mut self, embed: &Rc<StoryOutput>) {
        if self.embed_info.is_none() {
            self.embed_info = Some(Rc::clone(embed));
        }
    }
}

impl Indexed for StoryOutput {
    fn id(&self) -> OutputId {
        self.id
    }

    fn index(&self) -> Option<usize> {
        self.index
    }

    fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }
}
