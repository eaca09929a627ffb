//! Thread execution and notification phases.
//!
//! The executor pulls the active collapsed thread one output at a time while
//! the story is playing. Each output is styled, stored in the output list and
//! dispatched through its own callback sequence; pausing from any listener or
//! cue leaves the thread and the half-run sequence in place for `resume`.

use crate::collapse::CollapsedThread;
use crate::cue::{BoundCue, CueArgs, CueEvent};
use crate::sequence::{self, CallbackSequence};
use crate::{Abort, Link, Step, Story, StoryEvent, StoryOutput, StoryState};
use quill_core::Indexed;
use quill_error::QuillResult;
use tracing::{debug, info, trace, warn};

impl Story {
    /// Installs `sequence` as the active phase and runs it.
    pub(crate) fn start_sequence(&mut self, sequence: CallbackSequence<Story>) -> QuillResult<()> {
        trace!(phase = sequence.label(), actions = sequence.remaining(), "Starting callback sequence");
        self.callbacks = Some(sequence);
        self.run_callbacks()
    }

    pub(crate) fn run_callbacks(&mut self) -> QuillResult<()> {
        let serial = self.callbacks.as_ref().map(CallbackSequence::serial);
        if let Some(serial) = serial {
            self.running_sequences.push(serial);
        }
        let result = sequence::invoke(self);
        if serial.is_some() {
            self.running_sequences.pop();
        }
        result
    }

    /// Completion of the enter phases: play the thread unless a cue paused.
    pub(crate) fn continue_if_playing(&mut self) -> QuillResult<()> {
        if self.state == StoryState::Playing && self.thread.is_some() {
            self.execute_current_thread()
        } else {
            Ok(())
        }
    }

    /// Pulls and dispatches outputs until the thread ends or playback stops.
    ///
    /// Content that pauses while being pulled keeps whatever it produced in
    /// that pull; the next call picks it up before pulling again.
    pub(crate) fn execute_current_thread(&mut self) -> QuillResult<()> {
        while self.state == StoryState::Playing {
            self.callbacks = None;
            let Some(mut thread) = self.thread.take() else {
                return Ok(());
            };

            let pulled = match self.held_pull.take() {
                Some(held) => Ok(held),
                None => {
                    self.pull_depth += 1;
                    let pulled = pull(&mut thread, self);
                    self.pull_depth -= 1;
                    pulled
                }
            };
            let pulled = match pulled {
                Ok(pulled) => pulled,
                Err(err) => {
                    warn!(error = %err, "Thread failed, stopping playback");
                    if let Err(dispose_err) = thread.dispose(self) {
                        warn!(error = %dispose_err, "Failed to dispose failed thread");
                    }
                    self.current_link = None;
                    self.set_state(StoryState::Idle);
                    return Err(err);
                }
            };
            self.thread = Some(thread);

            if self.state != StoryState::Playing {
                debug!(state = %self.state, "Content stopped playback while being pulled");
                if !matches!(pulled, Pulled::Suspended) {
                    self.held_pull = Some(pulled);
                }
                break;
            }
            match pulled {
                Pulled::Suspended => {}
                Pulled::Exhausted => return self.finish_thread(None),
                Pulled::Output(output) => {
                    if let Some(abort) = output.as_abort() {
                        let abort = abort.clone();
                        return self.finish_thread(Some(abort));
                    }
                    self.dispatch_output(output)?;
                }
            }
        }
        trace!(state = %self.state, "Thread execution suspended");
        Ok(())
    }

    fn dispatch_output(&mut self, mut output: StoryOutput) -> QuillResult<()> {
        output.set_style(self.styles.current().combine(output.style()));
        let position = self.output.add(output.clone());
        output.set_index(Some(position));
        trace!(output = %output.id(), kind = output.kind_name(), position, "Dispatching output");

        let context = self.output_context(&output);
        let mut sequence = CallbackSequence::new("output");
        let added = output.clone();
        sequence.add(Box::new(move |story: &mut Story| {
            story.broadcast(StoryEvent::OutputAdded(added));
            Ok(())
        }))?;
        sequence.add_all(self.bound_cues(&context, CueEvent::Output, CueArgs::Output(output.clone())))?;

        if let Some(embedded) = output.embedded_passage_name() {
            debug!(passage = %embedded, "Embedding passage");
            sequence.add_all(self.bound_cues(embedded, CueEvent::Enter, CueArgs::None))?;
            sequence.on_complete(Box::new(|story: &mut Story| {
                story.refresh_update_cues();
                Ok(())
            }))?;
        }
        self.start_sequence(sequence)
    }

    /// Ends the active thread and runs the done phase, which moves on to the
    /// abort target or the finished link's passage.
    fn finish_thread(&mut self, aborted: Option<Abort>) -> QuillResult<()> {
        let disposed = match self.thread.take() {
            Some(mut thread) => thread.dispose(self),
            None => Ok(()),
        };
        self.set_state(StoryState::Idle);
        disposed?;

        let link = self.current_link.take();
        let link_name = link
            .as_ref()
            .and_then(StoryOutput::name)
            .map(str::to_string);
        let next = match (&aborted, &link) {
            (Some(abort), _) => abort.go_to_passage().map(str::to_string),
            (None, Some(link)) => link
                .as_link()
                .and_then(Link::passage_name)
                .map(str::to_string),
            (None, None) => None,
        };
        let passage = self.current_passage.clone().unwrap_or_default();
        info!(
            passage = %passage,
            link = ?link_name,
            aborted = aborted.is_some(),
            next = ?next,
            "Thread finished"
        );

        let contexts = match &link_name {
            Some(name) => vec![self.link_context(name)],
            None => self.cue_contexts(true),
        };
        let was_aborted = aborted.is_some();

        let mut sequence = CallbackSequence::new("done");
        sequence.add(Box::new(move |story: &mut Story| {
            let event = match link_name {
                Some(link) => {
                    story.links_done += 1;
                    StoryEvent::LinkDone {
                        passage,
                        link,
                        aborted: was_aborted,
                    }
                }
                None => StoryEvent::PassageDone {
                    passage,
                    aborted: was_aborted,
                },
            };
            story.broadcast(event);
            Ok(())
        }))?;
        if was_aborted {
            for context in &contexts {
                sequence.add_all(self.bound_cues(context, CueEvent::Aborted, CueArgs::None))?;
            }
        }
        for context in &contexts {
            sequence.add_all(self.bound_cues(context, CueEvent::Done, CueArgs::None))?;
        }
        sequence.on_complete(Box::new(move |story: &mut Story| match next {
            Some(target) => story.go_to(&target),
            None => Ok(()),
        }))?;
        self.start_sequence(sequence)
    }

    /// Cue contexts of the loaded passage: the passage itself, then every
    /// passage embedded in the current output in output order. Reversed for
    /// exit, so embeds close before the passage that holds them.
    pub(crate) fn cue_contexts(&self, forward: bool) -> Vec<String> {
        let mut contexts: Vec<String> = self.current_passage.iter().cloned().collect();
        for name in self
            .output
            .iter()
            .filter_map(StoryOutput::embedded_passage_name)
        {
            if !contexts.iter().any(|context| context == name) {
                contexts.push(name.to_string());
            }
        }
        if !forward {
            contexts.reverse();
        }
        contexts
    }

    pub(crate) fn link_context(&self, link: &str) -> String {
        format!(
            "{}{}{}",
            self.current_passage.as_deref().unwrap_or_default(),
            self.config.link_cue_separator(),
            link
        )
    }

    /// The passage an output came from: its nearest embedding passage, or
    /// the loaded passage.
    fn output_context(&self, output: &StoryOutput) -> String {
        let mut embed = output.embed_info();
        while let Some(current) = embed {
            if let Some(name) = current.embedded_passage_name() {
                return name.to_string();
            }
            embed = current.embed_info();
        }
        self.current_passage.clone().unwrap_or_default()
    }

    pub(crate) fn bound_cues(&mut self, context: &str, event: CueEvent, args: CueArgs) -> Vec<BoundCue> {
        self.cue_cache
            .resolve(self.cue_resolver.as_ref(), context, event)
            .into_iter()
            .map(|cue| BoundCue::new(cue, event, args.clone()))
            .collect()
    }

    /// Re-resolves the update cues of the passage and its embeds.
    pub(crate) fn refresh_update_cues(&mut self) {
        let mut cues = Vec::new();
        for context in self.cue_contexts(true) {
            cues.extend(
                self.cue_cache
                    .resolve(self.cue_resolver.as_ref(), &context, CueEvent::Update),
            );
        }
        trace!(count = cues.len(), "Refreshed update cues");
        self.update_cues = cues;
    }
}

/// Result of pulling the active thread once.
#[derive(Debug)]
pub(crate) enum Pulled {
    /// The next output
    Output(StoryOutput),
    /// The thread has nothing left
    Exhausted,
    /// Content paused between skipped steps before producing anything
    Suspended,
}

fn pull(thread: &mut CollapsedThread, story: &mut Story) -> QuillResult<Pulled> {
    loop {
        match thread.next(story)? {
            None => return Ok(Pulled::Exhausted),
            Some(Step::Output(output)) => return Ok(Pulled::Output(output)),
            Some(Step::Skip) if story.state != StoryState::Playing => return Ok(Pulled::Suspended),
            Some(Step::Skip) => {}
        }
    }
}
