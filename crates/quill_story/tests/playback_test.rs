use quill_story::{
    CueEvent, CueRegistry, Link, Passage, PassageRegistry, QuillError, Sequence, Story,
    StoryConfig, StoryErrorKind, StoryEvent, StoryOutput, StoryState, VariableStore, Variables,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn passages() -> PassageRegistry {
    PassageRegistry::new()
        .with(
            Passage::new("Start", |_| {
                Sequence::new()
                    .text("Hi")
                    .link("Go", Link::to("Room"))
                    .boxed()
            })
            .with_tags(["intro"]),
        )
        .with(
            Passage::new("Room", |_| {
                Sequence::new()
                    .then(|story| {
                        let greeting = if story.is_first_visit_to_passage() {
                            "A new room."
                        } else {
                            "The room again."
                        };
                        Some(StoryOutput::from_text(greeting))
                    })
                    .link("Back", Link::to("Start"))
                    .boxed()
            })
            .with_tags(["Inside", "intro"]),
        )
}

fn describe(event: &StoryEvent) -> String {
    match event {
        StoryEvent::PassageEntered { passage } => format!("entered {}", passage),
        StoryEvent::PassageExited { passage } => format!("exited {}", passage),
        StoryEvent::PassageDone { passage, aborted } => {
            format!("done {}{}", passage, if *aborted { " (aborted)" } else { "" })
        }
        StoryEvent::StateChanged { from, to } => format!("state {}->{}", from, to),
        StoryEvent::LinkEntered { link, .. } => format!("link {}", link),
        StoryEvent::LinkDone { link, .. } => format!("link done {}", link),
        StoryEvent::OutputAdded(output) => {
            format!("output {}", output.text().unwrap_or(output.kind_name()))
        }
        StoryEvent::OutputRemoved(output) => {
            format!("removed {}", output.text().unwrap_or(output.kind_name()))
        }
    }
}

fn record_events(story: &mut Story) -> Log {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    story.add_listener(move |_, event| sink.borrow_mut().push(describe(event)));
    log
}

fn push(log: &Log, entry: &'static str) -> impl Fn(&mut Story) + 'static {
    let log = Rc::clone(log);
    move |_: &mut Story| log.borrow_mut().push(entry.to_string())
}

fn hint(err: &QuillError) -> String {
    match err.story_kind() {
        Some(StoryErrorKind::InvalidState { hint, .. }) => hint.clone(),
        other => panic!("expected InvalidState, got {:?}", other),
    }
}

#[test]
fn test_link_moves_to_target_and_records_history() {
    let mut story = Story::new(passages());
    story.begin().unwrap();
    assert_eq!(story.current_passage(), Some("Start"));
    assert_eq!(story.current_text(), "Hi");
    assert!(story.passage_history().is_empty());

    story.do_link("Go").unwrap();
    assert_eq!(story.current_passage(), Some("Room"));
    assert_eq!(story.passage_history(), ["Start"]);
    assert_eq!(story.state(), StoryState::Idle);
}

#[test]
fn test_notifications_follow_lifecycle_order() {
    let mut story = Story::new(passages());
    let log = record_events(&mut story);

    story.begin().unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "state Idle->Playing",
            "entered Start",
            "output Hi",
            "output Go",
            "state Playing->Idle",
            "done Start",
        ]
    );

    log.borrow_mut().clear();
    story.do_link(0usize).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "state Idle->Playing",
            "link Go",
            "state Playing->Idle",
            "link done Go",
            "state Idle->Exiting",
            "exited Start",
            "state Exiting->Playing",
            "entered Room",
            "output A new room.",
            "output Back",
            "state Playing->Idle",
            "done Room",
        ]
    );
}

#[test]
fn test_illegal_calls_fail_without_side_effects() {
    let mut cues = CueRegistry::new();
    cues.on_output("Start", CueEvent::Output, |story, _| {
        let _ = story.pause();
    });
    let mut story = Story::new(passages()).with_cue_resolver(cues);

    assert_eq!(hint(&story.pause().unwrap_err()), "must be playing");
    assert_eq!(hint(&story.resume().unwrap_err()), "not paused");

    story.begin().unwrap();
    assert_eq!(story.state(), StoryState::Paused);
    assert_eq!(story.output().len(), 1);

    assert_eq!(hint(&story.go_to("Room").unwrap_err()), "resume first");
    assert_eq!(hint(&story.do_link("Go").unwrap_err()), "resume first");
    assert_eq!(hint(&story.reset().unwrap_err()), "resume first");
    assert_eq!(hint(&story.pause().unwrap_err()), "must be playing");
    assert_eq!(story.output().len(), 1);
    assert_eq!(story.current_passage(), Some("Start"));
    assert!(story.passage_history().is_empty());

    story.resume().unwrap();
    assert_eq!(story.output().len(), 2);
    story.resume().unwrap();
    assert_eq!(story.state(), StoryState::Idle);
}

#[test]
fn test_go_to_while_playing_or_exiting_must_wait_for_idle() {
    let mut story = Story::new(passages());
    let hints: Log = Rc::default();
    let sink = Rc::clone(&hints);
    story.add_listener(move |story, event| {
        if !matches!(
            event,
            StoryEvent::OutputAdded(_) | StoryEvent::PassageExited { .. }
        ) {
            return;
        }
        if let Err(err) = story.go_to("Room") {
            sink.borrow_mut().push(format!("{}: {}", story.state(), hint(&err)));
        }
    });

    story.begin().unwrap();
    story.do_link("Go").unwrap();

    let hints = hints.borrow();
    assert_eq!(hints[0], "Playing: must be idle");
    assert!(hints.contains(&"Exiting: must be idle".to_string()));
    assert_eq!(story.current_passage(), Some("Room"));
}

#[test]
fn test_unknown_names_are_not_found() {
    let mut story = Story::new(passages());
    let err = story.go_to("Nowhere").unwrap_err();
    assert_eq!(
        err.story_kind(),
        Some(&StoryErrorKind::PassageNotFound("Nowhere".to_string()))
    );
    assert_eq!(story.state(), StoryState::Idle);

    story.begin().unwrap();
    let err = story.do_link("Fly").unwrap_err();
    assert!(err.story_kind().is_some_and(StoryErrorKind::is_not_found));
    let err = story.do_link(5usize).unwrap_err();
    assert!(err.story_kind().is_some_and(StoryErrorKind::is_not_found));
}

#[test]
fn test_first_visit_and_visit_counts_follow_history() {
    let mut story = Story::new(passages());
    story.begin().unwrap();
    story.do_link("Go").unwrap();
    assert_eq!(story.current_text(), "A new room.");
    assert!(story.is_first_visit_to_passage());

    story.do_link("Back").unwrap();
    story.do_link("Go").unwrap();
    assert_eq!(story.current_text(), "The room again.");
    assert!(!story.is_first_visit_to_passage());
    assert_eq!(story.visit_count("Room"), 2);
    assert_eq!(story.passage_history(), ["Start", "Room", "Start"]);
}

#[test]
fn test_abort_with_target_stops_and_moves_on() {
    let passages = passages().with(Passage::new("Trap", |_| {
        Sequence::new()
            .text("Click.")
            .abort(Some("Room"))
            .text("never shown")
            .boxed()
    }));
    let log: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on("Trap", CueEvent::Aborted, push(&log, "aborted"))
        .on("Trap", CueEvent::Done, push(&log, "done"));
    let mut story = Story::new(passages).with_cue_resolver(cues);
    let events = record_events(&mut story);

    story.go_to("Trap").unwrap();

    assert_eq!(*log.borrow(), vec!["aborted", "done"]);
    assert!(events.borrow().contains(&"done Trap (aborted)".to_string()));
    assert!(!events.borrow().iter().any(|e| e.contains("never shown")));
    assert_eq!(story.current_passage(), Some("Room"));
    assert_eq!(story.passage_history(), ["Trap"]);
}

#[test]
fn test_abort_without_target_stays_idle() {
    let passages = PassageRegistry::new().with(Passage::new("Start", |_| {
        Sequence::new().text("a").abort(None).text("b").boxed()
    }));
    let mut story = Story::new(passages);
    story.begin().unwrap();
    assert_eq!(story.current_text(), "a");
    assert_eq!(story.current_passage(), Some("Start"));
    assert_eq!(story.state(), StoryState::Idle);
}

#[test]
fn test_link_action_runs_before_target_with_link_cues() {
    let passages = PassageRegistry::new()
        .with(Passage::new("Start", |_| {
            Sequence::new()
                .link(
                    "Go",
                    Link::to("Room").with_action(|| Sequence::new().text("You walk.").boxed()),
                )
                .link(
                    "Look",
                    Link::new().with_action(|| Sequence::new().text("Nothing.").boxed()),
                )
                .boxed()
        }))
        .with(Passage::new("Room", |_| Sequence::new().text("Room").boxed()));
    let log: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on("Start_Go", CueEvent::Enter, push(&log, "go enter"))
        .on("Start_Go", CueEvent::Done, push(&log, "go done"))
        .on("Start", CueEvent::Exit, push(&log, "start exit"));
    let mut story = Story::new(passages).with_cue_resolver(cues);
    let events = record_events(&mut story);

    story.begin().unwrap();
    story.do_link("Look").unwrap();
    assert_eq!(story.links_done(), 1);
    assert_eq!(story.current_text(), "Nothing.");
    assert_eq!(story.current_passage(), Some("Start"));

    events.borrow_mut().clear();
    story.do_link("Go").unwrap();
    assert_eq!(*log.borrow(), vec!["go enter", "go done", "start exit"]);
    let events = events.borrow();
    let position = |entry: &str| events.iter().position(|e| e == entry).unwrap();
    assert!(position("link Go") < position("output You walk."));
    assert!(position("output You walk.") < position("link done Go"));
    assert_eq!(story.current_passage(), Some("Room"));
    assert_eq!(story.links_done(), 0);
}

#[test]
fn test_output_cues_receive_the_output() {
    let seen: Log = Rc::default();
    let sink = Rc::clone(&seen);
    let mut cues = CueRegistry::new();
    cues.on_output("Start", CueEvent::Output, move |_, output| {
        sink.borrow_mut()
            .push(format!("{}@{}", output.text().unwrap_or_default(), output.index().unwrap_or(99)));
    });
    let mut story = Story::new(passages()).with_cue_resolver(cues);
    story.begin().unwrap();
    assert_eq!(*seen.borrow(), vec!["Hi@0", "Go@1"]);
}

#[test]
fn test_malformed_cue_is_skipped() {
    let log: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on_output("Start", CueEvent::Enter, |_, _| panic!("needs an output"))
        .on("Start", CueEvent::Enter, push(&log, "plain enter"));
    let mut story = Story::new(passages()).with_cue_resolver(cues);
    story.begin().unwrap();
    assert_eq!(*log.borrow(), vec!["plain enter"]);
    assert_eq!(story.current_text(), "Hi");
}

#[test]
fn test_reset_clears_playback_and_variables() {
    let mut cues = CueRegistry::new();
    cues.on("Room", CueEvent::Enter, |story| {
        story.variables_mut().set("visited_room", json!(true));
    });
    let mut story = Story::new(passages())
        .with_cue_resolver(cues)
        .with_variables(Variables::new().with_default("gold", json!(5)));

    story.begin().unwrap();
    story.do_link("Go").unwrap();
    assert_eq!(story.variables().get("visited_room"), Some(&json!(true)));

    story.reset().unwrap();
    assert!(story.passage_history().is_empty());
    assert!(story.current_passage().is_none());
    assert!(story.output().is_empty());
    assert_eq!(story.variables().get("visited_room"), None);
    assert_eq!(story.variables().get("gold"), Some(&json!(5)));

    story.begin().unwrap();
    assert!(story.is_first_visit_to_passage());
}

#[test]
fn test_tick_auto_plays_once_and_runs_update_cues() {
    let ticks = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&ticks);
    let mut cues = CueRegistry::new();
    cues.on("Start", CueEvent::Update, move |_| *counter.borrow_mut() += 1)
        .on_output("Start", CueEvent::Update, |_, _| panic!("update cues take no output"));
    let mut story = Story::new(passages()).with_cue_resolver(cues);

    story.tick().unwrap();
    assert_eq!(story.current_passage(), Some("Start"));
    assert_eq!(*ticks.borrow(), 1);

    story.tick().unwrap();
    assert_eq!(*ticks.borrow(), 2);
    assert!(story.passage_history().is_empty());
}

#[test]
fn test_tick_without_auto_play_waits_for_begin() {
    let config = StoryConfig::default().with_auto_play(false);
    let mut story = Story::new(passages()).with_config(config);
    story.tick().unwrap();
    assert!(story.current_passage().is_none());
    assert_eq!(story.state(), StoryState::Idle);
}

#[test]
fn test_tags_are_queried_case_insensitively() {
    let mut story = Story::new(passages());
    assert!(story.tags().is_empty());
    assert_eq!(story.passages_with_tag("INTRO"), vec!["Room", "Start"]);
    assert_eq!(story.passages_with_tag("inside"), vec!["Room"]);

    story.begin().unwrap();
    assert_eq!(story.tags(), ["intro"]);
}

#[test]
fn test_cue_cache_is_only_refreshed_on_request() {
    struct Counting(Rc<RefCell<usize>>);

    impl quill_story::CueResolver for Counting {
        fn resolve(&self, _context: &str, _event: CueEvent) -> Vec<quill_story::Cue> {
            *self.0.borrow_mut() += 1;
            Vec::new()
        }
    }

    let lookups = Rc::new(RefCell::new(0));
    let mut story = Story::new(passages()).with_cue_resolver(Counting(Rc::clone(&lookups)));
    story.begin().unwrap();
    story.go_to("Start").unwrap();
    let after_two_visits = *lookups.borrow();

    story.go_to("Start").unwrap();
    assert_eq!(*lookups.borrow(), after_two_visits);

    story.reset_cue_cache();
    story.go_to("Start").unwrap();
    assert!(*lookups.borrow() > after_two_visits);
}

#[test]
fn test_content_errors_return_story_to_idle() {
    let passages = passages().with(Passage::new("Broken", |_| {
        Sequence::new()
            .text("before")
            .embed_passage("Ghost", Vec::new())
            .text("after")
            .boxed()
    }));
    let mut story = Story::new(passages);
    let err = story.go_to("Broken").unwrap_err();
    assert_eq!(
        err.story_kind(),
        Some(&StoryErrorKind::PassageNotFound("Ghost".to_string()))
    );
    assert_eq!(story.state(), StoryState::Idle);
    assert!(!story.current_text().contains("after"));

    story.go_to("Start").unwrap();
    assert_eq!(story.current_passage(), Some("Start"));
    assert_eq!(story.passage_history(), ["Broken"]);
}

#[test]
fn test_failing_link_action_is_no_longer_in_action() {
    let passages = PassageRegistry::new().with(Passage::new("Start", |_| {
        Sequence::new()
            .link(
                "Haunt",
                Link::new().with_action(|| {
                    Sequence::new().embed_passage("Ghost", Vec::new()).boxed()
                }),
            )
            .boxed()
    }));
    let mut story = Story::new(passages);
    story.begin().unwrap();

    let err = story.do_link("Haunt").unwrap_err();
    assert!(err.story_kind().is_some_and(StoryErrorKind::is_not_found));
    assert_eq!(story.state(), StoryState::Idle);
    assert!(story.current_link_in_action().is_none());
    assert_eq!(story.links_done(), 0);
}
