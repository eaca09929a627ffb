use quill_story::{
    CueEvent, CueRegistry, Passage, PassageRegistry, Sequence, Story, StoryConfig,
    StoryErrorKind, StoryEvent, StoryOutput,
};
use serde_json::{Value as JsonValue, json};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn label(output: &StoryOutput) -> String {
    output.text().unwrap_or(output.kind_name()).to_string()
}

fn labels(story: &Story) -> Vec<String> {
    story.output().iter().map(label).collect()
}

fn push(log: &Log, entry: &'static str) -> impl Fn(&mut Story) + 'static {
    let log = Rc::clone(log);
    move |_: &mut Story| log.borrow_mut().push(entry.to_string())
}

fn record_outputs(log: &Log) -> impl Fn(&mut Story, &StoryOutput) + 'static {
    let log = Rc::clone(log);
    move |_: &mut Story, output: &StoryOutput| log.borrow_mut().push(label(output))
}

fn passages() -> PassageRegistry {
    PassageRegistry::new()
        .with(Passage::new("Main", |_| {
            Sequence::new()
                .text("a")
                .embed_passage("Inner", Vec::new())
                .text("c")
                .boxed()
        }))
        .with(Passage::new("Inner", |_| {
            Sequence::new().text("b1").text("b2").boxed()
        }))
        .with(Passage::new("Other", |_| Sequence::new().text("other").boxed()))
}

fn story(cues: CueRegistry) -> Story {
    let config = StoryConfig::default()
        .with_start_passage("Main".to_string())
        .with_auto_play(false);
    Story::new(passages())
        .with_config(config)
        .with_cue_resolver(cues)
}

#[test]
fn test_embedded_items_follow_their_embed_in_order() {
    let mut story = story(CueRegistry::new());
    story.begin().unwrap();

    assert_eq!(labels(&story), vec!["a", "EmbedPassage", "b1", "b2", "c"]);
    for (position, output) in story.output().iter().enumerate() {
        assert_eq!(output.index(), Some(position));
    }

    let embed_of = |position: usize| {
        story
            .output()
            .get(position)
            .and_then(StoryOutput::embed_info)
            .and_then(StoryOutput::name)
            .map(str::to_string)
    };
    assert_eq!(embed_of(0), None);
    assert_eq!(embed_of(1), None);
    assert_eq!(embed_of(2).as_deref(), Some("Inner"));
    assert_eq!(embed_of(3).as_deref(), Some("Inner"));
    assert_eq!(embed_of(4), None);
}

#[test]
fn test_nested_items_are_tagged_with_the_innermost_embed() {
    let passages = PassageRegistry::new()
        .with(Passage::new("A", |_| {
            Sequence::new().text("a").embed_passage("B", Vec::new()).boxed()
        }))
        .with(Passage::new("B", |_| {
            Sequence::new().text("b").embed_passage("C", Vec::new()).boxed()
        }))
        .with(Passage::new("C", |_| Sequence::new().text("c").boxed()));
    let mut story = Story::new(passages);
    story.go_to("A").unwrap();

    assert_eq!(labels(&story), vec!["a", "EmbedPassage", "b", "EmbedPassage", "c"]);
    let c = story.output().get(4).unwrap();
    let inner = c.embed_info().unwrap();
    assert_eq!(inner.embedded_passage_name(), Some("C"));
    assert_eq!(
        inner.embed_info().and_then(StoryOutput::embedded_passage_name),
        Some("B")
    );
    assert_eq!(
        story.output().get(2).unwrap().embed_info().and_then(StoryOutput::name),
        Some("B")
    );
}

#[test]
fn test_exit_cues_run_in_reverse_embed_order() {
    let log: Log = Rc::default();
    let mut cues = CueRegistry::new();
    for passage in ["Main", "Inner"] {
        let enter: &'static str = if passage == "Main" { "Main enter" } else { "Inner enter" };
        let exit: &'static str = if passage == "Main" { "Main exit" } else { "Inner exit" };
        let done: &'static str = if passage == "Main" { "Main done" } else { "Inner done" };
        cues.on(passage, CueEvent::Enter, push(&log, enter))
            .on(passage, CueEvent::Exit, push(&log, exit))
            .on(passage, CueEvent::Done, push(&log, done));
    }
    let mut story = story(cues);

    story.begin().unwrap();
    story.go_to("Other").unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "Main enter",
            "Inner enter",
            "Main done",
            "Inner done",
            "Inner exit",
            "Main exit",
        ]
    );
    assert_eq!(story.passage_history(), ["Main"]);
}

#[test]
fn test_embed_enter_cues_run_before_embedded_content() {
    let seen: Log = Rc::default();
    let sink = Rc::clone(&seen);
    let mut cues = CueRegistry::new();
    cues.on("Inner", CueEvent::Enter, move |story| {
        sink.borrow_mut().push(story.current_text());
        sink.borrow_mut().push(story.output().len().to_string());
    });
    let mut story = story(cues);
    story.begin().unwrap();
    assert_eq!(*seen.borrow(), vec!["a", "2"]);
}

#[test]
fn test_output_cues_use_the_originating_passage() {
    let main: Log = Rc::default();
    let inner: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on_output("Main", CueEvent::Output, record_outputs(&main))
        .on_output("Inner", CueEvent::Output, record_outputs(&inner));
    let mut story = story(cues);
    story.begin().unwrap();

    assert_eq!(*main.borrow(), vec!["a", "EmbedPassage", "c"]);
    assert_eq!(*inner.borrow(), vec!["b1", "b2"]);
}

#[test]
fn test_fragments_flatten_inline_and_belong_to_their_passage() {
    let passages = passages()
        .with(Passage::new("Loose", |_| {
            Sequence::new()
                .text("x")
                .embed_fragment(|| Sequence::new().text("frag").boxed())
                .text("y")
                .boxed()
        }))
        .with(Passage::new("Nested", |_| {
            Sequence::new()
                .embed_passage("WithFragment", Vec::new())
                .boxed()
        }))
        .with(Passage::new("WithFragment", |_| {
            Sequence::new()
                .embed_fragment(|| Sequence::new().text("deep").boxed())
                .boxed()
        }));
    let loose: Log = Rc::default();
    let with_fragment: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on_output("Loose", CueEvent::Output, record_outputs(&loose))
        .on_output("WithFragment", CueEvent::Output, record_outputs(&with_fragment));
    let mut story = Story::new(passages).with_cue_resolver(cues);

    story.go_to("Loose").unwrap();
    assert_eq!(labels(&story), vec!["x", "EmbedFragment", "frag", "y"]);
    assert_eq!(
        story.output().get(2).unwrap().embed_info().map(StoryOutput::kind_name),
        Some("EmbedFragment")
    );
    assert_eq!(*loose.borrow(), vec!["x", "EmbedFragment", "frag", "y"]);

    story.go_to("Nested").unwrap();
    assert_eq!(*with_fragment.borrow(), vec!["EmbedFragment", "deep"]);
}

#[test]
fn test_embedded_passages_receive_parameters() {
    let passages = PassageRegistry::new()
        .with(Passage::new("Start", |_| {
            Sequence::new()
                .embed_passage("Greeting", vec![json!("Ada")])
                .boxed()
        }))
        .with(Passage::new("Greeting", |params: &[JsonValue]| {
            let name = params
                .first()
                .and_then(JsonValue::as_str)
                .unwrap_or("nobody")
                .to_string();
            Sequence::new().text(format!("Hello {}", name)).boxed()
        }));
    let mut story = Story::new(passages);
    story.begin().unwrap();
    assert_eq!(story.current_text(), "Hello Ada");
}

#[test]
fn test_self_embedding_stops_at_the_depth_limit() {
    let passages = PassageRegistry::new().with(Passage::new("Loop", |_| {
        Sequence::new().embed_passage("Loop", Vec::new()).boxed()
    }));
    let config = StoryConfig::default().with_max_embed_depth(3);
    let mut story = Story::new(passages).with_config(config);

    let err = story.go_to("Loop").unwrap_err();
    assert_eq!(
        err.story_kind(),
        Some(&StoryErrorKind::EmbedDepthExceeded {
            passage: "Loop".to_string(),
            depth: 3,
        })
    );
    assert!(err.story_kind().is_some_and(StoryErrorKind::is_internal_consistency));
    assert_eq!(story.output().len(), 4);
}

#[test]
fn test_update_cues_include_embedded_passages() {
    let log: Log = Rc::default();
    let mut cues = CueRegistry::new();
    cues.on("Main", CueEvent::Update, push(&log, "Main update"))
        .on("Inner", CueEvent::Update, push(&log, "Inner update"));
    let mut story = story(cues);

    story.tick().unwrap();
    assert!(log.borrow().is_empty());

    story.begin().unwrap();
    story.tick().unwrap();
    assert_eq!(*log.borrow(), vec!["Main update", "Inner update"]);
}

#[test]
fn test_insertion_point_keeps_inserted_items_together() {
    let passages = PassageRegistry::new().with(Passage::new("Start", |_| {
        Sequence::new()
            .text("a")
            .text("d")
            .insert_at(1, Sequence::new().text("b").text("c"))
            .text("e")
            .boxed()
    }));
    let mut story = Story::new(passages);
    let added: Log = Rc::default();
    let sink = Rc::clone(&added);
    story.add_listener(move |_, event| {
        if let StoryEvent::OutputAdded(output) = event {
            sink.borrow_mut()
                .push(format!("{}@{}", label(output), output.index().unwrap_or(99)));
        }
    });

    story.begin().unwrap();
    assert_eq!(labels(&story), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(*added.borrow(), vec!["a@0", "d@1", "b@1", "c@2", "e@4"]);
    for (position, output) in story.output().iter().enumerate() {
        assert_eq!(output.index(), Some(position));
    }
    assert_eq!(story.output().insertion_depth(), 0);
}
