//! A small built-in story for trying the player.

use quill_core::Style;
use quill_story::{Link, Passage, PassageRegistry, Sequence, StoryOutput};

/// Passages of the demo story: a cellar, a hall of mirrors and an echo
/// embedded in the hall.
pub fn passages() -> PassageRegistry {
    PassageRegistry::new()
        .with(
            Passage::new("Start", |_| {
                Sequence::new()
                    .text("You wake in a dark cellar.")
                    .then(|story| {
                        (!story.is_first_visit_to_passage())
                            .then(|| StoryOutput::from_text(" It feels familiar."))
                    })
                    .line_break()
                    .link(
                        "Light the lantern",
                        Link::new().with_action(|| {
                            Sequence::new()
                                .styled(
                                    Style::pair("color", "amber"),
                                    Sequence::new().text("The wick catches."),
                                )
                                .line_break()
                                .boxed()
                        }),
                    )
                    .link("Climb the stairs", Link::to("Hall"))
                    .boxed()
            })
            .with_tags(["indoors"]),
        )
        .with(
            Passage::new("Hall", |_| {
                Sequence::new()
                    .styled(
                        Style::pair("color", "gold"),
                        Sequence::new().text("A hall of mirrors."),
                    )
                    .line_break()
                    .embed_passage("Echo", Vec::new())
                    .link("Go back", Link::to("Start"))
                    .boxed()
            })
            .with_tags(["indoors", "bright"]),
        )
        .with(Passage::new("Echo", |_| {
            Sequence::new().text("Your footsteps echo.").line_break().boxed()
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_story::Story;

    #[test]
    fn test_hall_embeds_echo() {
        let mut story = Story::new(passages());
        story.go_to("Hall").unwrap();
        assert_eq!(
            story.current_text(),
            "A hall of mirrors.\nYour footsteps echo.\n"
        );
        assert_eq!(story.passages_with_tag("indoors").len(), 2);
    }

    #[test]
    fn test_second_visit_mentions_familiarity() {
        let mut story = Story::new(passages());
        story.begin().unwrap();
        assert!(!story.current_text().contains("familiar"));
        story.do_link("Climb the stairs").unwrap();
        story.do_link("Go back").unwrap();
        assert!(story.current_text().contains("It feels familiar."));
    }
}
