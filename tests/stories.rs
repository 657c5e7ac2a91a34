use std::io::Write;
use std::path::PathBuf;

use storyweaver::data::DataBag;
use storyweaver::error::PlayerError;
use storyweaver::format::{Card, Story};
use storyweaver::freeplay::Interaction;
use storyweaver::player::{Player, Progress, StepOutcome, Timings};
use storyweaver::surface::{MemorySurface, PresentationSurface, Speaker};

fn story_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("stories")
        .join(name)
}

fn load(story: &str, data: &str, surface: MemorySurface) -> Player<MemorySurface> {
    let story = Story::from_path(story_path(story)).unwrap();
    let data = DataBag::from_path(story_path(data)).unwrap();
    Player::new(story, data, surface).with_timings(Timings::instant())
}

async fn play_to_end(player: &mut Player<MemorySurface>) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    while let Progress::Executed { outcome, .. } = player.advance().await {
        outcomes.push(outcome);
    }
    outcomes
}

// ==================== bundled stories ====================

#[tokio::test]
async fn test_sample_story() {
    let mut player = load("sample-story.json", "sample-data.json", MemorySurface::new());
    assert_eq!(player.story().story_id, "experiential_demo");
    assert_eq!(player.story().data_key, "sampleData");

    let outcomes = play_to_end(&mut player).await;
    assert_eq!(outcomes.len(), 12);
    assert!(outcomes.iter().all(|o| *o == StepOutcome::Applied));
    assert!(player.is_complete());
    assert_eq!(player.undo_depth(), 12);

    let surface = player.surface();
    assert_eq!(
        surface.branch_ids(),
        vec!["b0", "b0.p1", "b0.p2", "b0.p2.p2.1", "b0.p2.p2.2", "b0.p3"]
    );
    let root = surface.branch("b0").unwrap();
    assert_eq!(root.text, "Weekend Getaway to the Mountains");
    assert_eq!(root.card.as_ref().unwrap().title, "Mountain Hiking Tour");
    assert_eq!(surface.results().len(), 2);
    assert_eq!(
        surface.field("#initial-plan-prompt"),
        Some("Weekend Getaway to the Mountains")
    );
    assert_eq!(player.data().last_confirmation(), Some(true));

    // unwind everything
    while player.retreat() {}
    assert_eq!(player.undo_depth(), 0);
    assert!(player.surface().branches().is_empty());
    assert!(player.surface().results().is_empty());
    let surface = player.into_surface();
    assert!(surface.document().initial_prompt_visible);
    assert_eq!(surface.navigation().position, None);
}

#[tokio::test]
async fn test_advanced_story_accepted() {
    let mut player = load(
        "advanced-story.json",
        "advanced-data.json",
        MemorySurface::new().with_default_answer(true),
    );
    let outcomes = play_to_end(&mut player).await;
    assert!(outcomes.iter().all(|o| *o == StepOutcome::Applied));

    let surface = player.surface();
    assert_eq!(surface.branches().len(), 1 + 19);
    let task = surface
        .branch("main_destination.day4_adventure.paragliding")
        .unwrap();
    assert_eq!(task.text, "Tandem paragliding over alpine valleys");
    assert_eq!(
        task.parent.as_deref(),
        Some("main_destination.day4_adventure")
    );

    let messages: Vec<_> = surface.messages().iter().map(|m| m.text.as_str()).collect();
    assert!(messages.contains(
        &"Welcome Alex! I'm excited to help you plan your perfect adventure adventure. Let's get started!"
    ));
    assert!(messages.contains(
        &"Excellent! I'll create a comprehensive 7-day itinerary for your Swiss Alps Adventure adventure."
    ));
    assert!(messages.last().unwrap().starts_with("Your Swiss Alps Adventure adventure plan is ready!"));
}

#[tokio::test]
async fn test_advanced_story_declined() {
    let mut player = load(
        "advanced-story.json",
        "advanced-data.json",
        MemorySurface::new().with_default_answer(false),
    );
    let outcomes = play_to_end(&mut player).await;
    assert_eq!(
        &outcomes[7..],
        &[StepOutcome::Skipped, StepOutcome::Skipped, StepOutcome::Skipped]
    );
    assert!(outcomes[..7].iter().all(|o| *o == StepOutcome::Applied));
    assert_eq!(player.surface().branch_ids(), vec!["main_destination"]);
    assert_eq!(
        player.surface().messages().last().unwrap().text,
        "No worries! Feel free to explore these options and let me know if you need any specific recommendations."
    );

    // back across the skipped steps and the answer, then accept this time
    for _ in 0..4 {
        player.retreat();
    }
    assert_eq!(player.position(), Some(5));
    assert_eq!(player.data().last_confirmation(), None);

    player.surface_mut().queue_answer(true);
    play_to_end(&mut player).await;
    assert_eq!(player.surface().branches().len(), 20);
}

#[tokio::test]
async fn test_restart_replays_identically() {
    let mut player = load("sample-story.json", "sample-data.json", MemorySurface::new());
    play_to_end(&mut player).await;
    let first = player.surface().document().clone();

    player.reset();
    assert_eq!(player.position(), None);
    play_to_end(&mut player).await;
    assert_eq!(player.surface().document(), &first);
}

// ==================== loading ====================

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "storyId": "tmp", "steps": [ {{ "action": "wait", "duration": 10 }} ] }}"#
    )
    .unwrap();

    let story = Story::from_path(file.path()).unwrap();
    assert_eq!(story.story_id, "tmp");
    assert_eq!(story.title, "");
    assert_eq!(story.len(), 1);
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Story::from_path(dir.path().join("missing.json")),
        Err(PlayerError::Io(_))
    ));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"steps\": [").unwrap();
    assert!(matches!(Story::from_path(&path), Err(PlayerError::Json(_))));
    assert!(matches!(DataBag::from_path(&path), Err(PlayerError::Json(_))));

    std::fs::write(&path, "[1, 2, 3]").unwrap();
    assert!(DataBag::from_path(&path).is_err());
}

#[test]
fn test_load_timings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timings.json");
    std::fs::write(&path, r#"{ "rootStaggerMs": 10, "branchSettleMs": 0 }"#).unwrap();

    let timings = Timings::from_path(&path).unwrap();
    assert_eq!(timings.root_stagger_ms, 10);
    assert_eq!(timings.branch_settle_ms, 0);
    assert_eq!(timings.type_char_ms, Timings::default().type_char_ms);
}

// ==================== free play ====================

#[tokio::test]
async fn test_free_play_search() {
    let mut player = load("sample-story.json", "sample-data.json", MemorySurface::new());
    player
        .surface_mut()
        .create_branch("mine", "Beach weekend", None)
        .unwrap();

    assert!(
        player
            .interact(Interaction::Search {
                branch_id: "mine".to_string()
            })
            .await
    );
    let messages = player.surface().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].speaker, Speaker::Agent);
    assert!(messages[1].text.contains("\"Beach weekend\""));
    assert_eq!(player.surface().results().len(), 2);

    // nothing about playback changed
    assert_eq!(player.position(), None);
    assert_eq!(player.undo_depth(), 0);

    assert!(
        !player
            .interact(Interaction::Search {
                branch_id: "nowhere".to_string()
            })
            .await
    );
}

#[tokio::test]
async fn test_free_play_search_ignored_during_story() {
    let mut player = load("sample-story.json", "sample-data.json", MemorySurface::new());
    player.advance().await;
    let messages = player.surface().messages().len();

    assert!(
        !player
            .interact(Interaction::Search {
                branch_id: "b0".to_string()
            })
            .await
    );
    assert_eq!(player.surface().messages().len(), messages);
    assert!(player.surface().results().is_empty());
}

#[tokio::test]
async fn test_free_play_export() {
    let mut player = load("sample-story.json", "sample-data.json", MemorySurface::new());
    let card = Card::new("Lake Kayaking", "Rent a kayak");

    assert!(
        !player
            .interact(Interaction::Export {
                card: card.clone(),
                branch_id: None,
            })
            .await
    );

    player.advance().await;
    player
        .surface_mut()
        .create_branch("b0.extra", "Extras", Some("b0"))
        .unwrap();

    assert!(
        player
            .interact(Interaction::Export {
                card: card.clone(),
                branch_id: None,
            })
            .await
    );
    assert_eq!(player.surface().card_slot("b0.extra"), Some(card.clone()));

    assert!(
        player
            .interact(Interaction::Export {
                card: card.clone(),
                branch_id: Some("b0".to_string()),
            })
            .await
    );
    assert_eq!(player.surface().card_slot("b0"), Some(card));
    assert_eq!(player.undo_depth(), 1);
}
