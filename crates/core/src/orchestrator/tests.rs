use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use moodreel_model::ModelMessage;
use moodreel_test_model::{PresetFailure, PresetResponse, TestModelProvider};
use tokio::time::{sleep, timeout};

use super::Phase;
use crate::prompts;
use crate::transcript::{AgentTag, Role};
use crate::{Orchestrator, OrchestratorBuilder, Settings, UiState};

fn numbered_list(n: usize) -> String {
    (1..=n)
        .map(|i| format!("{i}. Artist {i} — Song {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn recommendations() -> String {
    format!(
        "Bright and warm.\n{}",
        (1..=5)
            .map(|i| format!("{i}. Film {i} (200{i}) — Director {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    )
}

async fn wait_idle(orchestrator: &Orchestrator) -> UiState {
    // Subscribing goes through the mailbox, so every intent sent before
    // has been handled when the receiver is returned.
    let mut state_rx = orchestrator.subscribe().await.unwrap();
    let state = timeout(Duration::from_millis(500), state_rx.wait_for(|s| !s.busy))
        .await
        .unwrap()
        .unwrap();
    state.clone()
}

async fn say(orchestrator: &Orchestrator, text: &str) -> UiState {
    orchestrator.set_input(text).unwrap();
    orchestrator.send().unwrap();
    wait_idle(orchestrator).await
}

fn visible(state: &UiState) -> Vec<(Role, Option<AgentTag>, &str)> {
    state
        .messages
        .iter()
        .map(|msg| (msg.role(), msg.agent_tag(), msg.content()))
        .collect()
}

/// Runs the conversation up to the hand-off question.
async fn reach_feedback(provider: &TestModelProvider, orchestrator: &Orchestrator) {
    provider.push_text("Great taste!");
    provider.push_text(numbered_list(10));
    let state = say(orchestrator, "I like sad indie rock, slow tempo").await;
    assert_eq!(state.phase, Phase::FeedbackPending);
}

#[tokio::test]
async fn test_initial_state() {
    let provider = TestModelProvider::default();
    let orchestrator = OrchestratorBuilder::with_model_provider(provider).build();

    let state = orchestrator.snapshot().await.unwrap();
    assert_eq!(
        visible(&state),
        vec![(Role::Assistant, Some(AgentTag::Music), prompts::GREETING)]
    );
    assert_eq!(state.phase, Phase::Gathering);
    assert!(!state.busy);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_finalize_then_handoff() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;

    let state = orchestrator.snapshot().await.unwrap();
    let playlist = numbered_list(10);
    assert_eq!(
        visible(&state),
        vec![
            (Role::Assistant, Some(AgentTag::Music), prompts::GREETING),
            (Role::User, None, "I like sad indie rock, slow tempo"),
            (Role::Assistant, Some(AgentTag::Music), "Great taste!"),
            (Role::Assistant, Some(AgentTag::Music), playlist.as_str()),
            (
                Role::Assistant,
                Some(AgentTag::Movie),
                prompts::HANDOFF_QUESTION
            ),
        ]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].instructions.as_deref(),
        Some(prompts::MUSIC_SYSTEM_PROMPT)
    );
    let Some(ModelMessage::User(hidden)) = requests[1].messages.last() else {
        panic!("finalize request must end with a user turn");
    };
    assert!(hidden.contains("User data: genres given, mood given, tempo given."));
    assert!(hidden.ends_with("I like sad indie rock, slow tempo"));
    assert_eq!(requests[1].messages.len(), 4);

    // The hidden prompt never shows up in the transcript.
    assert!(
        state
            .messages
            .iter()
            .all(|msg| !msg.content().contains("User data:"))
    );

    let follow_up_pending = orchestrator
        .handle()
        .query(|state| state.follow_up_pending)
        .await
        .unwrap();
    assert!(follow_up_pending);
}

#[tokio::test]
async fn test_feedback_leads_to_recommendations() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;

    provider.push_text(recommendations());
    let state = say(&orchestrator, "loved it, felt energetic").await;
    assert_eq!(state.phase, Phase::Done);
    let last = state.messages.last().unwrap();
    assert_eq!(last.agent_tag(), Some(AgentTag::Movie));
    assert_eq!(last.content(), recommendations());
    assert!(
        state
            .messages
            .iter()
            .all(|msg| !msg.content().contains("This is the user's playlist:"))
    );

    let requests = provider.requests();
    let handoff = &requests[2];
    assert_eq!(
        handoff.instructions.as_deref(),
        Some(prompts::CURATOR_SYSTEM_PROMPT)
    );
    assert_eq!(
        handoff.messages,
        vec![ModelMessage::User(prompts::handoff_prompt(
            &numbered_list(10),
            &format!(
                "Curator: {}\nUser: loved it, felt energetic",
                prompts::HANDOFF_QUESTION
            ),
        ))]
    );

    let (follow_up_pending, history_len) = orchestrator
        .handle()
        .query(|state| (state.follow_up_pending, state.agent_history.len()))
        .await
        .unwrap();
    assert!(!follow_up_pending);
    // The recommendation list itself is not kept as context.
    assert_eq!(history_len, 2);
}

#[tokio::test]
async fn test_curator_question_keeps_feedback_phase() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;

    provider.push_text("Which pace do you want for the films?");
    let state = say(&orchestrator, "not really").await;
    assert_eq!(state.phase, Phase::FeedbackPending);
    assert!(
        state
            .messages
            .iter()
            .all(|msg| !msg.content().contains("This is the user's playlist:"))
    );

    provider.push_text(recommendations());
    let state = say(&orchestrator, "slow and thoughtful").await;
    assert_eq!(state.phase, Phase::Done);

    let requests = provider.requests();
    let Some(ModelMessage::User(prompt)) = requests[3].messages.first() else {
        panic!("hand-off request must hold the prompt");
    };
    assert!(prompt.ends_with(
        "User: not really\n\
         Curator: Which pace do you want for the films?\n\
         User: slow and thoughtful"
    ));
}

#[tokio::test]
async fn test_playlist_without_finalize() {
    let provider = TestModelProvider::default();
    provider.push_text(numbered_list(12));
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    let state = say(&orchestrator, "surprise me").await;
    assert_eq!(state.phase, Phase::FeedbackPending);
    assert_eq!(state.messages.len(), 4);
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_short_list_is_not_a_playlist() {
    let provider = TestModelProvider::default();
    provider.push_text("Noted.");
    provider.push_text(numbered_list(9));
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    let state = say(&orchestrator, "sad indie rock, slow").await;
    assert_eq!(state.phase, Phase::Gathering);
    assert_eq!(state.messages.last().unwrap().content(), numbered_list(9));
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_follow_up_question() {
    let provider = TestModelProvider::default();
    provider.push_text("Nice.");
    provider.push_text("What do you listen to?");
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    let state = say(&orchestrator, "hello there").await;
    let texts: Vec<_> = state.messages.iter().map(|m| m.content()).collect();
    assert_eq!(
        texts[2..],
        ["Nice.", prompts::follow_up_question(Some(crate::signal::Signal::Genre))]
    );

    // The model asked on its own, nothing is appended.
    let state = say(&orchestrator, "not sure yet").await;
    assert_eq!(state.messages.len(), 6);
    assert_eq!(state.messages[5].content(), "What do you listen to?");
}

#[tokio::test]
async fn test_send_is_ignored_while_busy() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(50));
    provider.push_text("Which genres?");
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    orchestrator.set_input("first").unwrap();
    orchestrator.send().unwrap();
    orchestrator.set_input("second").unwrap();
    orchestrator.send().unwrap();

    let state = orchestrator.snapshot().await.unwrap();
    assert!(state.busy);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.input, "second");

    let state = wait_idle(&orchestrator).await;
    assert_eq!(state.messages.len(), 3);
    assert_eq!(state.input, "second");
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    let state = say(&orchestrator, "  \n ").await;
    assert_eq!(state.messages.len(), 1);
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_failure_keeps_user_message() {
    let provider = TestModelProvider::default();
    provider.push_response(PresetResponse::failing(PresetFailure::Http(500)));
    provider.push_text("Which genres?");
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    let state = say(&orchestrator, "hello there").await;
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].content(), "hello there");
    assert!(state.last_error.as_deref().unwrap().starts_with("HTTP 500"));
    assert_eq!(state.phase, Phase::Gathering);

    let state = say(&orchestrator, "again").await;
    assert!(state.last_error.is_none());
    assert_eq!(state.messages.len(), 4);
}

#[tokio::test]
async fn test_failed_handoff_keeps_curator_context() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;

    provider.push_response(PresetResponse::failing(PresetFailure::Transport));
    let state = say(&orchestrator, "loved it").await;
    assert_eq!(state.phase, Phase::FeedbackPending);
    assert!(state.last_error.is_some());

    let history_len = orchestrator
        .handle()
        .query(|state| state.agent_history.len())
        .await
        .unwrap();
    assert_eq!(history_len, 1);
}

#[tokio::test]
async fn test_chat_after_done() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;
    provider.push_text(recommendations());
    say(&orchestrator, "loved it").await;

    provider.push_text("Enjoy!");
    let state = say(&orchestrator, "thanks").await;
    assert_eq!(state.phase, Phase::Done);
    let last = state.messages.last().unwrap();
    assert_eq!(last.content(), "Enjoy!");
    assert_eq!(last.agent_tag(), Some(AgentTag::Music));
    assert_eq!(provider.requests().len(), 4);
}

#[tokio::test]
async fn test_new_chat_resets_everything() {
    let provider = TestModelProvider::default();
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();
    reach_feedback(&provider, &orchestrator).await;
    provider.push_text(recommendations());
    say(&orchestrator, "loved it").await;

    orchestrator.set_input("draft").unwrap();
    orchestrator.new_chat().unwrap();
    let state = orchestrator.snapshot().await.unwrap();
    assert_eq!(state.phase, Phase::Gathering);
    assert_eq!(state.messages.len(), 1);
    assert!(state.input.is_empty());

    let (follow_up_pending, history_empty) = orchestrator
        .handle()
        .query(|state| (state.follow_up_pending, state.agent_history.is_empty()))
        .await
        .unwrap();
    assert!(!follow_up_pending);
    assert!(history_empty);
}

#[tokio::test]
async fn test_reset_drops_in_flight_turn() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(30));
    provider.push_text("late reply");
    let orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone()).build();

    orchestrator.set_input("hello there").unwrap();
    orchestrator.send().unwrap();
    orchestrator.new_chat().unwrap();
    sleep(Duration::from_millis(100)).await;

    let state = orchestrator.snapshot().await.unwrap();
    assert!(!state.busy);
    assert_eq!(state.messages.len(), 1);
}

#[tokio::test]
async fn test_settings_change_rebuilds_client() {
    let built = Arc::new(AtomicUsize::new(0));
    let provider = TestModelProvider::default();
    let orchestrator = OrchestratorBuilder::with_provider_factory({
        let built = Arc::clone(&built);
        let provider = provider.clone();
        move |_: &Settings| {
            built.fetch_add(1, Ordering::Relaxed);
            provider.clone()
        }
    })
    .build();
    provider.push_text("Which genres?");
    say(&orchestrator, "hello there").await;

    let settings = Settings {
        system_prompt_override: "You are a DJ.".to_owned(),
        ..Default::default()
    };
    orchestrator.update_settings(settings.clone()).unwrap();
    let state = orchestrator.snapshot().await.unwrap();
    assert_eq!(state.settings, settings);
    assert_eq!(state.messages.len(), 1);
    assert_eq!(built.load(Ordering::Relaxed), 2);

    provider.push_text("Which genres?");
    say(&orchestrator, "hello again").await;
    let requests = provider.requests();
    assert_eq!(requests[1].instructions.as_deref(), Some("You are a DJ."));
    assert_eq!(requests[1].messages.len(), 2);
}
