use moodreel_actor::{Actor, Message};
use moodreel_model::ModelMessage;

use super::{OrchestratorState, Phase};
use crate::agent_history::Speaker;
use crate::model_client::CompletionError;
use crate::prompts;
use crate::recognizer;
use crate::settings::Settings;
use crate::signal::RECENT_USER_WINDOW;
use crate::transcript::{AgentTag, Message as ChatMessage, Transcript};
use crate::ui_state::UiState;

/// The kind of a model call, deciding how its reply is handled.
#[derive(Debug)]
enum Turn {
    /// The music agent answering the user.
    Music,
    /// The music agent answering the hidden finalize prompt.
    Finalize,
    /// The film curator answering `utterance`.
    Handoff { utterance: String },
    /// The music agent answering after the curation ended.
    Chat,
}

impl OrchestratorState {
    fn send_input(&mut self, handle: &Actor<Self>) {
        if self.busy {
            trace!("a turn is in flight, ignoring the send");
            return;
        }
        let text = self.input.trim().to_owned();
        if text.is_empty() {
            return;
        }

        self.follow_up_pending = false;
        self.transcript.push(ChatMessage::user(text.clone()));
        self.input.clear();
        self.busy = true;
        self.last_error = None;

        match self.phase {
            Phase::Gathering => self.start_music_turn(Turn::Music, None, handle),
            Phase::FeedbackPending => self.start_handoff_turn(text, handle),
            Phase::Done => self.start_music_turn(Turn::Chat, None, handle),
        }
    }

    fn start_music_turn(
        &mut self,
        turn: Turn,
        override_input: Option<String>,
        handle: &Actor<Self>,
    ) {
        let history = self.transcript.to_model_messages();
        let system_prompt = self
            .settings
            .system_prompt_override()
            .unwrap_or(prompts::MUSIC_SYSTEM_PROMPT)
            .to_owned();
        self.spawn_turn(turn, history, override_input, system_prompt, handle);
    }

    fn start_handoff_turn(&mut self, utterance: String, handle: &Actor<Self>) {
        let playlist = self
            .transcript
            .last_from_agent(AgentTag::Music, recognizer::is_playlist)
            .map(|msg| msg.content())
            .unwrap_or_default();
        let dialogue = self
            .agent_history
            .render_dialogue(Some((Speaker::User, &utterance)));
        let prompt = prompts::handoff_prompt(playlist, &dialogue);

        self.spawn_turn(
            Turn::Handoff { utterance },
            vec![],
            Some(prompt),
            prompts::CURATOR_SYSTEM_PROMPT.to_owned(),
            handle,
        );
    }

    fn start_finalize_turn(&mut self, handle: &Actor<Self>) {
        let signals = self
            .detector
            .collect_recent(&self.transcript, RECENT_USER_WINDOW);
        let mut answers: Vec<_> = self
            .transcript
            .recent_user_messages()
            .take(RECENT_USER_WINDOW)
            .collect();
        answers.reverse();
        let prompt = prompts::finalize_prompt(signals, answers);

        debug!("asking for the final playlist, signals: {signals:?}");
        self.start_music_turn(Turn::Finalize, Some(prompt), handle);
    }

    fn spawn_turn(
        &mut self,
        turn: Turn,
        history: Vec<ModelMessage>,
        override_input: Option<String>,
        system_prompt: String,
        handle: &Actor<Self>,
    ) {
        let task_id = self.next_task_id;
        self.next_task_id += 1;
        let epoch = self.epoch;
        debug!("starting turn {task_id}: {turn:?}");

        let client = self.client.clone();
        let handle = handle.clone();
        let task = tokio::spawn(async move {
            let result =
                client.complete(history, override_input, system_prompt).await;
            handle
                .send(TurnFinishedMessage {
                    task_id,
                    epoch,
                    turn,
                    result,
                })
                .ok();
        });
        self.running_tasks.insert(task_id, task);
    }

    fn finish_turn(
        &mut self,
        turn: Turn,
        result: Result<String, CompletionError>,
        handle: &Actor<Self>,
    ) {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                warn!("turn failed: {err}");
                self.busy = false;
                self.last_error = Some(err.to_string());
                return;
            }
        };

        match turn {
            Turn::Music => {
                self.transcript
                    .push(ChatMessage::assistant(reply.clone(), AgentTag::Music));
                self.after_music_reply(&reply, handle);
            }
            Turn::Finalize => {
                self.transcript
                    .push(ChatMessage::assistant(reply.clone(), AgentTag::Music));
                self.busy = false;
                self.maybe_start_handoff(&reply);
            }
            Turn::Handoff { utterance } => {
                self.agent_history.push(Speaker::User, utterance);
                self.transcript
                    .push(ChatMessage::assistant(reply.clone(), AgentTag::Movie));
                self.busy = false;
                if recognizer::is_recommendation_list(&reply) {
                    debug!("recommendations delivered");
                    self.phase = Phase::Done;
                    self.follow_up_pending = false;
                } else {
                    self.agent_history.push(Speaker::Curator, reply);
                    self.follow_up_pending = true;
                }
            }
            Turn::Chat => {
                self.transcript
                    .push(ChatMessage::assistant(reply, AgentTag::Music));
                self.busy = false;
            }
        }
    }

    fn after_music_reply(&mut self, reply: &str, handle: &Actor<Self>) {
        if self.maybe_start_handoff(reply) {
            self.busy = false;
            return;
        }
        if self.detector.should_finalize(&self.transcript) {
            // Still busy, the finalize turn belongs to the same send.
            self.start_finalize_turn(handle);
            return;
        }

        self.busy = false;
        if recognizer::looks_like_question(reply) {
            self.follow_up_pending = true;
            return;
        }
        if !self.follow_up_pending {
            let question = self.detector.build_follow_up_question(&self.transcript);
            self.transcript
                .push(ChatMessage::assistant(question, AgentTag::Music));
            self.follow_up_pending = true;
        }
    }

    /// Hands the conversation to the film curator if `reply` is a
    /// playlist. Returns `true` if it did.
    fn maybe_start_handoff(&mut self, reply: &str) -> bool {
        if self.phase != Phase::Gathering || !recognizer::is_playlist(reply) {
            return false;
        }

        debug!("playlist delivered, handing off");
        self.phase = Phase::FeedbackPending;
        self.transcript.push(ChatMessage::assistant(
            prompts::HANDOFF_QUESTION,
            AgentTag::Movie,
        ));
        self.agent_history.clear();
        self.agent_history
            .push(Speaker::Curator, prompts::HANDOFF_QUESTION);
        self.follow_up_pending = true;
        true
    }

    fn reset(&mut self) {
        for (task_id, task) in self.running_tasks.drain() {
            debug!("aborting turn {task_id}");
            task.abort();
        }
        self.epoch += 1;

        self.transcript =
            Transcript::with_greeting(prompts::GREETING, AgentTag::Music);
        self.input.clear();
        self.busy = false;
        self.last_error = None;
        self.phase = Phase::Gathering;
        self.follow_up_pending = false;
        self.agent_history.clear();
    }

    fn update_settings(&mut self, settings: Settings) {
        debug!("applying settings: {settings:?}");
        self.client = (self.client_factory)(&settings);
        self.settings = settings;
        self.reset();
    }

    /// Publishes the current state to the subscribers, if it changed.
    fn publish(&self) {
        let next = UiState {
            settings: self.settings.clone(),
            messages: self.transcript.messages().to_vec(),
            input: self.input.clone(),
            busy: self.busy,
            last_error: self.last_error.clone(),
            phase: self.phase,
        };
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[derive(Debug)]
pub struct SetInputMessage(pub String);

impl Message<OrchestratorState> for SetInputMessage {
    fn handle(self, state: &mut OrchestratorState, _handle: &Actor<OrchestratorState>) {
        state.input = self.0;
        state.publish();
    }
}

#[derive(Debug)]
pub struct SendInputMessage;

impl Message<OrchestratorState> for SendInputMessage {
    fn handle(self, state: &mut OrchestratorState, handle: &Actor<OrchestratorState>) {
        state.send_input(handle);
        state.publish();
    }
}

#[derive(Debug)]
pub struct NewChatMessage;

impl Message<OrchestratorState> for NewChatMessage {
    fn handle(self, state: &mut OrchestratorState, _handle: &Actor<OrchestratorState>) {
        debug!("starting a new chat");
        state.reset();
        state.publish();
    }
}

#[derive(Debug)]
pub struct UpdateSettingsMessage(pub Settings);

impl Message<OrchestratorState> for UpdateSettingsMessage {
    fn handle(self, state: &mut OrchestratorState, _handle: &Actor<OrchestratorState>) {
        state.update_settings(self.0);
        state.publish();
    }
}

#[derive(Debug)]
struct TurnFinishedMessage {
    task_id: u64,
    epoch: u64,
    turn: Turn,
    result: Result<String, CompletionError>,
}

impl Message<OrchestratorState> for TurnFinishedMessage {
    fn handle(self, state: &mut OrchestratorState, handle: &Actor<OrchestratorState>) {
        if self.epoch != state.epoch {
            debug!("dropping turn {} of a previous chat", self.task_id);
            return;
        }
        state.running_tasks.remove(&self.task_id);
        state.finish_turn(self.turn, self.result, handle);
        state.publish();
    }
}
