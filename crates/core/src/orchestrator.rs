mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use moodreel_actor::{ActorDeadError, define_actor};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::agent_history::AgentHistory;
use crate::model_client::ModelClient;
use crate::prompts;
use crate::settings::Settings;
use crate::signal::SignalDetector;
use crate::transcript::{AgentTag, Transcript};
use crate::ui_state::UiState;
pub use builder::OrchestratorBuilder;
use builder::ClientFactory;
use state::{
    NewChatMessage, SendInputMessage, SetInputMessage, UpdateSettingsMessage,
};

/// Which agent leads the conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The music agent is learning the user's taste.
    #[default]
    Gathering,
    /// A playlist was delivered, the film curator waits for feedback.
    FeedbackPending,
    /// The film curator delivered its recommendations.
    Done,
}

define_actor! {
    /// A two-agent conversation.
    ///
    /// Every intent is a message handled on the orchestrator's own task,
    /// so intents sent from different threads are applied one at a time in
    /// the order they arrive. Model calls run on spawned tasks and report
    /// back with a message, the orchestrator keeps handling intents while
    /// a turn is in flight.
    ///
    /// The state is observed through [`Orchestrator::subscribe`].
    #[wrapper_type(Orchestrator)]
    pub struct OrchestratorState {
        client: ModelClient,
        client_factory: ClientFactory,
        detector: Arc<dyn SignalDetector>,
        settings: Settings,

        transcript: Transcript,
        input: String,
        busy: bool,
        last_error: Option<String>,
        phase: Phase,
        follow_up_pending: bool,
        agent_history: AgentHistory,

        state_tx: watch::Sender<UiState>,
        running_tasks: HashMap<u64, JoinHandle<()>>,
        next_task_id: u64,
        // Bumped on every reset, results of older turns are dropped.
        epoch: u64,
    }
}

impl Orchestrator {
    /// Replaces the text of the input box.
    #[inline]
    pub fn set_input<S: Into<String>>(&self, text: S) -> Result<(), ActorDeadError> {
        self.handle().send(SetInputMessage(text.into()))
    }

    /// Sends the input box as a user message.
    ///
    /// Does nothing if the input is blank or a turn is in flight.
    #[inline]
    pub fn send(&self) -> Result<(), ActorDeadError> {
        self.handle().send(SendInputMessage)
    }

    /// Drops the conversation and starts over with the greeting.
    #[inline]
    pub fn new_chat(&self) -> Result<(), ActorDeadError> {
        self.handle().send(NewChatMessage)
    }

    /// Applies new settings.
    ///
    /// The model client is rebuilt from the settings and the conversation
    /// starts over.
    #[inline]
    pub fn update_settings(&self, settings: Settings) -> Result<(), ActorDeadError> {
        self.handle().send(UpdateSettingsMessage(settings))
    }

    /// Returns a receiver that observes every published state.
    ///
    /// The receiver starts with the state as of all intents sent before
    /// this call.
    pub async fn subscribe(&self) -> Result<watch::Receiver<UiState>, ActorDeadError> {
        self.handle().query(|state| state.state_tx.subscribe()).await
    }

    /// Returns the current state.
    pub async fn snapshot(&self) -> Result<UiState, ActorDeadError> {
        self.handle()
            .query(|state| state.state_tx.borrow().clone())
            .await
    }
}

impl Orchestrator {
    fn spawn_from_builder(builder: OrchestratorBuilder) -> Self {
        let OrchestratorBuilder {
            client_factory,
            settings,
            detector,
        } = builder;

        let client = client_factory(&settings);
        let transcript =
            Transcript::with_greeting(prompts::GREETING, AgentTag::Music);
        let (state_tx, _) = watch::channel(UiState {
            settings: settings.clone(),
            messages: transcript.messages().to_vec(),
            ..Default::default()
        });

        let state = OrchestratorState {
            client,
            client_factory,
            detector,
            settings,
            transcript,
            input: Default::default(),
            busy: false,
            last_error: None,
            phase: Default::default(),
            follow_up_pending: false,
            agent_history: Default::default(),
            state_tx,
            running_tasks: Default::default(),
            next_task_id: 1,
            epoch: 0,
        };
        Self::spawn(state, Some("orchestrator"))
    }
}
