use moodreel_core::{
    ActorDeadError, Orchestrator, OrchestratorBuilder, Settings, UiState,
};
use moodreel_model::ModelProvider;
use moodreel_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::sync::watch;
use tokio::task::JoinHandle;

type StateCallback = Box<dyn Fn(&UiState) + Send + Sync>;

/// Builds the OpenAI provider described by `settings`.
///
/// A blank base URL falls back to the provider's default one. A custom
/// provider without a base URL yields a provider whose requests fail.
pub fn openai_provider(settings: &Settings) -> OpenAIProvider {
    let config = OpenAIConfigBuilder::with_api_key(settings.api_key.trim())
        .with_model(settings.model.trim())
        .with_base_url(settings.effective_base_url().unwrap_or_default())
        .with_structured_output(settings.strict_output_mode)
        .build();
    OpenAIProvider::new(config)
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    orchestrator_builder: OrchestratorBuilder,
    on_state: Option<StateCallback>,
}

impl SessionBuilder {
    /// Creates a session builder talking to the endpoint described by
    /// `settings`.
    ///
    /// The provider is rebuilt with [`openai_provider`] whenever the
    /// settings change.
    pub fn with_settings(settings: Settings) -> Self {
        let orchestrator_builder =
            OrchestratorBuilder::with_provider_factory(openai_provider)
                .with_settings(settings);
        Self {
            orchestrator_builder,
            on_state: None,
        }
    }

    /// Creates a session builder with a specified model provider, kept
    /// across settings changes.
    pub fn with_model_provider<M: ModelProvider + Clone + 'static>(
        provider: M,
    ) -> Self {
        Self {
            orchestrator_builder: OrchestratorBuilder::with_model_provider(
                provider,
            ),
            on_state: None,
        }
    }

    /// Sets the initial settings.
    #[inline]
    pub fn with_initial_settings(mut self, settings: Settings) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_settings(settings);
        self
    }

    /// Attaches a callback to be invoked with every published state,
    /// starting with the initial one.
    ///
    /// The callback runs on a Tokio task. States published in a quick
    /// succession may be coalesced, the latest one is always delivered.
    #[inline]
    pub fn on_state(
        mut self,
        on_state: impl Fn(&UiState) + Send + Sync + 'static,
    ) -> Self {
        self.on_state = Some(Box::new(on_state));
        self
    }

    /// Builds a new session.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Session {
        let orchestrator = self.orchestrator_builder.build();
        let watcher = self
            .on_state
            .map(|on_state| tokio::spawn(watch_state(orchestrator.clone(), on_state)));

        Session {
            orchestrator,
            watcher,
        }
    }
}

async fn watch_state(orchestrator: Orchestrator, on_state: StateCallback) {
    let Ok(mut state_rx) = orchestrator.subscribe().await else {
        return;
    };
    // The receiver alone must not keep the conversation alive.
    drop(orchestrator);

    loop {
        let state = state_rx.borrow_and_update().clone();
        on_state(&state);
        if state_rx.changed().await.is_err() {
            debug!("conversation stopped, no more states");
            break;
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// The session holds a fully configured conversation, and it is basically a
/// wrapper around [`Orchestrator`].
pub struct Session {
    orchestrator: Orchestrator,
    watcher: Option<JoinHandle<()>>,
}

impl Session {
    /// Replaces the text of the input box.
    #[inline]
    pub fn set_input(&self, text: &str) -> Result<(), ActorDeadError> {
        self.orchestrator.set_input(text)
    }

    /// Sends the input box as a user message.
    #[inline]
    pub fn send(&self) -> Result<(), ActorDeadError> {
        self.orchestrator.send()
    }

    /// Starts a new chat.
    #[inline]
    pub fn new_chat(&self) -> Result<(), ActorDeadError> {
        self.orchestrator.new_chat()
    }

    /// Applies new settings, which also starts a new chat.
    #[inline]
    pub fn update_settings(&self, settings: Settings) -> Result<(), ActorDeadError> {
        self.orchestrator.update_settings(settings)
    }

    /// Returns a receiver that observes every published state.
    #[inline]
    pub async fn subscribe(&self) -> Result<watch::Receiver<UiState>, ActorDeadError> {
        self.orchestrator.subscribe().await
    }

    /// Returns the current state.
    ///
    /// The state reflects every intent sent before this call.
    #[inline]
    pub async fn snapshot(&self) -> Result<UiState, ActorDeadError> {
        self.orchestrator.snapshot().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
