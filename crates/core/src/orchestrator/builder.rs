use std::sync::Arc;

use moodreel_model::ModelProvider;

use super::Orchestrator;
use crate::model_client::ModelClient;
use crate::settings::Settings;
use crate::signal::{LexicalDetector, SignalDetector};

pub(super) type ClientFactory =
    Box<dyn Fn(&Settings) -> ModelClient + Send + Sync>;

/// [`Orchestrator`] builder.
pub struct OrchestratorBuilder {
    pub(super) client_factory: ClientFactory,
    pub(super) settings: Settings,
    pub(super) detector: Arc<dyn SignalDetector>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with a function that builds the model
    /// provider from the settings.
    ///
    /// The function runs once when the orchestrator starts and again on
    /// every settings change.
    #[inline]
    pub fn with_provider_factory<P, F>(factory: F) -> Self
    where
        P: ModelProvider + 'static,
        F: Fn(&Settings) -> P + Send + Sync + 'static,
    {
        Self {
            client_factory: Box::new(move |settings| {
                ModelClient::new(factory(settings))
            }),
            settings: Default::default(),
            detector: Arc::new(LexicalDetector),
        }
    }

    /// Creates a new builder with a fixed model provider, reused across
    /// settings changes.
    #[inline]
    pub fn with_model_provider<P>(provider: P) -> Self
    where
        P: ModelProvider + Clone + 'static,
    {
        Self::with_provider_factory(move |_| provider.clone())
    }

    /// Sets the initial settings.
    #[inline]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the default [`LexicalDetector`].
    #[inline]
    pub fn with_detector<D: SignalDetector + 'static>(mut self, detector: D) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    /// Builds the orchestrator.
    ///
    /// Must be called within a Tokio runtime.
    #[inline]
    pub fn build(self) -> Orchestrator {
        Orchestrator::spawn_from_builder(self)
    }
}
