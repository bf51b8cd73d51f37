//! Dialogue orchestration for a two-agent curation chat.
//!
//! A music-curation agent gathers the user's taste until enough signals
//! are known, asks the model for a ten-track playlist, and then hands the
//! conversation to a film-curation agent that recommends five movies
//! matching the playlist's mood.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod agent_history;
mod model_client;
mod orchestrator;
mod prompts;
pub mod recognizer;
mod settings;
pub mod signal;
pub mod transcript;
mod ui_state;

pub use model_client::{CompletionError, ModelClient};
pub use moodreel_actor::ActorDeadError;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, Phase};
pub use settings::{Provider, Settings};
pub use ui_state::UiState;
