use serde::Serialize;

use crate::orchestrator::Phase;
use crate::settings::Settings;
use crate::transcript::Message;

/// An observable snapshot of a conversation.
///
/// A new snapshot is published after every mutation, see
/// [`Orchestrator::subscribe`](crate::Orchestrator::subscribe).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    /// The settings in use.
    pub settings: Settings,
    /// The visible transcript, oldest first.
    pub messages: Vec<Message>,
    /// The text in the input box.
    pub input: String,
    /// `true` while a turn is in flight. Sends are ignored meanwhile.
    pub busy: bool,
    /// The error of the last failed turn, cleared by the next send.
    pub last_error: Option<String>,
    /// Which agent currently leads the conversation.
    pub phase: Phase,
}
