use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The system instructions.
    ///
    /// Instructions always travel out-of-band, providers must never fold
    /// them into `messages`.
    pub instructions: Option<String>,
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the role name used by most chat APIs.
    #[inline]
    pub fn role(&self) -> &'static str {
        match self {
            ModelMessage::User(_) => "user",
            ModelMessage::Assistant(_) => "assistant",
        }
    }

    /// Returns the text of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Assistant(text) => text,
        }
    }
}
