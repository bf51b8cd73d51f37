//! Visible conversation types.

use moodreel_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human.
    User,
    /// One of the curation agents.
    Assistant,
}

/// The curation agent that authored an assistant message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTag {
    /// The music-curation agent.
    Music,
    /// The film-curation agent.
    Movie,
}

/// A message in the visible transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    agent_tag: Option<AgentTag>,
}

impl Message {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            agent_tag: None,
        }
    }

    /// Creates an assistant message authored by `agent`.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S, agent: AgentTag) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            agent_tag: Some(agent),
        }
    }

    /// Returns the role of the author.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of the message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the agent that wrote this message, `None` for user messages.
    #[inline]
    pub fn agent_tag(&self) -> Option<AgentTag> {
        self.agent_tag
    }

    #[inline]
    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self.role {
            Role::User => ModelMessage::User(self.content.clone()),
            Role::Assistant => ModelMessage::Assistant(self.content.clone()),
        }
    }
}

/// The ordered, append-only list of visible messages.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates a transcript holding a single greeting from `agent`.
    #[inline]
    pub fn with_greeting<S: Into<String>>(greeting: S, agent: AgentTag) -> Self {
        Self {
            messages: vec![Message::assistant(greeting, agent)],
        }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Returns all messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates over user messages, most recent first.
    pub fn recent_user_messages(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .rev()
            .filter(|msg| msg.role == Role::User)
            .map(|msg| msg.content.as_str())
    }

    /// Returns the most recent assistant message from `agent` that
    /// satisfies `pred`.
    pub fn last_from_agent(
        &self,
        agent: AgentTag,
        pred: impl Fn(&str) -> bool,
    ) -> Option<&Message> {
        self.messages.iter().rev().find(|msg| {
            msg.role == Role::Assistant
                && msg.agent_tag == Some(agent)
                && pred(&msg.content)
        })
    }

    pub(crate) fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.messages.iter().map(Message::to_model_message).collect()
    }
}

impl FromIterator<Message> for Transcript {
    fn from_iter<T: IntoIterator<Item = Message>>(iter: T) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}
