use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

/// The upstream service a [`Settings`] value points to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI.
    #[default]
    OpenAI,
    /// OpenRouter, speaking the same API dialect.
    OpenRouter,
    /// Any other compatible endpoint, `base_url` must be set.
    Custom,
}

impl Provider {
    /// Returns the base URL used when the settings leave it blank.
    #[inline]
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("https://api.openai.com/v1"),
            Provider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Provider::Custom => None,
        }
    }
}

/// Connection and prompt settings of a conversation.
///
/// The orchestrator treats the value as opaque: it only passes it to the
/// client factory and reads the system prompt override. Persisting it is
/// up to the host, any serde format works.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The upstream service.
    pub provider: Provider,
    /// Root URL of the API, for example `https://api.openai.com/v1`.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Replaces the built-in music agent prompt when not blank.
    pub system_prompt_override: String,
    /// Asks the model for schema-constrained output.
    pub strict_output_mode: bool,
}

impl Settings {
    /// Returns the base URL to use, falling back to the provider default.
    pub fn effective_base_url(&self) -> Option<&str> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return self.provider.default_base_url();
        }
        Some(base_url.trim_end_matches('/'))
    }

    /// Returns the system prompt override if one is set.
    #[inline]
    pub fn system_prompt_override(&self) -> Option<&str> {
        let prompt = self.system_prompt_override.trim();
        (!prompt.is_empty()).then_some(prompt)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            base_url: "https://api.openai.com/v1".to_owned(),
            api_key: String::new(),
            model: "gpt-4.1-mini".to_owned(),
            system_prompt_override: String::new(),
            strict_output_mode: false,
        }
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("system_prompt_override", &self.system_prompt_override)
            .field("strict_output_mode", &self.strict_output_mode)
            .finish()
    }
}
