use std::fmt::{self, Debug};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
    structured_output: bool,
    max_retry_elapsed: Duration,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            temperature: 0.7,
            max_output_tokens: 512,
            structured_output: false,
            max_retry_elapsed: Duration::from_secs(10),
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL, for example `https://openrouter.ai/api/v1`.
    ///
    /// Requests are sent to `{base_url}/responses`. An empty URL makes
    /// every request fail.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the sampling temperature, 0.7 by default.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the output token limit, 512 by default.
    #[inline]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Asks the model for a `{title, description}` JSON object, which is
    /// flattened back to text when the response completes.
    #[inline]
    pub fn with_structured_output(mut self, structured_output: bool) -> Self {
        self.structured_output = structured_output;
        self
    }

    /// Sets how long transient connection failures are retried, 10
    /// seconds by default. Zero disables retries.
    #[inline]
    pub fn with_max_retry_elapsed(mut self, max_retry_elapsed: Duration) -> Self {
        self.max_retry_elapsed = max_retry_elapsed;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            structured_output: self.structured_output,
            max_retry_elapsed: self.max_retry_elapsed,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("structured_output", &self.structured_output)
            .field("max_retry_elapsed", &self.max_retry_elapsed)
            .finish()
    }
}

/// Configuration for the OpenAI Responses API provider.
#[derive(Clone, PartialEq)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: u32,
    pub(crate) structured_output: bool,
    pub(crate) max_retry_elapsed: Duration,
}

impl OpenAIConfig {
    pub(crate) fn responses_url(&self) -> Option<String> {
        (!self.base_url.is_empty()).then(|| format!("{}/responses", self.base_url))
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("structured_output", &self.structured_output)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_url() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret").build();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(
            config.responses_url().as_deref(),
            Some("https://api.openai.com/v1/responses")
        );
        assert!(!format!("{config:?}").contains("sk-secret"));

        let config = OpenAIConfigBuilder::with_api_key("sk")
            .with_base_url("https://openrouter.ai/api/v1/ ")
            .build();
        assert_eq!(
            config.responses_url().as_deref(),
            Some("https://openrouter.ai/api/v1/responses")
        );

        let config = OpenAIConfigBuilder::with_api_key("sk")
            .with_base_url("")
            .build();
        assert!(config.responses_url().is_none());
    }
}
