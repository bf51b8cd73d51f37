use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use moodreel_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type CompleteResult = Result<String, CompletionError>;
type BoxedCompleteFuture = Pin<Box<dyn Future<Output = CompleteResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedCompleteFuture + Send + Sync>;

/// The error returned by [`ModelClient::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionError {
    /// The request never completed, or the stream broke midway.
    Transport(String),
    /// The server answered with a non-success status.
    Http {
        /// The HTTP status code.
        status: u16,
        /// The error body, as reported by the provider.
        body: String,
    },
    /// The model answered with blank text.
    EmptyResponse,
}

impl CompletionError {
    fn from_provider<E: ModelProviderError>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::Http(status) => CompletionError::Http {
                status,
                body: err.to_string(),
            },
            _ => CompletionError::Transport(err.to_string()),
        }
    }
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Transport(msg) => write!(f, "{msg}"),
            CompletionError::Http { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            CompletionError::EmptyResponse => write!(f, "Empty response"),
        }
    }
}

impl Error for CompletionError {}

/// A wrapper around a model provider that provides a type-erased,
/// text-in text-out interface for the orchestrator.
///
/// Cloning is cheap, all clones share the same provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Creates a client that sends requests through `provider`.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {req:?}");
                    match fut.await {
                        Ok(resp) => collect_response::<P>(resp).await,
                        Err(err) => {
                            error!("request failed: {err}");
                            Err(CompletionError::from_provider(&err))
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Runs one completion and returns the trimmed reply.
    ///
    /// `override_input`, when given, takes the place of the trailing user
    /// turn of `history` (or is appended if `history` doesn't end with
    /// one). It only exists in the outgoing request.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming when the
    /// future is dropped.
    pub async fn complete(
        &self,
        history: Vec<ModelMessage>,
        override_input: Option<String>,
        system_prompt: String,
    ) -> Result<String, CompletionError> {
        let req = build_request(history, override_input, system_prompt);
        (self.handler_fn)(req).await
    }
}

fn build_request(
    mut messages: Vec<ModelMessage>,
    override_input: Option<String>,
    system_prompt: String,
) -> ModelRequest {
    if let Some(input) = override_input {
        if matches!(messages.last(), Some(ModelMessage::User(_))) {
            messages.pop();
        }
        messages.push(ModelMessage::User(input));
    }
    ModelRequest {
        instructions: Some(system_prompt),
        messages,
    }
}

async fn collect_response<P: ModelProvider>(resp: P::Response) -> CompleteResult {
    let mut text = String::new();
    let mut resp = pin!(resp);
    loop {
        let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("stream failed: {err}");
                CompletionError::from_provider(&err)
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(ModelFinishReason::Incomplete) => {
                warn!("the reply was cut short");
            }
            ModelResponseEvent::Completed(ModelFinishReason::Stop) => {}
        }
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(text.to_owned())
}

#[cfg(test)]
mod tests {
    use moodreel_test_model::{
        PresetEvent, PresetFailure, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn user(text: &str) -> ModelMessage {
        ModelMessage::User(text.to_owned())
    }

    fn assistant(text: &str) -> ModelMessage {
        ModelMessage::Assistant(text.to_owned())
    }

    #[tokio::test]
    async fn test_complete_collects_and_trims() {
        let provider = TestModelProvider::default();
        provider.push_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("  Which ".to_owned()),
            PresetEvent::MessageDelta("genres?\n".to_owned()),
        ]));
        let client = ModelClient::new(provider.clone());

        let reply = client
            .complete(vec![user("Hi")], None, "be nice".to_owned())
            .await
            .unwrap();
        assert_eq!(reply, "Which genres?");

        let requests = provider.requests();
        assert_eq!(requests[0].instructions.as_deref(), Some("be nice"));
        assert_eq!(requests[0].messages, vec![user("Hi")]);
    }

    #[tokio::test]
    async fn test_override_replaces_trailing_user_turn() {
        let provider = TestModelProvider::default();
        provider.push_text("ok");
        provider.push_text("ok");
        let client = ModelClient::new(provider.clone());

        let history = vec![assistant("Hello"), user("rock")];
        client
            .complete(history, Some("hidden".to_owned()), String::new())
            .await
            .unwrap();
        let history = vec![assistant("Hello"), user("rock"), assistant("Nice")];
        client
            .complete(history, Some("hidden".to_owned()), String::new())
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].messages, vec![assistant("Hello"), user("hidden")]);
        assert_eq!(
            requests[1].messages,
            vec![
                assistant("Hello"),
                user("rock"),
                assistant("Nice"),
                user("hidden"),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let provider = TestModelProvider::default();
        provider.push_text(" \n ");
        let client = ModelClient::new(provider);

        let err = client
            .complete(vec![user("Hi")], None, String::new())
            .await
            .unwrap_err();
        assert_eq!(err, CompletionError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let provider = TestModelProvider::default();
        provider.push_response(PresetResponse::failing(PresetFailure::Http(401)));
        provider.push_response(PresetResponse::failing(PresetFailure::Transport));
        provider.push_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("1. ".to_owned()),
            PresetEvent::StreamError,
        ]));
        let client = ModelClient::new(provider);

        let err = client
            .complete(vec![user("Hi")], None, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Http { status: 401, .. }));

        // The last request runs out of presets, which the provider reports
        // as a plain error too.
        for _ in 0..3 {
            let err = client
                .complete(vec![user("Hi")], None, String::new())
                .await
                .unwrap_err();
            assert!(matches!(err, CompletionError::Transport(_)));
        }
    }
}
