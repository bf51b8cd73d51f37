use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed completion.
///
/// A response yields zero or more [`ModelResponseEvent::MessageDelta`]s,
/// whose concatenation is the reply text, followed by exactly one
/// [`ModelResponseEvent::Completed`]. After that the response is exhausted.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// Returns `Poll::Ready(Ok(None))` once the response is exhausted, and
    /// keeps doing so if polled again. An error ends the response, callers
    /// should not poll it afterwards. When `Poll::Pending` is returned the
    /// task in `cx` is woken once more data may be available.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The reply is complete.
    Stop,
    /// The model stopped early, usually because of the output token limit.
    Incomplete,
}

/// An event of a [`ModelResponse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// No more text will follow.
    Completed(ModelFinishReason),
    /// The next piece of the reply text.
    MessageDelta(String),
}
