use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use moodreel_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{StreamEvent, StructuredAnswer};

struct PartialState {
    sse: Sse,
    // In structured mode the deltas are JSON fragments, they are held back
    // and flattened once the response completes.
    structured: bool,
    structured_buf: String,
    // Events decided but not yet returned, drained before reading on.
    pending_events: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn finish(&mut self, reason: ModelFinishReason) {
        self.finished = true;
        if self.structured && !self.structured_buf.is_empty() {
            let text = flatten_structured(&self.structured_buf);
            self.pending_events
                .push_back(ModelResponseEvent::MessageDelta(text));
        }
        self.pending_events
            .push_back(ModelResponseEvent::Completed(reason));
    }
}

fn flatten_structured(raw: &str) -> String {
    match serde_json::from_str::<StructuredAnswer>(raw) {
        Ok(answer) => answer.flatten(),
        Err(err) => {
            warn!("structured answer is malformed, using raw text: {err}");
            raw.to_owned()
        }
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse, structured: bool) -> Self {
        let partial_state = PartialState {
            sse,
            structured,
            structured_buf: Default::default(),
            pending_events: Default::default(),
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let data = match partial_state.sse.next_event().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                // Some compatible servers just close the stream.
                debug!("stream ended without a completion event");
                partial_state.finish(ModelFinishReason::Stop);
                continue;
            }
            Err(SseError::Chunks(err)) => {
                return Err(Error::new(err.0, ErrorKind::Transport));
            }
            Err(SseError::InvalidPayload) => {
                return Err(Error::new(
                    "stream is not valid UTF-8",
                    ErrorKind::InvalidResponse,
                ));
            }
        };
        trace!("got sse event: {data}");
        if data == "[DONE]" {
            partial_state.finish(ModelFinishReason::Stop);
            continue;
        }

        let event = serde_json::from_str::<StreamEvent>(&data).map_err(|err| {
            Error::new(format!("{err}"), ErrorKind::InvalidResponse)
        })?;
        match event {
            StreamEvent::OutputTextDelta { delta } if partial_state.structured => {
                partial_state.structured_buf.push_str(&delta);
            }
            StreamEvent::OutputTextDelta { delta } => {
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(delta)),
                    partial_state,
                ));
            }
            StreamEvent::Completed => {
                partial_state.finish(ModelFinishReason::Stop);
            }
            StreamEvent::Incomplete => {
                partial_state.finish(ModelFinishReason::Incomplete);
            }
            StreamEvent::Failed { response } => {
                let message = response
                    .error
                    .map(|err| err.message)
                    .unwrap_or_else(|| "response failed".to_owned());
                return Err(Error::new(message, ErrorKind::Other));
            }
            StreamEvent::Error { message } => {
                return Err(Error::new(message, ErrorKind::Other));
            }
            StreamEvent::Unknown => {}
        }
    }
}
