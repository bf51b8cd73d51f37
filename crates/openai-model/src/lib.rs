//! A model provider for the OpenAI Responses API and compatible endpoints.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use mime::Mime;
use moodreel_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use reqwest::{Client, RequestBuilder, Response, header};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use response::OpenAIResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    ///
    /// For HTTP errors this is the response body.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI Responses API model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build the HTTP client, using defaults: {err}");
                Client::new()
            });
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        async move {
            let Some(url) = config.responses_url() else {
                return Err(Error::new("base URL is not set", ErrorKind::Other));
            };

            let backoff = ExponentialBackoffBuilder::new()
                .with_max_elapsed_time(Some(config.max_retry_elapsed))
                .build();
            let resp = backoff::future::retry(backoff, || {
                let req = client
                    .post(&url)
                    .bearer_auth(&config.api_key)
                    .header(header::ACCEPT, "text/event-stream")
                    .json(&body);
                connect(req)
            })
            .await?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .is_some_and(|m: Mime| {
                    m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
                });
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::InvalidResponse,
                ));
            }

            // Here we got a successful response.
            let sse = Sse::new(Chunks::from_response(resp));
            Ok(OpenAIResponse::from_sse(sse, config.structured_output))
        }
    }
}

/// Sends the request, failing on error statuses before any byte of the
/// stream is consumed.
async fn connect(req: RequestBuilder) -> Result<Response, backoff::Error<Error>> {
    let resp = req.send().await.map_err(|err| {
        let kind = if err.is_builder() {
            ErrorKind::Other
        } else {
            ErrorKind::Transport
        };
        retry_if_transient(Error::new(err.to_string(), kind))
    })?;

    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        let body = resp.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body
        };
        let err = Error::new(message, ErrorKind::Http(status.as_u16()));
        return Err(retry_if_transient(err));
    }
    Ok(resp)
}

fn retry_if_transient(err: Error) -> backoff::Error<Error> {
    if err.kind.is_transient() {
        warn!("request failed ({}), may retry: {err}", err.kind);
        backoff::Error::transient(err)
    } else {
        error!("request failed ({}): {err}", err.kind);
        backoff::Error::permanent(err)
    }
}
