use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error reported by a provider, classified by [`ErrorKind`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A completion backend, typically one endpoint with fixed credentials.
///
/// Providers are treated as immutable: when the connection settings
/// change, callers build a new provider and drop the old one, possibly
/// while one of its requests is still streaming.
pub trait ModelProvider: Send + Sync {
    /// The error of both the request and its response stream.
    type Error: ModelProviderError;

    /// The streamed response.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends `req`, resolving once the response starts streaming.
    ///
    /// The returned future must not borrow `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
