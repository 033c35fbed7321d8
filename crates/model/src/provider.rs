use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the failure, so callers can decide whether a retry makes
    /// sense.
    fn kind(&self) -> ErrorKind;
}

/// A chat completion endpoint.
///
/// Every call receives the complete transcript, the provider must not keep
/// any conversation state between calls. A provider may be shared by many
/// conversations at once.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The streamed completion.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts one completion for `req`.
    ///
    /// The returned future owns everything it needs, so it can outlive
    /// the borrowed request.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
