//! Error types for the API client.

/// Errors that can occur when making API requests.
///
/// The enum is `Clone` (it carries messages, not error sources) so that one
/// in-flight request outcome can be shared by every caller waiting on the
/// same de-duplicated request.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// Malformed caller input, such as an empty id set or an invalid base URL.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The endpoint requires an access token but the connection has none.
    #[error("endpoint {0} requires an access token")]
    AuthenticationRequired(String),
    /// A transport-layer failure: connection refused, timeout, or the request
    /// was aborted. Nothing is cached on this path.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// Whether the failure was a request timeout.
        timed_out: bool,
    },
    /// The API returned a non-success status. The message is taken from the
    /// error body when it is parseable, otherwise from the raw body.
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },
    /// A success response body could not be decoded into the expected type.
    #[error("failed to decode response body: {message}")]
    Decode { message: String },
}
