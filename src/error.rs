//! Unified error type.

use thiserror::Error;

/// A boxed, thread-safe error from user code or a body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand for `Result<T, wick::Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by wick's fallible operations.
///
/// A route that does not match is not an error: [`Router::handle`] reports it
/// as `Ok(false)`. Everything raised by middleware or a handler travels up
/// through the router unchanged, so the server (or your own caller) decides
/// how it becomes a response.
///
/// [`Router::handle`]: crate::Router::handle
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid route template `{template}`: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("form: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Wraps an application failure raised inside a handler or middleware.
    ///
    /// ```rust
    /// let err = wick::Error::handler("user store unavailable");
    /// assert_eq!(err.to_string(), "user store unavailable");
    /// ```
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}
