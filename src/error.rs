//! Error types for the request pipeline.
//!
//! Every failure a call can produce is a variant of [`Error`], so callers can
//! distinguish "the network failed" from "the server said no" from "the bytes
//! arrived but could not be decoded". Nothing is swallowed: logging is a side
//! channel and never turns into an error.

use http::StatusCode;

use crate::transport::TransportError;

/// The main error type for HTTP calls.
///
/// # Examples
///
/// ```no_run
/// use sturdyhttp::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
///
/// match client.get("https://api.example.com/health", vec![]).await {
///     Ok(body) => println!("Success: {body}"),
///     Err(Error::Status { status, text }) => {
///         eprintln!("HTTP error {status}: {text}");
///     }
///     Err(Error::Transport(e)) if e.is_temporary() => {
///         eprintln!("Transient network failure: {e}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level exchange failed before a complete response arrived.
    ///
    /// The inner [`TransportError`] carries a `temporary` flag that the
    /// default retry classifier inspects.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server completed the exchange with a status outside 200-299.
    ///
    /// This is a protocol failure, not a transport failure, and is not
    /// retried by the default classifier.
    #[error("bad http status {status}: {text}")]
    Status {
        /// The HTTP status code.
        status: StatusCode,
        /// The canonical status text, e.g. `Not Found`.
        text: String,
    },

    /// A request option rejected the request before any network I/O.
    ///
    /// Always fatal for the call; the request was never sent, so there is
    /// nothing to retry.
    #[error("request option failed: {0}")]
    OptionApply(String),

    /// The request body could not be serialized. Surfaced before any
    /// network call is made.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// The response body could not be decompressed, was not valid UTF-8, or
    /// a typed wrapper failed to deserialize it.
    ///
    /// The bytes were already received successfully, so this is never
    /// retried.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The call was aborted by a caller-supplied cancellation token.
    ///
    /// Distinguished from [`Error::Transport`] so callers can tell "we gave
    /// up" apart from "the server or network failed".
    #[error("call cancelled")]
    Cancelled,

    /// Writing a downloaded payload to its destination failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The target URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The client was misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for transport errors flagged as transient.
    ///
    /// This is what the default classifier uses to decide between `Retry`
    /// and `Fail`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sturdyhttp::{Error, TransportError};
    ///
    /// let err = Error::Transport(TransportError::temporary("connection reset"));
    /// assert!(err.is_temporary());
    ///
    /// let err = Error::Transport(TransportError::permanent("dns failure"));
    /// assert!(!err.is_temporary());
    /// ```
    pub fn is_temporary(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_temporary())
    }

    /// Returns `true` if the call was aborted by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A specialized `Result` type for HTTP calls.
pub type Result<T> = std::result::Result<T, Error>;
