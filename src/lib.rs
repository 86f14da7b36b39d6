//! # sturdyhttp - a resilient HTTP request client
//!
//! `sturdyhttp` layers the cross-cutting concerns of outbound HTTP calls -
//! retry with pluggable failure classification, transparent gzip decoding,
//! structured request/response logging, JSON/XML content negotiation, and
//! per-request customization - over a replaceable transport, so application
//! code does not re-implement them at every call site.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use sturdyhttp::options::set_query;
//! use sturdyhttp::retry::backoff;
//! use sturdyhttp::Client;
//!
//! #[tokio::main]
//! async fn main() -> sturdyhttp::Result<()> {
//!     let client = Client::builder()
//!         .timeout(Duration::from_secs(5))
//!         .retry(backoff::exponential(
//!             Duration::from_millis(100),
//!             Duration::from_secs(2),
//!             3,
//!             true,
//!         ))
//!         .build()?;
//!
//!     let body = client
//!         .get("https://api.example.com/greeting", vec![set_query("hello", "world")])
//!         .await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```
//!
//! ## The pipeline
//!
//! A call flows through: build request → apply options (client defaults
//! first, then per-call options, in order, fail-fast) → attempt loop
//! ([`Transport`] + [`RetryClassifier`] + backoff sequence) → response
//! decode (status check, gzip) → result or typed [`Error`]. The transport,
//! the classifier, and the logging context are all injection points; the
//! loop itself carries no policy.
//!
//! ## Retry
//!
//! Without a classifier there is exactly one attempt. With one, each failed
//! attempt is classified as `Succeed`, `Retry`, or `Fail`; `Retry` sleeps
//! the next delay in the configured backoff sequence and re-attempts, and
//! when the sequence runs out the last attempt's error is returned as-is.
//! The default [`retry::TransportClassifier`] retries only transport errors
//! flagged temporary; a non-2xx status is a protocol failure and is not
//! retried unless you install a classifier that says otherwise.
//!
//! ```no_run
//! use std::time::Duration;
//! use sturdyhttp::retry::{backoff, StreamResetClassifier};
//! use sturdyhttp::Client;
//!
//! # fn example() -> sturdyhttp::Result<()> {
//! // Also mask transient HTTP/2 stream resets.
//! let client = Client::builder()
//!     .retry(backoff::constant(Duration::from_millis(200), 2))
//!     .classifier(StreamResetClassifier)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Typed calls
//!
//! [`Client::json`] and [`Client::xml`] return codec wrappers that marshal
//! a typed body, force the matching content type, and unmarshal the typed
//! result, distinguishing [`Error::Encode`] and [`Error::Decode`] from
//! transport and HTTP failures.
//!
//! ## Errors
//!
//! Every failure mode has its own [`Error`] variant: option application,
//! transport (with a temporary flag), non-2xx status, encode, decode,
//! cancellation, and download I/O. Nothing is swallowed, and logging never
//! escalates into a call failure.

mod body;
mod client;
mod error;
mod json;
pub mod options;
pub mod retry;
pub mod transport;
mod xml;

pub use client::{Client, ClientBuilder, LogContextFn, RequestSpec, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use json::JsonClient;
pub use options::RequestOption;
pub use retry::{RetryClassifier, RetryDecision, StreamResetClassifier, TransportClassifier};
pub use transport::{
    BodyStream, LoggingTransport, ReqwestTransport, Transport, TransportError, TransportRequest,
    TransportResponse,
};
pub use xml::XmlClient;

// Re-exported so callers can cancel calls without depending on tokio-util
// directly.
pub use tokio_util::sync::CancellationToken;
