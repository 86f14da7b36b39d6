//! The transport seam: one network exchange behind a replaceable trait.
//!
//! The client never talks to the network directly. It hands a
//! [`TransportRequest`] to a [`Transport`] and gets back either a
//! [`TransportResponse`] (status, headers, body stream) or a
//! [`TransportError`] whose `temporary` flag feeds retry classification.
//! The default implementation is [`ReqwestTransport`]; tests inject their
//! own, and [`LoggingTransport`] can decorate any of them with wire-level
//! debug logging.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// A streamed response body: chunks of bytes or a transport failure mid-read.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, TransportError>> + Send>>;

/// A network-level failure from one exchange.
///
/// The `temporary` flag distinguishes transient failures (connect refusals,
/// timeouts, resets) from permanent ones; the default retry classifier only
/// retries temporary errors.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    temporary: bool,
}

impl TransportError {
    /// Creates a transport error with an explicit `temporary` flag.
    pub fn new(message: impl Into<String>, temporary: bool) -> Self {
        Self {
            message: message.into(),
            temporary,
        }
    }

    /// Creates a transient error, eligible for retry.
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::new(message, true)
    }

    /// Creates a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(message, false)
    }

    /// Returns `true` if this failure is transient.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One fully-prepared wire request: everything a transport needs for a
/// single exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The target URL, query already encoded.
    pub url: Url,
    /// Headers after all request options were applied.
    pub headers: HeaderMap,
    /// The request body; empty for body-less requests. The same bytes are
    /// resent on every retry.
    pub body: Bytes,
    /// Bound on this single exchange.
    pub timeout: Duration,
}

/// The successful half of one exchange.
pub struct TransportResponse {
    /// The response status.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body as a stream of chunks. Dropping the stream releases
    /// the underlying connection.
    pub body: BodyStream,
}

impl TransportResponse {
    /// Reads the whole body stream into memory.
    pub async fn collect_body(self) -> std::result::Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.into())
    }
}

/// Performs one network exchange.
///
/// Implementations may pool connections internally and be shared across
/// clients; the pipeline only issues logical sends and consumes the returned
/// body. Custom implementations are the injection point for tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response head plus a body stream.
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// The default [`Transport`], backed by a pooled [`reqwest::Client`].
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with reqwest's default configuration.
    pub fn new() -> crate::Result<Self> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            crate::Error::Configuration(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { http })
    }

    /// Wraps an already-configured [`reqwest::Client`].
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(classify_reqwest_error))
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Maps a reqwest failure onto the temporary/permanent split. Timeouts and
/// connect-level failures are transient; everything else is not.
fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    let temporary = error.is_timeout() || error.is_connect();
    TransportError::new(error.to_string(), temporary)
}

/// A [`Transport`] decorator that logs every wire exchange at debug level
/// before delegating.
///
/// Observability only: it never alters the request, the response, or retry
/// behavior.
pub struct LoggingTransport {
    inner: Arc<dyn Transport>,
}

impl LoggingTransport {
    /// Wraps `inner` with request logging.
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl Transport for LoggingTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            body = %String::from_utf8_lossy(&request.body),
            "do request"
        );
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_flag_round_trips() {
        assert!(TransportError::temporary("reset").is_temporary());
        assert!(!TransportError::permanent("refused").is_temporary());
        assert_eq!(TransportError::temporary("reset").message(), "reset");
    }

    #[tokio::test]
    async fn collect_body_concatenates_chunks() {
        let chunks: Vec<std::result::Result<Bytes, TransportError>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let response = TransportResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: futures::stream::iter(chunks).boxed(),
        };
        let body = response.collect_body().await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn collect_body_surfaces_mid_stream_failure() {
        let chunks: Vec<std::result::Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(TransportError::temporary("connection reset")),
        ];
        let response = TransportResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: futures::stream::iter(chunks).boxed(),
        };
        let err = response.collect_body().await.unwrap_err();
        assert!(err.is_temporary());
    }
}
