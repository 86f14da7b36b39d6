//! HTTP client with a classifier-driven retry loop.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure the transport, timeout, default options, retry policy, and
//! logging context, then issue calls through the verb methods or the
//! generic [`Client::execute`].

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use crate::body;
use crate::options::{PendingRequest, RequestOption};
use crate::retry::{RetryClassifier, RetryDecision, TransportClassifier};
use crate::transport::{LoggingTransport, ReqwestTransport, Transport, TransportRequest};
use crate::{Error, Result};

/// Default per-attempt timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Derives a per-call [`tracing::Span`] from the prepared request; every log
/// event for the call runs inside it.
pub type LogContextFn = Arc<dyn Fn(&PendingRequest) -> tracing::Span + Send + Sync>;

/// One logical call: method, URL, body bytes, per-call options, and
/// per-call overrides.
///
/// Immutable once dispatch begins. Options are applied after the client's
/// defaults, so per-call options can override defaults; the resulting
/// headers and query are reused unchanged for every retry, and the same
/// body bytes are resent.
///
/// # Examples
///
/// ```no_run
/// use http::Method;
/// use sturdyhttp::{Client, RequestSpec};
/// use sturdyhttp::options::set_header;
///
/// # async fn example() -> sturdyhttp::Result<()> {
/// let client = Client::builder().build()?;
/// let body = client
///     .execute(
///         RequestSpec::new(Method::POST, "https://api.example.com/jobs")
///             .body(r#"{"kind":"reindex"}"#)
///             .option(set_header("x-idempotency-key", "7f3a")),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    body: Bytes,
    options: Vec<RequestOption>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl RequestSpec {
    /// Creates a spec for `method` against `url` with an empty body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: Bytes::new(),
            options: Vec::new(),
            timeout: None,
            cancel: None,
        }
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends one request option.
    pub fn option(mut self, option: RequestOption) -> Self {
        self.options.push(option);
        self
    }

    /// Appends a batch of request options, preserving order.
    pub fn options(mut self, options: impl IntoIterator<Item = RequestOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Overrides the client's per-attempt timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token. Cancelling it aborts an in-flight
    /// attempt or a pending backoff sleep with [`Error::Cancelled`].
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// An HTTP client that layers retry classification, gzip decoding, and
/// structured logging over a replaceable transport.
///
/// Cheap to clone; clones share the same configuration and transport.
/// Configuration is frozen at [`ClientBuilder::build`], which is what makes
/// concurrent use safe.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use sturdyhttp::retry::backoff;
/// use sturdyhttp::Client;
///
/// # async fn example() -> sturdyhttp::Result<()> {
/// let client = Client::builder()
///     .timeout(Duration::from_secs(5))
///     .retry(backoff::exponential(
///         Duration::from_millis(100),
///         Duration::from_secs(2),
///         3,
///         true,
///     ))
///     .build()?;
///
/// let body = client.get("https://api.example.com/status", vec![]).await?;
/// println!("{body}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    default_options: Vec<RequestOption>,
    classifier: Option<Arc<dyn RetryClassifier>>,
    backoff: Vec<Duration>,
    log_context: Option<LogContextFn>,
    decompress: bool,
}

impl Client {
    /// Creates a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns a JSON codec wrapper over this client.
    pub fn json(&self) -> crate::JsonClient {
        crate::JsonClient::new(self.clone())
    }

    /// Returns an XML codec wrapper over this client.
    pub fn xml(&self) -> crate::XmlClient {
        crate::XmlClient::new(self.clone())
    }

    /// Sends a GET request.
    pub async fn get(&self, url: impl Into<String>, options: Vec<RequestOption>) -> Result<String> {
        self.execute(RequestSpec::new(Method::GET, url).options(options))
            .await
    }

    /// Sends a POST request.
    pub async fn post(
        &self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(Method::POST, url).body(body).options(options))
            .await
    }

    /// Sends a PUT request.
    pub async fn put(
        &self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(Method::PUT, url).body(body).options(options))
            .await
    }

    /// Sends a PATCH request.
    pub async fn patch(
        &self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(Method::PATCH, url).body(body).options(options))
            .await
    }

    /// Sends a DELETE request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(Method::DELETE, url).options(options))
            .await
    }

    /// Sends a HEAD request.
    pub async fn head(&self, url: impl Into<String>, options: Vec<RequestOption>) -> Result<String> {
        self.execute(RequestSpec::new(Method::HEAD, url).options(options))
            .await
    }

    /// Sends an OPTIONS request.
    pub async fn options(
        &self,
        url: impl Into<String>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(Method::OPTIONS, url).options(options))
            .await
    }

    /// Sends a request with an arbitrary method and no body.
    pub async fn request(
        &self,
        method: Method,
        url: impl Into<String>,
        options: Vec<RequestOption>,
    ) -> Result<String> {
        self.execute(RequestSpec::new(method, url).options(options))
            .await
    }

    /// Executes a logical call: apply options, dispatch with retry, decode
    /// the response.
    ///
    /// Exactly one of result and error comes back. With no classifier
    /// configured there is exactly one attempt; with one, failures are
    /// classified and retried over the backoff sequence, and exhausting the
    /// sequence returns the final attempt's error.
    pub async fn execute(&self, spec: RequestSpec) -> Result<String> {
        let pending = self.prepare(&spec)?;
        let span = self.call_span(&pending);
        let started = Instant::now();
        self.retry_loop(spec.cancel.clone(), |attempt| {
            self.attempt_once(&pending, &spec, attempt, started)
        })
        .instrument(span)
        .await
    }

    /// Downloads `url` to `dest`, streaming the body to disk instead of
    /// buffering it, and returns the number of bytes written.
    ///
    /// Same option, retry, and status handling as [`Client::execute`]; the
    /// destination file is re-created on every attempt. Bodies are written
    /// as received, without decompression: large binary payloads are
    /// typically served uncompressed, so this path skips the gzip layer on
    /// purpose.
    pub async fn download_file(
        &self,
        url: impl Into<String>,
        dest: impl AsRef<Path>,
        options: Vec<RequestOption>,
    ) -> Result<u64> {
        let spec = RequestSpec::new(Method::GET, url).options(options);
        let dest = dest.as_ref();
        let pending = self.prepare(&spec)?;
        let span = self.call_span(&pending);
        let started = Instant::now();
        self.retry_loop(spec.cancel.clone(), |attempt| {
            self.download_attempt(&pending, &spec, dest, attempt, started)
        })
        .instrument(span)
        .await
    }

    /// Parses the URL and applies default options then per-call options, in
    /// order, fail-fast. An option error aborts the call before any network
    /// I/O.
    fn prepare(&self, spec: &RequestSpec) -> Result<PendingRequest> {
        let url = Url::parse(&spec.url)?;
        let mut pending = PendingRequest::new(spec.method.clone(), url);
        for option in self.inner.default_options.iter().chain(spec.options.iter()) {
            option.apply(&mut pending)?;
        }
        Ok(pending)
    }

    fn call_span(&self, pending: &PendingRequest) -> tracing::Span {
        match &self.inner.log_context {
            Some(derive) => derive(pending),
            None => tracing::debug_span!(
                "http_call",
                method = %pending.method(),
                url = %pending.url(),
            ),
        }
    }

    /// The attempt loop. Policy lives in the classifier; this only walks
    /// the backoff sequence.
    async fn retry_loop<T, Fut>(
        &self,
        cancel: Option<CancellationToken>,
        mut run: impl FnMut(usize) -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = run(attempt).await;

            // Cancellation is caller-initiated and never classified.
            if matches!(outcome, Err(Error::Cancelled)) {
                return outcome;
            }

            let classifier = match &self.inner.classifier {
                Some(classifier) => classifier,
                None => return outcome,
            };

            match classifier.classify(outcome.as_ref().err()) {
                RetryDecision::Succeed | RetryDecision::Fail => return outcome,
                RetryDecision::Retry => match self.inner.backoff.get(attempt - 1) {
                    Some(delay) => {
                        tracing::debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after delay"
                        );
                        with_cancel(cancel.as_ref(), tokio::time::sleep(*delay)).await?;
                    }
                    // Backoff exhausted: fail open with the last outcome.
                    None => return outcome,
                },
            }
        }
    }

    /// One full exchange: send, status check, body decode.
    async fn attempt_once(
        &self,
        pending: &PendingRequest,
        spec: &RequestSpec,
        attempt: usize,
        started: Instant,
    ) -> Result<String> {
        let response = self
            .send_and_check(pending, spec, spec.body.clone(), attempt, started)
            .await?;

        let headers = response.headers.clone();
        let raw = with_cancel(spec.cancel.as_ref(), response.collect_body())
            .await?
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    proc_time_ms = elapsed_ms(started),
                    "read response body"
                );
                Error::Transport(e)
            })?;

        let result = body::decode_body(&headers, raw, self.inner.decompress).map_err(|e| {
            tracing::error!(error = %e, proc_time_ms = elapsed_ms(started), "decode response body");
            e
        })?;

        tracing::debug!(
            set_cookies = %body::format_set_cookies(&headers),
            proc_time_ms = elapsed_ms(started),
            "request success"
        );
        Ok(result)
    }

    /// One streaming exchange: send, status check, copy body chunks to the
    /// destination file.
    async fn download_attempt(
        &self,
        pending: &PendingRequest,
        spec: &RequestSpec,
        dest: &Path,
        attempt: usize,
        started: Instant,
    ) -> Result<u64> {
        let response = self
            .send_and_check(pending, spec, Bytes::new(), attempt, started)
            .await?;

        let mut out = tokio::fs::File::create(dest).await.map_err(|e| {
            tracing::error!(error = %e, path = %dest.display(), "create download file");
            Error::Io(e)
        })?;

        let mut stream = response.body;
        let mut written: u64 = 0;
        loop {
            let chunk = match with_cancel(spec.cancel.as_ref(), stream.next()).await? {
                Some(chunk) => chunk.map_err(Error::Transport)?,
                None => break,
            };
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::debug!(
            file_size = written,
            proc_time_ms = elapsed_ms(started),
            "download success"
        );
        Ok(written)
    }

    /// Dispatches one wire request and turns a non-2xx status into
    /// [`Error::Status`].
    async fn send_and_check(
        &self,
        pending: &PendingRequest,
        spec: &RequestSpec,
        body: Bytes,
        attempt: usize,
        started: Instant,
    ) -> Result<crate::transport::TransportResponse> {
        let request = TransportRequest {
            method: pending.method().clone(),
            url: pending.url().clone(),
            headers: pending.headers().clone(),
            body,
            timeout: spec.timeout.unwrap_or(self.inner.timeout),
        };

        tracing::debug!(attempt, "issuing request");

        let response = with_cancel(spec.cancel.as_ref(), self.inner.transport.send(request))
            .await?
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    attempt,
                    proc_time_ms = elapsed_ms(started),
                    "do http request"
                );
                Error::Transport(e)
            })?;

        if !response.status.is_success() {
            let error = Error::Status {
                status: response.status,
                text: response
                    .status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            };
            tracing::error!(
                status = response.status.as_u16(),
                proc_time_ms = elapsed_ms(started),
                "bad http status code"
            );
            // Dropping the response releases the body stream.
            return Err(error);
        }

        Ok(response)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Races `fut` against the cancellation token, if any.
///
/// The select is biased so that cancellation wins a tie: a token that is
/// already cancelled when the race starts never lets `fut` run to
/// completion.
async fn with_cancel<T>(
    cancel: Option<&CancellationToken>,
    fut: impl Future<Output = T>,
) -> Result<T> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                out = fut => Ok(out),
            }
        }
        None => Ok(fut.await),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use sturdyhttp::options::set_header;
/// use sturdyhttp::retry::{backoff, StreamResetClassifier};
/// use sturdyhttp::ClientBuilder;
///
/// # fn example() -> sturdyhttp::Result<()> {
/// let client = ClientBuilder::new()
///     .timeout(Duration::from_secs(10))
///     .default_option(set_header("user-agent", "my-app/1.0"))
///     .retry(backoff::constant(Duration::from_millis(200), 2))
///     .classifier(StreamResetClassifier)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    timeout: Duration,
    default_options: Vec<RequestOption>,
    classifier: Option<Arc<dyn RetryClassifier>>,
    backoff: Vec<Duration>,
    log_context: Option<LogContextFn>,
    log_requests: bool,
    decompress: bool,
}

impl ClientBuilder {
    /// Creates a builder with default settings: 15 s timeout, no retry, no
    /// default options, gzip decoding on.
    pub fn new() -> Self {
        Self {
            transport: None,
            timeout: DEFAULT_TIMEOUT,
            default_options: Vec::new(),
            classifier: None,
            backoff: Vec::new(),
            log_context: None,
            log_requests: false,
            decompress: true,
        }
    }

    /// Sets the per-attempt timeout. Overridable per call via
    /// [`RequestSpec::timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Appends one default option, applied before per-call options on every
    /// request.
    pub fn default_option(mut self, option: RequestOption) -> Self {
        self.default_options.push(option);
        self
    }

    /// Appends a batch of default options, preserving order.
    pub fn default_options(mut self, options: impl IntoIterator<Item = RequestOption>) -> Self {
        self.default_options.extend(options);
        self
    }

    /// Enables retry with the given backoff sequence and the default
    /// [`TransportClassifier`] (unless a classifier was already set).
    ///
    /// The sequence length is the maximum number of additional attempts.
    pub fn retry(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        if self.classifier.is_none() {
            self.classifier = Some(Arc::new(TransportClassifier));
        }
        self
    }

    /// Sets the retry classifier.
    pub fn classifier(mut self, classifier: impl RetryClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Replaces the transport. Tests use this to inject scripted
    /// transports; production code can share a pooled transport between
    /// clients.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the per-call log-context function.
    pub fn log_context<F>(mut self, derive: F) -> Self
    where
        F: Fn(&PendingRequest) -> tracing::Span + Send + Sync + 'static,
    {
        self.log_context = Some(Arc::new(derive));
        self
    }

    /// Wraps the transport in [`LoggingTransport`], logging every wire
    /// exchange at debug level.
    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Controls transparent gzip decoding of response bodies (on by
    /// default).
    pub fn decompress(mut self, enabled: bool) -> Self {
        self.decompress = enabled;
        self
    }

    /// Builds the configured [`Client`].
    pub fn build(self) -> Result<Client> {
        let mut transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        if self.log_requests {
            transport = Arc::new(LoggingTransport::new(transport));
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                timeout: self.timeout,
                default_options: self.default_options,
                classifier: self.classifier,
                backoff: self.backoff,
                log_context: self.log_context,
                decompress: self.decompress,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
