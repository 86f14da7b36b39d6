//! Example demonstrating custom retry classifiers.
//!
//! This example shows how to:
//! - Use the built-in transport and stream-reset classifiers
//! - Implement a domain-specific classifier
//! - Combine a classifier with a hand-built backoff sequence
//!
//! Run with: `cargo run --example custom_classifier`

use std::time::Duration;

use sturdyhttp::retry::{backoff, StreamResetClassifier};
use sturdyhttp::{Client, Error, RetryClassifier, RetryDecision};

/// Custom classifier: retry transient transport errors AND 5xx responses,
/// on the theory that this particular upstream recovers quickly.
struct RetryOnServerError;

impl RetryClassifier for RetryOnServerError {
    fn classify(&self, outcome: Option<&Error>) -> RetryDecision {
        match outcome {
            None => RetryDecision::Succeed,
            Some(e) if e.is_temporary() => RetryDecision::Retry,
            Some(Error::Status { status, .. }) if status.is_server_error() => {
                RetryDecision::Retry
            }
            Some(_) => RetryDecision::Fail,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("sturdyhttp=debug,custom_classifier=info")
        .init();

    // Default policy plus HTTP/2 stream-reset masking.
    let masked = Client::builder()
        .retry(backoff::constant(Duration::from_millis(200), 2))
        .classifier(StreamResetClassifier)
        .build()?;

    // Domain-specific policy: 5xx responses are worth a second try.
    let eager = Client::builder()
        .retry(vec![
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_secs(2),
        ])
        .classifier(RetryOnServerError)
        .build()?;

    for (name, client) in [("masked", &masked), ("eager", &eager)] {
        match client.get("https://httpbin.org/status/200", vec![]).await {
            Ok(_) => println!("{name}: success"),
            Err(e) => println!("{name}: {e}"),
        }
    }

    Ok(())
}
