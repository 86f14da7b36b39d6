//! Retry classification and backoff sequences.
//!
//! Each attempt's outcome is fed to a [`RetryClassifier`], which decides
//! whether the call is done, should be retried, or has failed for good. The
//! delay between retries comes from an ordered backoff sequence whose length
//! bounds the number of additional attempts; when the sequence runs out, the
//! final attempt's outcome is returned as-is.

use std::time::Duration;

use rand::Rng;

use crate::Error;

/// The verdict on one attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The attempt succeeded; return its result.
    Succeed,
    /// The attempt failed transiently; wait the next backoff delay and try
    /// again.
    Retry,
    /// The attempt failed permanently; return its error now.
    Fail,
}

/// Policy object deciding [`RetryDecision`] from an attempt's outcome.
///
/// `outcome` is `None` when the attempt succeeded, `Some(error)` otherwise.
/// Implement this to inject custom retry policy; the attempt loop itself
/// stays policy-free.
///
/// # Examples
///
/// ```
/// use sturdyhttp::{Error, RetryClassifier, RetryDecision};
///
/// /// Retries protocol-level 5xx responses as well as transient
/// /// transport errors.
/// struct RetryOn5xx;
///
/// impl RetryClassifier for RetryOn5xx {
///     fn classify(&self, outcome: Option<&Error>) -> RetryDecision {
///         match outcome {
///             None => RetryDecision::Succeed,
///             Some(e) if e.is_temporary() => RetryDecision::Retry,
///             Some(Error::Status { status, .. }) if status.is_server_error() => {
///                 RetryDecision::Retry
///             }
///             Some(_) => RetryDecision::Fail,
///         }
///     }
/// }
/// ```
pub trait RetryClassifier: Send + Sync {
    /// Classifies the outcome of one attempt.
    fn classify(&self, outcome: Option<&Error>) -> RetryDecision;
}

/// The default classifier: retry transient transport errors, fail on
/// everything else.
///
/// Non-2xx responses are protocol failures, not transport failures, and are
/// deliberately not retried here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportClassifier;

impl RetryClassifier for TransportClassifier {
    fn classify(&self, outcome: Option<&Error>) -> RetryDecision {
        match outcome {
            None => RetryDecision::Succeed,
            Some(e) if e.is_temporary() => RetryDecision::Retry,
            Some(_) => RetryDecision::Fail,
        }
    }
}

/// Transport error substrings treated as retriable multiplexed-stream
/// resets.
pub const STREAM_RESET_MARKERS: [&str; 3] = ["CONNECT_ERROR", "PROTOCOL_ERROR", "STREAM_CLOSED"];

/// Extended classifier: everything [`TransportClassifier`] retries, plus
/// transport errors whose message matches a known stream-reset marker.
///
/// Masks transient resets of multiplexed (HTTP/2) streams that the
/// transport does not flag as temporary.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamResetClassifier;

impl RetryClassifier for StreamResetClassifier {
    fn classify(&self, outcome: Option<&Error>) -> RetryDecision {
        let error = match outcome {
            None => return RetryDecision::Succeed,
            Some(e) => e,
        };
        if error.is_temporary() {
            return RetryDecision::Retry;
        }
        if let Error::Transport(e) = error {
            let message = e.message();
            if STREAM_RESET_MARKERS.iter().any(|m| message.contains(m)) {
                return RetryDecision::Retry;
            }
        }
        RetryDecision::Fail
    }
}

/// Constructors for backoff sequences.
///
/// A backoff sequence is just an ordered `Vec<Duration>`; its length is the
/// maximum number of additional attempts. Hand-built sequences work exactly
/// the same as these helpers.
pub mod backoff {
    use super::*;

    /// `retries` waits of the same `delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use sturdyhttp::retry::backoff;
    ///
    /// let seq = backoff::constant(Duration::from_millis(50), 3);
    /// assert_eq!(seq.len(), 3);
    /// ```
    pub fn constant(delay: Duration, retries: usize) -> Vec<Duration> {
        vec![delay; retries]
    }

    /// `retries` waits doubling from `initial`, capped at `max`.
    ///
    /// With `jitter`, each delay is scaled by a uniform random factor in
    /// [0.5, 1.0] to avoid thundering herds.
    pub fn exponential(
        initial: Duration,
        max: Duration,
        retries: usize,
        jitter: bool,
    ) -> Vec<Duration> {
        (0..retries)
            .map(|attempt| {
                let multiplier = 2u64.saturating_pow(attempt as u32);
                let base = initial.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base.min(max);
                if jitter {
                    let factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(factor)
                } else {
                    delay
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let seq = backoff::exponential(
            Duration::from_millis(100),
            Duration::from_millis(500),
            5,
            false,
        );
        assert_eq!(
            seq,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn exponential_jitter_stays_within_half_to_full() {
        let seq = backoff::exponential(
            Duration::from_millis(100),
            Duration::from_secs(10),
            1,
            true,
        );
        assert!(seq[0] >= Duration::from_millis(50));
        assert!(seq[0] <= Duration::from_millis(100));
    }

    #[test]
    fn constant_backoff_repeats_delay() {
        let seq = backoff::constant(Duration::from_secs(1), 3);
        assert_eq!(seq, vec![Duration::from_secs(1); 3]);
    }

    #[test]
    fn transport_classifier_retries_only_temporary() {
        let c = TransportClassifier;
        assert_eq!(c.classify(None), RetryDecision::Succeed);
        assert_eq!(
            c.classify(Some(&Error::Transport(TransportError::temporary("reset")))),
            RetryDecision::Retry
        );
        assert_eq!(
            c.classify(Some(&Error::Transport(TransportError::permanent("refused")))),
            RetryDecision::Fail
        );
    }

    #[test]
    fn transport_classifier_fails_on_bad_status() {
        let err = Error::Status {
            status: http::StatusCode::INTERNAL_SERVER_ERROR,
            text: "Internal Server Error".to_string(),
        };
        assert_eq!(TransportClassifier.classify(Some(&err)), RetryDecision::Fail);
    }

    #[test]
    fn stream_reset_classifier_matches_markers() {
        let c = StreamResetClassifier;
        for marker in STREAM_RESET_MARKERS {
            let err = Error::Transport(TransportError::permanent(format!(
                "http2: stream error: {marker}"
            )));
            assert_eq!(c.classify(Some(&err)), RetryDecision::Retry, "{marker}");
        }
        let err = Error::Transport(TransportError::permanent("tls handshake failed"));
        assert_eq!(c.classify(Some(&err)), RetryDecision::Fail);
    }

    #[test]
    fn stream_reset_classifier_ignores_status_errors() {
        let err = Error::Status {
            status: http::StatusCode::BAD_GATEWAY,
            text: "Bad Gateway".to_string(),
        };
        assert_eq!(StreamResetClassifier.classify(Some(&err)), RetryDecision::Fail);
    }
}
