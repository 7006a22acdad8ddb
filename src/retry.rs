/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Retry classification and the retry policy applied to outbound calls
//!
//! Failures fall into three classes: retryable under the general attempt ceiling,
//! retryable under the stricter network ceiling (DNS resolution failures and refused
//! connections indicate an environment problem, not service-side throttling), and
//! fatal. The policy runs one logical operation to completion, recording an ordered
//! attempt log that the caller can inspect; nested policy invocations get fresh logs.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::time::Duration;

/// Attempt ceiling for DNS-resolution and connection-refusal failures
///
/// Stricter than the general ceiling: when the endpoint cannot even be reached there
/// is no point burning the full retry budget.
pub const MAX_NETWORK_RETRY_COUNT: u32 = 9;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(20);

/// How a self-describing error characterizes itself for retry purposes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Connection-level failure, e.g. a timeout mid-request
    TransientError,
    /// The service asked the client to slow down
    ThrottlingError,
    /// The service failed to process the request (HTTP 5xx)
    ServerError,
    /// The request was rejected as invalid; retrying is pointless
    ClientError,
}

/// Capability for errors that can describe their own retryability
pub trait ProvideErrorKind {
    /// `Some(kind)` when this error is retryable, `None` otherwise
    fn retryable_error_kind(&self) -> Option<ErrorKind>;

    /// Service error code, when one exists
    fn code(&self) -> Option<&str> {
        None
    }
}

/// Classification of one failure
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Retryable under the general attempt ceiling
    Retryable,
    /// Retryable under [`MAX_NETWORK_RETRY_COUNT`]
    RetryableNetwork,
    /// Not worth a second attempt
    Fatal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NetworkCause {
    DnsFailure,
    ConnectionRefused,
    OtherIo,
}

/// Walk the cause chain looking for evidence of a network-level failure.
fn network_cause(err: &(dyn Error + 'static)) -> Option<NetworkCause> {
    let mut found_io = false;
    let mut cause = None;
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
            found_io = true;
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused {
                cause = Some(NetworkCause::ConnectionRefused);
            }
        }
        let message = e.to_string().to_ascii_lowercase();
        if message.contains("no such host") || message.contains("failed to lookup address") {
            cause = Some(NetworkCause::DnsFailure);
        } else if cause.is_none() && message.contains("connection refused") {
            cause = Some(NetworkCause::ConnectionRefused);
        }
        current = e.source();
    }
    cause.or(if found_io {
        Some(NetworkCause::OtherIo)
    } else {
        None
    })
}

/// Classify a failure as retryable, network-retryable, or fatal
///
/// An error is retryable when it describes itself as such through
/// [`ProvideErrorKind`], or when its cause chain contains a network I/O failure.
/// DNS-resolution failures and refused connections are put under the stricter
/// network ceiling regardless of what the error says about itself.
pub fn classify<E>(err: &E) -> RetryClass
where
    E: Error + ProvideErrorKind + 'static,
{
    match network_cause(err) {
        Some(NetworkCause::DnsFailure) | Some(NetworkCause::ConnectionRefused) => {
            RetryClass::RetryableNetwork
        }
        Some(NetworkCause::OtherIo) => RetryClass::Retryable,
        None => match err.retryable_error_kind() {
            Some(_) => RetryClass::Retryable,
            None => RetryClass::Fatal,
        },
    }
}

/// Retry behavior configuration
#[derive(Clone, Debug)]
pub struct RetryConfig {
    max_attempts: u32,
    max_network_attempts: u32,
    max_backoff: Duration,
    base: fn() -> f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_network_attempts: MAX_NETWORK_RETRY_COUNT,
            max_backoff: DEFAULT_MAX_BACKOFF,
            // by default, use a random base for exponential backoff
            base: fastrand::f64,
        }
    }
}

impl RetryConfig {
    pub fn standard() -> Self {
        Default::default()
    }

    /// Total number of attempts for one logical operation, first attempt included
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// For deterministic tests, use a static base instead of a random base for
    /// exponential backoff. A base of `|| 0.0` injects no delay at all.
    pub fn with_static_base(mut self, base: fn() -> f64) -> Self {
        self.base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Outcome of a single attempt within one logical operation
#[derive(Debug)]
pub struct AttemptResult {
    /// Rendered form of the error this attempt produced
    pub error: String,
    /// Whether the error was classified retryable
    pub retryable: bool,
    /// Whether another attempt was actually made after this one
    pub retried: bool,
}

/// Ordered record of the failed attempts of one logical operation
///
/// Created fresh per call and handed back to the caller; never shared with nested
/// operations.
#[derive(Debug, Default)]
pub struct AttemptLog {
    attempts: Vec<AttemptResult>,
}

impl AttemptLog {
    pub fn attempts(&self) -> &[AttemptResult] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    fn record(&mut self, error: String, retryable: bool, retried: bool) {
        self.attempts.push(AttemptResult {
            error,
            retryable,
            retried,
        });
    }
}

/// Terminal failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// The applicable attempt ceiling was reached; the final classified error is
    /// preserved as the source
    MaxAttempts { attempts: u32, source: E },
    /// The operation failed with a non-retryable error
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_max_attempts(&self) -> bool {
        matches!(self, RetryError::MaxAttempts { .. })
    }

    pub fn into_source(self) -> E {
        match self {
            RetryError::MaxAttempts { source, .. } => source,
            RetryError::Operation(source) => source,
        }
    }
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::MaxAttempts { attempts, source } => write!(
                f,
                "exceeded maximum number of attempts ({}): {}",
                attempts, source
            ),
            RetryError::Operation(source) => write!(f, "{}", source),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::MaxAttempts { source, .. } => Some(source as _),
            RetryError::Operation(source) => Some(source as _),
        }
    }
}

/// Retry policy for one kind of outbound call
///
/// Drives an async operation to completion: classify each failure, apply exponential
/// backoff, stop at the applicable attempt ceiling.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        RetryPolicy { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = (self.config.base)();
        let backoff = base * (2_u32.pow(attempt - 1) as f64);
        Duration::from_secs_f64(backoff).min(self.config.max_backoff)
    }

    /// Run `op` to completion, discarding the attempt log
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + ProvideErrorKind + Send + Sync + 'static,
    {
        self.call_logged(op).await.0
    }

    /// Run `op` to completion, returning the ordered attempt log alongside the result
    pub async fn call_logged<T, E, F, Fut>(&self, mut op: F) -> (Result<T, RetryError<E>>, AttemptLog)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + ProvideErrorKind + Send + Sync + 'static,
    {
        let mut log = AttemptLog::default();
        let mut attempt: u32 = 1;
        let mut network_attempts: u32 = 0;
        loop {
            let err = match op().await {
                Ok(value) => return (Ok(value), log),
                Err(err) => err,
            };
            let class = classify(&err);
            if class == RetryClass::Fatal {
                log.record(err.to_string(), false, false);
                return (Err(RetryError::Operation(err)), log);
            }
            if class == RetryClass::RetryableNetwork {
                network_attempts += 1;
            }
            let ceiling_reached = attempt >= self.config.max_attempts
                || (class == RetryClass::RetryableNetwork
                    && network_attempts >= self.config.max_network_attempts);
            if ceiling_reached {
                let wrapped = RetryError::MaxAttempts {
                    attempts: attempt,
                    source: err,
                };
                log.record(wrapped.to_string(), true, false);
                tracing::warn!(attempts = attempt, "retry budget exhausted");
                return (Err(wrapped), log);
            }
            log.record(err.to_string(), true, true);
            let delay = self.backoff(attempt);
            tracing::debug!(attempt = attempt, delay = ?delay, "retrying after backoff");
            if delay > Duration::from_secs(0) {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::{
        classify, ErrorKind, ProvideErrorKind, RetryClass, RetryConfig, RetryError, RetryPolicy,
        MAX_NETWORK_RETRY_COUNT,
    };
    use std::error::Error;
    use std::fmt::{self, Display, Formatter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct MockRetryableError {
        retryable: bool,
    }

    impl Display for MockRetryableError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "mock retryable {}", self.retryable)
        }
    }

    impl Error for MockRetryableError {}

    impl ProvideErrorKind for MockRetryableError {
        fn retryable_error_kind(&self) -> Option<ErrorKind> {
            if self.retryable {
                Some(ErrorKind::ServerError)
            } else {
                None
            }
        }
    }

    #[derive(Debug)]
    struct DialError(std::io::Error);

    impl DialError {
        fn no_such_host() -> Self {
            DialError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "dial tcp: no such host",
            ))
        }

        fn connection_refused() -> Self {
            DialError(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
        }

        fn other() -> Self {
            DialError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "dial tcp: network is unreachable",
            ))
        }
    }

    impl Display for DialError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "dial error")
        }
    }

    impl Error for DialError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    impl ProvideErrorKind for DialError {
        fn retryable_error_kind(&self) -> Option<ErrorKind> {
            None
        }
    }

    fn test_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::standard()
                .with_max_attempts(max_attempts)
                .with_static_base(|| 0.0),
        )
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify(&MockRetryableError { retryable: true }),
            RetryClass::Retryable
        );
        assert_eq!(
            classify(&MockRetryableError { retryable: false }),
            RetryClass::Fatal
        );
        assert_eq!(
            classify(&DialError::no_such_host()),
            RetryClass::RetryableNetwork
        );
        assert_eq!(
            classify(&DialError::connection_refused()),
            RetryClass::RetryableNetwork
        );
        assert_eq!(classify(&DialError::other()), RetryClass::Retryable);
    }

    #[tokio::test]
    async fn stops_at_max_attempts_for_retryable_errors() {
        let policy = test_policy(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (result, log) = policy
            .call_logged(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(MockRetryableError { retryable: true }) }
            })
            .await;
        let err = result.expect_err("all attempts failed");
        assert!(err.is_max_attempts());
        assert!(err
            .to_string()
            .contains("exceeded maximum number of attempts (10)"));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(log.len(), 10);
        for entry in &log.attempts()[..9] {
            assert!(entry.retryable);
            assert!(entry.retried);
        }
        let last = &log.attempts()[9];
        assert!(last.retryable);
        assert!(!last.retried);
        assert!(last.error.contains("exceeded maximum number of attempts"));
    }

    #[tokio::test]
    async fn dns_failures_stop_at_network_ceiling() {
        // the network ceiling applies even though it is below the general ceiling
        let policy = test_policy(20);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (result, log) = policy
            .call_logged(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(DialError::no_such_host()) }
            })
            .await;
        assert!(result.expect_err("exhausted").is_max_attempts());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_NETWORK_RETRY_COUNT as usize);
        assert_eq!(log.len(), MAX_NETWORK_RETRY_COUNT as usize);
        assert!(!log.attempts()[MAX_NETWORK_RETRY_COUNT as usize - 1].retried);
    }

    #[tokio::test]
    async fn connection_refused_stops_at_network_ceiling() {
        let policy = test_policy(20);
        let (result, log) = policy
            .call_logged(|| async { Err::<(), _>(DialError::connection_refused()) })
            .await;
        assert!(result.expect_err("exhausted").is_max_attempts());
        assert_eq!(log.len(), MAX_NETWORK_RETRY_COUNT as usize);
    }

    #[tokio::test]
    async fn other_network_errors_use_general_ceiling() {
        let policy = test_policy(10);
        let (result, log) = policy
            .call_logged(|| async { Err::<(), _>(DialError::other()) })
            .await;
        assert!(result.expect_err("exhausted").is_max_attempts());
        assert_eq!(log.len(), 10);
    }

    #[tokio::test]
    async fn fatal_errors_stop_after_one_attempt() {
        let policy = test_policy(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (result, log) = policy
            .call_logged(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(MockRetryableError { retryable: false }) }
            })
            .await;
        match result.expect_err("fatal") {
            RetryError::Operation(_) => {}
            other => panic!("expected Operation, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.len(), 1);
        assert!(!log.attempts()[0].retryable);
        assert!(!log.attempts()[0].retried);
    }

    #[tokio::test]
    async fn eventual_success_returns_value() {
        let policy = test_policy(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (result, log) = policy
            .call_logged(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(MockRetryableError { retryable: true })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(log.len(), 2);
        assert!(log.attempts().iter().all(|a| a.retried));
    }

    #[tokio::test]
    async fn nested_calls_keep_separate_logs() {
        let outer = test_policy(3);
        let inner = test_policy(5);
        let (result, outer_log) = outer
            .call_logged(|| {
                let inner = inner.clone();
                async move {
                    let (_, inner_log) = inner
                        .call_logged(|| async { Err::<(), _>(MockRetryableError { retryable: true }) })
                        .await;
                    assert_eq!(inner_log.len(), 5);
                    Ok::<_, MockRetryableError>(())
                }
            })
            .await;
        assert!(result.is_ok());
        // the outer operation succeeded on its first attempt; nothing from the inner
        // operation may leak into its log
        assert!(outer_log.is_empty());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(
            RetryConfig::standard()
                .with_max_attempts(5)
                .with_max_backoff(Duration::from_secs(3))
                .with_static_base(|| 1.0),
        );
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(3));
        assert_eq!(policy.backoff(4), Duration::from_secs(3));
    }
}
