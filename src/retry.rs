use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::Result;
use crate::client::HttpClient;
use crate::error::Error;
use crate::request::{HttpRequest, RequestContext};
use crate::response::HttpResponse;

const DEFAULT_RETRIES: usize = 1;
const DEFAULT_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(25);

/// Fudge factor added to the wall-clock timer per configured retry, so the
/// timer does not race scheduling jitter of the final attempt.
const RETRY_TIMER_SLACK: Duration = Duration::from_millis(10);

/// Upper bound (exclusive) of the uniform jitter added to each retry
/// delay. Intentionally small and non-exponential.
const RETRY_JITTER_MS: u64 = 31;

/// Decides whether a failed attempt should be retried.
pub trait RetryPredicate: Send + Sync {
    fn should_retry(&self, response: &HttpResponse) -> bool;
}

/// Default predicate: retry when the failure carries no status code at
/// all, or a server-side (>= 500) status.
#[derive(Debug, Default)]
pub struct ServerErrorRetryPredicate;

impl RetryPredicate for ServerErrorRetryPredicate {
    fn should_retry(&self, response: &HttpResponse) -> bool {
        response.status_code().is_none_or(|code| code >= 500)
    }
}

/// Performs one retry attempt.
#[async_trait]
pub trait RetryHandler: Send + Sync {
    async fn on_retry(
        &self,
        client: &dyn HttpClient,
        request: HttpRequest,
        context: &mut RequestContext,
        last_response: &HttpResponse,
    ) -> Result<HttpResponse>;
}

/// Default handler: re-send the same request through the wrapped client.
#[derive(Debug, Default)]
pub struct ResendRetryHandler;

#[async_trait]
impl RetryHandler for ResendRetryHandler {
    async fn on_retry(
        &self,
        client: &dyn HttpClient,
        request: HttpRequest,
        context: &mut RequestContext,
        _last_response: &HttpResponse,
    ) -> Result<HttpResponse> {
        client.send(request, context).await
    }
}

/// Retry configuration, merged per call with defaults installed at
/// construction time.
#[derive(Clone)]
pub struct RetryOptions {
    retries: usize,
    delay: Duration,
    max_timeout: Duration,
    when: Option<Arc<dyn RetryPredicate>>,
    on_retry: Option<Arc<dyn RetryHandler>>,
}

impl std::fmt::Debug for RetryOptions {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RetryOptions")
            .field("retries", &self.retries)
            .field("delay", &self.delay)
            .field("max_timeout", &self.max_timeout)
            .field("when", &self.when.as_ref().map(|_| "<custom>"))
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl RetryOptions {
    pub fn standard() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_DELAY,
            max_timeout: DEFAULT_MAX_TIMEOUT,
            when: None,
            on_retry: None,
        }
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    pub fn when(mut self, when: Arc<dyn RetryPredicate>) -> Self {
        self.when = Some(when);
        self
    }

    pub fn on_retry(mut self, on_retry: Arc<dyn RetryHandler>) -> Self {
        self.on_retry = Some(on_retry);
        self
    }

    pub(crate) fn configured_retries(&self) -> usize {
        self.retries
    }

    pub(crate) fn configured_delay(&self) -> Duration {
        self.delay
    }

    pub(crate) fn configured_max_timeout(&self) -> Duration {
        self.max_timeout
    }

    pub(crate) fn when_or_default(&self) -> Arc<dyn RetryPredicate> {
        self.when
            .clone()
            .unwrap_or_else(|| Arc::new(ServerErrorRetryPredicate))
    }

    pub(crate) fn on_retry_or_default(&self) -> Arc<dyn RetryHandler> {
        self.on_retry
            .clone()
            .unwrap_or_else(|| Arc::new(ResendRetryHandler))
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// HTTP client with retry.
///
/// Wraps an inner client and re-drives its `send` on failure, bounded by
/// both a retry-count ceiling and a hard wall-clock timeout that wins the
/// race even mid-retry. The retry counter and the end latch are not reset
/// between calls: create a new instance for each logical send.
pub struct RetryHttpClient {
    inner: Arc<dyn HttpClient>,
    options: RetryOptions,
    count_retry: AtomicUsize,
    retry_end: AtomicBool,
}

impl RetryHttpClient {
    pub fn new(inner: Arc<dyn HttpClient>, options: RetryOptions) -> Self {
        Self {
            inner,
            options,
            count_retry: AtomicUsize::new(0),
            retry_end: AtomicBool::new(false),
        }
    }

    /// Retries attempted so far.
    pub fn retry_count(&self) -> usize {
        self.count_retry.load(Ordering::Acquire)
    }

    async fn run_attempts(
        &self,
        options: &RetryOptions,
        request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse> {
        let retries = options.configured_retries();
        let when = options.when_or_default();
        let on_retry = options.on_retry_or_default();

        let mut failure = match self.inner.send(request.clone(), context).await {
            Ok(response) => return Ok(response),
            Err(error) => {
                debug!(error = %error, "request failure, ready to retry");
                error
            }
        };

        loop {
            let attempted = self.count_retry.load(Ordering::Acquire);
            if attempted == retries {
                debug!(retries, "request reached the maximum number of retries");
                let response = failure
                    .response()
                    .cloned()
                    .unwrap_or_else(HttpResponse::error_shape);
                return Err(Error::RetryExhausted { retries, response });
            }

            let jitter = Duration::from_millis(rand::rng().random_range(0..RETRY_JITTER_MS));
            let delay = options.configured_delay() + jitter;
            debug!(
                attempt = attempted + 1,
                delay_ms = delay.as_millis() as u64,
                "scheduling retry"
            );
            sleep(delay).await;
            if self.retry_end.load(Ordering::Acquire) {
                // superseded by the wall-clock timer: neither resolve nor
                // reject
                debug!("retry window closed, dropping delayed retry");
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves");
            }
            self.count_retry.fetch_add(1, Ordering::AcqRel);

            let last_response = failure
                .response()
                .cloned()
                .unwrap_or_else(HttpResponse::error_shape);
            match on_retry
                .on_retry(self.inner.as_ref(), request.clone(), context, &last_response)
                .await
            {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let response = error
                        .response()
                        .cloned()
                        .unwrap_or_else(HttpResponse::error_shape);
                    if when.should_retry(&response) {
                        failure = error;
                    } else {
                        debug!("give up retry");
                        return Err(error);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl HttpClient for RetryHttpClient {
    async fn send(
        &self,
        request: HttpRequest,
        context: &mut RequestContext,
    ) -> Result<HttpResponse> {
        let options = context
            .retry_options
            .clone()
            .unwrap_or_else(|| self.options.clone());
        let max_timeout = options.configured_max_timeout();
        let hard_deadline =
            max_timeout + RETRY_TIMER_SLACK * options.configured_retries() as u32;

        tokio::select! {
            result = self.run_attempts(&options, request, context) => result,
            _ = sleep(hard_deadline) => {
                self.retry_end.store(true, Ordering::Release);
                let count_retry = self.count_retry.load(Ordering::Acquire);
                warn!(
                    max_timeout_ms = max_timeout.as_millis() as u64,
                    count_retry,
                    "retry wall-clock timeout reached"
                );
                Err(Error::RetryTimeout { max_timeout, count_retry })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::{RetryOptions, RetryPredicate, ServerErrorRetryPredicate};
    use crate::response::HttpResponse;

    #[test]
    fn default_predicate_retries_missing_and_server_statuses() {
        let predicate = ServerErrorRetryPredicate;
        assert!(predicate.should_retry(&HttpResponse::error_shape()));
        assert!(predicate.should_retry(&HttpResponse::from_status(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!predicate.should_retry(&HttpResponse::from_status(StatusCode::NOT_FOUND)));
        assert!(!predicate.should_retry(&HttpResponse::from_status(StatusCode::BAD_REQUEST)));
    }

    #[test]
    fn standard_options_have_documented_defaults() {
        let options = RetryOptions::standard();
        assert_eq!(options.configured_retries(), 1);
        assert_eq!(options.configured_delay().as_millis(), 100);
        assert_eq!(options.configured_max_timeout().as_secs(), 25);
    }

    #[test]
    fn debug_output_elides_callbacks() {
        let rendered = format!("{:?}", RetryOptions::standard().retries(3));
        assert!(rendered.contains("retries: 3"));
        assert!(!rendered.contains("RetryPredicate"));
    }
}
